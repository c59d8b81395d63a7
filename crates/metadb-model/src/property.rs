//! Property definitions.

use crate::attribute::AttributeInstance;
use crate::key::ClassRef;

/// Primitive property value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    /// Boolean value.
    Boolean,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Binary blob.
    Binary,
    /// Date/time value.
    DateTime,
}

/// Declared type of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    /// Primitive-typed property.
    Primitive(PrimitiveType),
    /// Struct-typed property referencing a struct class.
    Struct(ClassRef),
    /// Array of primitives.
    PrimitiveArray(PrimitiveType),
    /// Array of struct instances.
    StructArray(ClassRef),
}

impl PropertyType {
    /// The struct class this type refers to, if any.
    pub fn struct_target(&self) -> Option<&ClassRef> {
        match self {
            PropertyType::Struct(target) | PropertyType::StructArray(target) => Some(target),
            _ => None,
        }
    }
}

/// A property declared directly on a class.
///
/// Inherited properties are not stored; they are computed by walking
/// base-class edges.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name (unique within the class, case-insensitively).
    pub name: String,
    /// Declared type.
    pub property_type: PropertyType,
    /// Attached custom-attribute instances.
    pub attributes: Vec<AttributeInstance>,
}

impl PropertyDef {
    /// Create a primitive property.
    pub fn primitive(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Primitive(primitive),
            attributes: Vec::new(),
        }
    }

    /// Create a struct-typed property.
    pub fn structure(name: impl Into<String>, target: ClassRef) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Struct(target),
            attributes: Vec::new(),
        }
    }

    /// Create a primitive-array property.
    pub fn primitive_array(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::PrimitiveArray(primitive),
            attributes: Vec::new(),
        }
    }

    /// Create a struct-array property.
    pub fn struct_array(name: impl Into<String>, target: ClassRef) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::StructArray(target),
            attributes: Vec::new(),
        }
    }

    /// Attach a custom-attribute instance, replacing any instance of
    /// the same attribute class.
    pub fn with_attribute(mut self, attr: AttributeInstance) -> Self {
        self.set_attribute(attr);
        self
    }

    /// Attach a custom-attribute instance in place.
    pub fn set_attribute(&mut self, attr: AttributeInstance) {
        crate::attribute::set_attribute(&mut self.attributes, attr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_builders() {
        let prop = PropertyDef::primitive("bprop", PrimitiveType::Double);
        assert_eq!(prop.name, "bprop");
        assert!(prop.property_type.struct_target().is_none());

        let prop = PropertyDef::struct_array("parts", ClassRef::local("Part"));
        assert_eq!(
            prop.property_type.struct_target().unwrap().name,
            "Part"
        );
    }

    #[test]
    fn test_with_attribute_replaces() {
        let prop = PropertyDef::primitive("name", PrimitiveType::String)
            .with_attribute(AttributeInstance::new("Localization"))
            .with_attribute(AttributeInstance::with_values(
                "Localization",
                serde_json::json!({"locale": "de"}),
            ));
        assert_eq!(prop.attributes.len(), 1);
    }
}
