//! Durable row types and their object-model conversions.
//!
//! Rows are the storage-facing mirror of the object model: every
//! class reference is resolved to a concrete schema name, and
//! custom-attribute payloads are carried as JSON strings.

use metadb_model::{
    AttributeInstance, CardinalityRange, ClassDef, ClassKind, ClassRef, PrimitiveType, PropertyDef,
    PropertyType, RelationshipConstraint, RelationshipDef, SchemaDef, SchemaKey, SupplementalInfo,
};
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;

/// Primitive property types, storage form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum PrimitiveTypeRow {
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

impl From<PrimitiveType> for PrimitiveTypeRow {
    fn from(t: PrimitiveType) -> Self {
        match t {
            PrimitiveType::Boolean => Self::Boolean,
            PrimitiveType::Int32 => Self::Int32,
            PrimitiveType::Int64 => Self::Int64,
            PrimitiveType::Double => Self::Double,
            PrimitiveType::String => Self::String,
            PrimitiveType::Binary => Self::Binary,
            PrimitiveType::DateTime => Self::DateTime,
        }
    }
}

impl From<PrimitiveTypeRow> for PrimitiveType {
    fn from(t: PrimitiveTypeRow) -> Self {
        match t {
            PrimitiveTypeRow::Boolean => Self::Boolean,
            PrimitiveTypeRow::Int32 => Self::Int32,
            PrimitiveTypeRow::Int64 => Self::Int64,
            PrimitiveTypeRow::Double => Self::Double,
            PrimitiveTypeRow::String => Self::String,
            PrimitiveTypeRow::Binary => Self::Binary,
            PrimitiveTypeRow::DateTime => Self::DateTime,
        }
    }
}

/// Class kinds, storage form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ClassKindRow {
    /// Regular domain class.
    Entity,
    /// Struct class.
    Struct,
    /// Relationship class.
    Relationship,
}

impl From<ClassKind> for ClassKindRow {
    fn from(k: ClassKind) -> Self {
        match k {
            ClassKind::Entity => Self::Entity,
            ClassKind::Struct => Self::Struct,
            ClassKind::Relationship => Self::Relationship,
        }
    }
}

impl From<ClassKindRow> for ClassKind {
    fn from(k: ClassKindRow) -> Self {
        match k {
            ClassKindRow::Entity => Self::Entity,
            ClassKindRow::Struct => Self::Struct,
            ClassKindRow::Relationship => Self::Relationship,
        }
    }
}

/// Fully resolved class reference: schema name plus class name.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ClassRefRow {
    /// Owning schema name.
    pub schema: String,
    /// Class name.
    pub name: String,
}

impl ClassRefRow {
    /// Resolve a model reference against its containing schema.
    pub fn from_ref(class_ref: &ClassRef, containing: &str) -> Self {
        Self {
            schema: class_ref.schema_or(containing).to_string(),
            name: class_ref.name.clone(),
        }
    }

    /// Back to a model reference (always schema-qualified).
    pub fn to_ref(&self) -> ClassRef {
        ClassRef::foreign(self.schema.clone(), self.name.clone())
    }
}

/// A custom-attribute instance with its payload as JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct AttrRow {
    /// Attribute class name.
    pub attr_class: String,
    /// JSON-encoded payload.
    pub values_json: String,
}

impl AttrRow {
    fn from_instance(attr: &AttributeInstance) -> Self {
        Self {
            attr_class: attr.attr_class.clone(),
            values_json: attr.values.to_string(),
        }
    }

    fn to_instance(&self) -> Result<AttributeInstance, Error> {
        let values = serde_json::from_str(&self.values_json)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        Ok(AttributeInstance::with_values(
            self.attr_class.clone(),
            values,
        ))
    }
}

/// Declared property type, storage form.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum PropertyTypeRow {
    /// Primitive-typed property.
    Primitive(PrimitiveTypeRow),
    /// Struct-typed property.
    Struct(ClassRefRow),
    /// Array of primitives.
    PrimitiveArray(PrimitiveTypeRow),
    /// Array of struct instances.
    StructArray(ClassRefRow),
}

impl PropertyTypeRow {
    fn from_type(t: &PropertyType, containing: &str) -> Self {
        match t {
            PropertyType::Primitive(p) => Self::Primitive((*p).into()),
            PropertyType::Struct(r) => Self::Struct(ClassRefRow::from_ref(r, containing)),
            PropertyType::PrimitiveArray(p) => Self::PrimitiveArray((*p).into()),
            PropertyType::StructArray(r) => Self::StructArray(ClassRefRow::from_ref(r, containing)),
        }
    }

    fn to_type(&self) -> PropertyType {
        match self {
            Self::Primitive(p) => PropertyType::Primitive((*p).into()),
            Self::Struct(r) => PropertyType::Struct(r.to_ref()),
            Self::PrimitiveArray(p) => PropertyType::PrimitiveArray((*p).into()),
            Self::StructArray(r) => PropertyType::StructArray(r.to_ref()),
        }
    }
}

/// A property row nested inside its class row.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct PropertyRow {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub property_type: PropertyTypeRow,
    /// Attached attribute instances.
    pub attributes: Vec<AttrRow>,
}

/// A relationship endpoint constraint, storage form.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct RelationshipConstraintRow {
    /// Minimum count.
    pub lower: u32,
    /// Maximum count; `None` means unbounded.
    pub upper: Option<u32>,
    /// Permissible endpoint classes.
    pub classes: Vec<ClassRefRow>,
    /// Whether subclasses are permitted.
    pub polymorphic: bool,
}

impl RelationshipConstraintRow {
    fn from_constraint(c: &RelationshipConstraint, containing: &str) -> Self {
        Self {
            lower: c.cardinality.lower,
            upper: c.cardinality.upper,
            classes: c
                .classes
                .iter()
                .map(|r| ClassRefRow::from_ref(r, containing))
                .collect(),
            polymorphic: c.polymorphic,
        }
    }

    fn to_constraint(&self) -> RelationshipConstraint {
        let mut constraint = RelationshipConstraint::new(CardinalityRange {
            lower: self.lower,
            upper: self.upper,
        })
        .polymorphic(self.polymorphic);
        for class in &self.classes {
            constraint = constraint.with_class(class.to_ref());
        }
        constraint
    }
}

/// Relationship payload row.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct RelationshipRow {
    /// Source endpoint.
    pub source: RelationshipConstraintRow,
    /// Target endpoint.
    pub target: RelationshipConstraintRow,
}

/// One durable class record.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ClassRow {
    /// Owning schema name.
    pub schema: String,
    /// Class name.
    pub name: String,
    /// Class kind.
    pub kind: ClassKindRow,
    /// Base classes, schema-resolved.
    pub base_classes: Vec<ClassRefRow>,
    /// Directly declared properties.
    pub properties: Vec<PropertyRow>,
    /// Attribute instances attached to the class.
    pub attributes: Vec<AttrRow>,
    /// Relationship payload if the kind is `Relationship`.
    pub relationship: Option<RelationshipRow>,
}

impl ClassRow {
    /// Build a row from a class definition within its schema.
    pub fn from_def(schema: &str, def: &ClassDef) -> Self {
        Self {
            schema: schema.to_string(),
            name: def.name.clone(),
            kind: def.kind.into(),
            base_classes: def
                .base_classes
                .iter()
                .map(|r| ClassRefRow::from_ref(r, schema))
                .collect(),
            properties: def
                .properties
                .iter()
                .map(|p| PropertyRow {
                    name: p.name.clone(),
                    property_type: PropertyTypeRow::from_type(&p.property_type, schema),
                    attributes: p.attributes.iter().map(AttrRow::from_instance).collect(),
                })
                .collect(),
            attributes: def.attributes.iter().map(AttrRow::from_instance).collect(),
            relationship: def.relationship.as_ref().map(|r| RelationshipRow {
                source: RelationshipConstraintRow::from_constraint(&r.source, schema),
                target: RelationshipConstraintRow::from_constraint(&r.target, schema),
            }),
        }
    }

    /// Rebuild the class definition from this row.
    pub fn to_def(&self) -> Result<ClassDef, Error> {
        let mut def = match &self.relationship {
            Some(rel) => ClassDef::relationship(
                self.name.clone(),
                RelationshipDef::new(rel.source.to_constraint(), rel.target.to_constraint()),
            ),
            None => match ClassKind::from(self.kind) {
                ClassKind::Struct => ClassDef::structure(self.name.clone()),
                _ => ClassDef::entity(self.name.clone()),
            },
        };
        for base in &self.base_classes {
            def.add_base_class(base.to_ref())?;
        }
        for prop in &self.properties {
            let mut property = PropertyDef {
                name: prop.name.clone(),
                property_type: prop.property_type.to_type(),
                attributes: Vec::new(),
            };
            for attr in &prop.attributes {
                property = property.with_attribute(attr.to_instance()?);
            }
            def.add_property(property)?;
        }
        for attr in &self.attributes {
            def.set_attribute(attr.to_instance()?);
        }
        Ok(def)
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// A reference to another durable schema.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct SchemaRefRow {
    /// Referenced schema name.
    pub name: String,
    /// Referenced major version.
    pub version_major: u32,
    /// Referenced minor version.
    pub version_minor: u32,
}

/// Supplemental marker, storage form.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct SupplementalRow {
    /// Primary schema name.
    pub primary_name: String,
    /// Declared primary major version.
    pub primary_major: u32,
    /// Declared primary minor version.
    pub primary_minor: u32,
    /// Overlay purpose tag.
    pub purpose: String,
    /// Merge precedence.
    pub priority: u32,
}

/// One durable schema record. Class rows live in their own tree.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SchemaRow {
    /// Schema name.
    pub name: String,
    /// Namespace prefix.
    pub alias: String,
    /// Major version.
    pub version_major: u32,
    /// Minor version.
    pub version_minor: u32,
    /// Referenced schema keys.
    pub references: Vec<SchemaRefRow>,
    /// Supplemental marker if this is an overlay schema.
    pub supplemental: Option<SupplementalRow>,
}

impl SchemaRow {
    /// Build a row from a schema definition.
    pub fn from_def(def: &SchemaDef) -> Self {
        Self {
            name: def.key.name.clone(),
            alias: def.alias.clone(),
            version_major: def.key.version_major,
            version_minor: def.key.version_minor,
            references: def
                .references
                .iter()
                .map(|r| SchemaRefRow {
                    name: r.key.name.clone(),
                    version_major: r.key.version_major,
                    version_minor: r.key.version_minor,
                })
                .collect(),
            supplemental: def.supplemental.as_ref().map(|s| SupplementalRow {
                primary_name: s.primary_name.clone(),
                primary_major: s.primary_major,
                primary_minor: s.primary_minor,
                purpose: s.purpose.clone(),
                priority: s.priority,
            }),
        }
    }

    /// The schema key recorded in this row.
    pub fn key(&self) -> SchemaKey {
        SchemaKey::new(self.name.clone(), self.version_major, self.version_minor)
    }

    /// The supplemental marker as a model value.
    pub fn supplemental_info(&self) -> Option<SupplementalInfo> {
        self.supplemental.as_ref().map(|s| SupplementalInfo {
            primary_name: s.primary_name.clone(),
            primary_major: s.primary_major,
            primary_minor: s.primary_minor,
            purpose: s.purpose.clone(),
            priority: s.priority,
        })
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
