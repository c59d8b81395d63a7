//! Class definitions.

use crate::attribute::{set_attribute, AttributeInstance};
use crate::error::ModelError;
use crate::key::ClassRef;
use crate::property::PropertyDef;
use crate::relationship::RelationshipDef;

/// The kind of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Regular domain class.
    Entity,
    /// Struct class usable as a property type.
    Struct,
    /// Relationship class linking two endpoint constraints.
    Relationship,
}

/// A class definition.
///
/// Base classes are held as ordered, non-owning [`ClassRef`]s and
/// resolved on demand; properties are only those declared directly on
/// this class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name (unique within the schema, case-insensitively).
    pub name: String,
    /// Class kind.
    pub kind: ClassKind,
    /// Direct base classes, in declaration order. Multiple inheritance
    /// is permitted for non-relationship classes.
    pub base_classes: Vec<ClassRef>,
    /// Properties declared directly on this class.
    pub properties: Vec<PropertyDef>,
    /// Attached custom-attribute instances.
    pub attributes: Vec<AttributeInstance>,
    /// Endpoint constraints; present iff `kind == Relationship`.
    pub relationship: Option<RelationshipDef>,
}

impl ClassDef {
    fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base_classes: Vec::new(),
            properties: Vec::new(),
            attributes: Vec::new(),
            relationship: None,
        }
    }

    /// Create an entity class.
    pub fn entity(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Entity)
    }

    /// Create a struct class.
    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Struct)
    }

    /// Create a relationship class.
    pub fn relationship(name: impl Into<String>, relationship: RelationshipDef) -> Self {
        let mut class = Self::new(name, ClassKind::Relationship);
        class.relationship = Some(relationship);
        class
    }

    /// Declare a property on this class.
    ///
    /// Fails if a property with the same name already exists, compared
    /// case-insensitively. Collisions against base-class properties are
    /// not checked here; they are a validation concern because bases
    /// may live in schemas that are not resident yet.
    pub fn add_property(&mut self, property: PropertyDef) -> Result<(), ModelError> {
        if self
            .properties
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&property.name))
        {
            return Err(ModelError::DuplicateName {
                scope: format!("class '{}'", self.name),
                name: property.name,
            });
        }
        self.properties.push(property);
        Ok(())
    }

    /// Add a direct base class.
    ///
    /// Fails if a base of the same name is already declared, compared
    /// case-insensitively within the same schema.
    pub fn add_base_class(&mut self, base: ClassRef) -> Result<(), ModelError> {
        let duplicate = self.base_classes.iter().any(|b| {
            b.name.eq_ignore_ascii_case(&base.name)
                && match (&b.schema, &base.schema) {
                    (Some(a), Some(c)) => a.eq_ignore_ascii_case(c),
                    (None, None) => true,
                    _ => false,
                }
        });
        if duplicate {
            return Err(ModelError::DuplicateName {
                scope: format!("base classes of '{}'", self.name),
                name: base.name,
            });
        }
        self.base_classes.push(base);
        Ok(())
    }

    /// Attach a custom-attribute instance, replacing any instance of
    /// the same attribute class.
    pub fn set_attribute(&mut self, attr: AttributeInstance) {
        set_attribute(&mut self.attributes, attr);
    }

    /// Get a directly declared property by exact name.
    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Get a directly declared property by exact name, mutably.
    pub fn get_property_mut(&mut self, name: &str) -> Option<&mut PropertyDef> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    /// Number of directly declared properties.
    pub fn direct_property_count(&self) -> usize {
        self.properties.len()
    }

    /// Whether this class is a relationship class.
    pub fn is_relationship(&self) -> bool {
        self.kind == ClassKind::Relationship
    }
}
