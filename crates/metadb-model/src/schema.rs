//! Schema definitions.

use std::sync::Arc;

use crate::attribute::AttributeInstance;
use crate::class::ClassDef;
use crate::error::ModelError;
use crate::key::{ClassRef, SchemaKey};

/// Marker carried by a supplemental schema.
///
/// A supplemental schema holds no structural definitions of its own; it
/// overlays custom attributes onto the primary schema it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementalInfo {
    /// Name of the primary schema this overlay targets.
    pub primary_name: String,
    /// Required major version of the primary.
    pub primary_major: u32,
    /// Minimum minor version of the primary.
    pub primary_minor: u32,
    /// Purpose tag, e.g. "Units" or "Localization".
    pub purpose: String,
    /// Merge precedence; higher priority wins on conflicts.
    pub priority: u32,
}

/// A versioned schema: a named collection of class definitions.
///
/// References to other schemas are held as shared pointers so a staged
/// graph keeps its dependencies alive; class-to-class edges within and
/// across schemas stay as [`ClassRef`]s.
#[derive(Debug, Clone)]
pub struct SchemaDef {
    /// Identity of this schema.
    pub key: SchemaKey,
    /// Short alias used for qualified lookups, e.g. "bis".
    pub alias: String,
    /// Classes defined by this schema, in declaration order.
    pub classes: Vec<ClassDef>,
    /// Schemas this schema references.
    pub references: Vec<Arc<SchemaDef>>,
    /// Present iff this is a supplemental overlay schema.
    pub supplemental: Option<SupplementalInfo>,
}

impl SchemaDef {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>, alias: impl Into<String>, major: u32, minor: u32) -> Self {
        Self {
            key: SchemaKey::new(name, major, minor),
            alias: alias.into(),
            classes: Vec::new(),
            references: Vec::new(),
            supplemental: None,
        }
    }

    /// Create a supplemental overlay schema targeting a primary.
    pub fn supplemental(
        name: impl Into<String>,
        alias: impl Into<String>,
        major: u32,
        minor: u32,
        info: SupplementalInfo,
    ) -> Self {
        let mut schema = Self::new(name, alias, major, minor);
        schema.supplemental = Some(info);
        schema
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Whether this schema is a supplemental overlay.
    pub fn is_supplemental(&self) -> bool {
        self.supplemental.is_some()
    }

    /// Add a class definition.
    ///
    /// Fails if a class with the same name already exists, compared
    /// case-insensitively.
    pub fn add_class(&mut self, class: ClassDef) -> Result<(), ModelError> {
        if self
            .classes
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&class.name))
        {
            return Err(ModelError::DuplicateName {
                scope: format!("schema '{}'", self.key.name),
                name: class.name,
            });
        }
        self.classes.push(class);
        Ok(())
    }

    /// Add a referenced schema.
    pub fn add_reference(&mut self, reference: Arc<SchemaDef>) {
        if !self.references.iter().any(|r| r.key == reference.key) {
            self.references.push(reference);
        }
    }

    /// Get a class by exact name.
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Get a class by exact name, mutably.
    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassDef> {
        self.classes.iter_mut().find(|c| c.name == name)
    }

    /// Number of classes defined by this schema.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Resolve a class reference against this schema and its references.
    ///
    /// Local refs resolve within this schema; foreign refs search the
    /// directly referenced schemas by name.
    pub fn resolve_class(&self, class_ref: &ClassRef) -> Option<&ClassDef> {
        match class_ref.schema.as_deref() {
            None => self.class(&class_ref.name),
            Some(schema) if schema == self.key.name => self.class(&class_ref.name),
            Some(schema) => self
                .references
                .iter()
                .find(|r| r.key.name == schema)
                .and_then(|r| r.class(&class_ref.name)),
        }
    }

    /// Count the properties of a class, optionally including inherited
    /// ones gathered by walking base classes transitively.
    pub fn property_count(&self, class_name: &str, include_base: bool) -> usize {
        let Some(class) = self.class(class_name) else {
            return 0;
        };
        if !include_base {
            return class.properties.len();
        }
        let mut count = class.properties.len();
        for base in &class.base_classes {
            if let Some(base_class) = self.resolve_class(base) {
                let owner = base.schema_or(self.name());
                count += self.property_count_in(owner, &base_class.name);
            }
        }
        count
    }

    fn property_count_in(&self, schema: &str, class_name: &str) -> usize {
        if schema == self.key.name {
            self.property_count(class_name, true)
        } else {
            self.references
                .iter()
                .find(|r| r.key.name == schema)
                .map(|r| r.property_count(class_name, true))
                .unwrap_or(0)
        }
    }

    /// Collect the custom attributes visible on a class, optionally
    /// including attributes inherited from base classes.
    ///
    /// Directly attached instances shadow inherited instances of the
    /// same attribute class.
    pub fn attributes(&self, class_name: &str, include_base: bool) -> Vec<AttributeInstance> {
        let Some(class) = self.class(class_name) else {
            return Vec::new();
        };
        let mut out = class.attributes.clone();
        if include_base {
            for base in &class.base_classes {
                let owner = base.schema_or(self.name()).to_string();
                let inherited = if owner == self.key.name {
                    self.attributes(&base.name, true)
                } else {
                    self.references
                        .iter()
                        .find(|r| r.key.name == owner)
                        .map(|r| r.attributes(&base.name, true))
                        .unwrap_or_default()
                };
                for attr in inherited {
                    if !out.iter().any(|a| a.attr_class == attr.attr_class) {
                        out.push(attr);
                    }
                }
            }
        }
        out
    }
}
