//! Custom-attribute instances.

use serde_json::Value;

/// A custom-attribute instance attached to a class or property.
///
/// The attribute class identifies the kind of metadata; the payload is
/// a free-form JSON value. Attributes are distinct from the structural
/// schema definition and accumulate across supplemental overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInstance {
    /// Name of the custom-attribute class.
    pub attr_class: String,
    /// Instance payload.
    pub values: Value,
}

impl AttributeInstance {
    /// Create an attribute instance with an empty payload.
    pub fn new(attr_class: impl Into<String>) -> Self {
        Self {
            attr_class: attr_class.into(),
            values: Value::Null,
        }
    }

    /// Create an attribute instance with a payload.
    pub fn with_values(attr_class: impl Into<String>, values: Value) -> Self {
        Self {
            attr_class: attr_class.into(),
            values,
        }
    }
}

/// Replace an instance of the same attribute class in place, or append.
///
/// Supplemental merging relies on this: a later (higher-priority)
/// overlay's instance of the same attribute class supersedes an earlier
/// one on the same element, while different classes accumulate.
pub(crate) fn set_attribute(attributes: &mut Vec<AttributeInstance>, attr: AttributeInstance) {
    match attributes.iter_mut().find(|a| a.attr_class == attr.attr_class) {
        Some(existing) => *existing = attr,
        None => attributes.push(attr),
    }
}
