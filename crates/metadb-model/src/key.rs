//! Schema and class identity keys.

use std::fmt;

/// Identity of a schema: name plus major.minor version.
///
/// Keys order by name, then major, then minor, so the maximum among
/// same-named keys is the latest version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaKey {
    /// Schema name (case-sensitive).
    pub name: String,
    /// Major version.
    pub version_major: u32,
    /// Minor version.
    pub version_minor: u32,
}

impl SchemaKey {
    /// Create a new schema key.
    pub fn new(name: impl Into<String>, version_major: u32, version_minor: u32) -> Self {
        Self {
            name: name.into(),
            version_major,
            version_minor,
        }
    }

    /// The (major, minor) version pair.
    pub fn version(&self) -> (u32, u32) {
        (self.version_major, self.version_minor)
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}.{:02}",
            self.name, self.version_major, self.version_minor
        )
    }
}

/// Schema-qualified class identity, used as the arena key by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassKey {
    /// Owning schema name.
    pub schema: String,
    /// Class name.
    pub name: String,
}

impl ClassKey {
    /// Create a new class key.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.schema, self.name)
    }
}

/// A non-owning reference to a class.
///
/// `schema == None` refers to a class in the same schema the reference
/// appears in. Base-class edges and struct property targets are stored
/// as refs and resolved on demand, never as direct pointers, so
/// partially loaded graphs stay representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    /// Schema name, or `None` for the containing schema.
    pub schema: Option<String>,
    /// Class name.
    pub name: String,
}

impl ClassRef {
    /// Reference a class in the same schema.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Reference a class in another schema.
    pub fn foreign(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// The schema this ref points into, given the containing schema.
    pub fn schema_or<'a>(&'a self, containing: &'a str) -> &'a str {
        self.schema.as_deref().unwrap_or(containing)
    }

    /// Resolve to a fully qualified class key.
    pub fn to_key(&self, containing: &str) -> ClassKey {
        ClassKey::new(self.schema_or(containing), self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering_selects_latest() {
        let mut keys = vec![
            SchemaKey::new("Basic", 1, 70),
            SchemaKey::new("Basic", 1, 9),
            SchemaKey::new("Basic", 2, 0),
            SchemaKey::new("Basic", 1, 69),
        ];
        keys.sort();
        assert_eq!(keys.last().unwrap().version(), (2, 0));
    }

    #[test]
    fn test_key_display() {
        let key = SchemaKey::new("School", 1, 5);
        assert_eq!(key.to_string(), "School.01.05");
    }

    #[test]
    fn test_class_ref_resolution() {
        let local = ClassRef::local("Base");
        assert_eq!(local.schema_or("MySchema"), "MySchema");
        assert_eq!(local.to_key("MySchema"), ClassKey::new("MySchema", "Base"));

        let foreign = ClassRef::foreign("Other", "Base");
        assert_eq!(foreign.schema_or("MySchema"), "Other");
    }
}
