//! Structural schema validation.
//!
//! Runs before any durable write. Every violation is collected; the
//! importer fails the whole batch if the list is non-empty.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use metadb_model::{ClassDef, ClassKey, ClassRef, SchemaDef};

/// One structural violation found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The schema the violation was found in.
    pub schema: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn new(schema: &str, message: String) -> Self {
        Self {
            schema: schema.to_string(),
            message,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.schema, self.message)
    }
}

/// Name-keyed view over the schemas of one import, including their
/// transitively referenced schemas.
struct SchemaSet<'a> {
    by_name: HashMap<&'a str, &'a SchemaDef>,
}

impl<'a> SchemaSet<'a> {
    fn build(schemas: &'a [Arc<SchemaDef>]) -> Self {
        let mut by_name = HashMap::new();
        for schema in schemas {
            Self::collect(schema, &mut by_name);
        }
        Self { by_name }
    }

    fn collect(schema: &'a SchemaDef, by_name: &mut HashMap<&'a str, &'a SchemaDef>) {
        if by_name.insert(schema.name(), schema).is_some() {
            return;
        }
        for reference in &schema.references {
            Self::collect(reference, by_name);
        }
    }

    fn class(&self, schema: &str, name: &str) -> Option<&'a ClassDef> {
        self.by_name.get(schema).and_then(|s| s.class(name))
    }

    fn resolve(&self, containing: &str, class_ref: &ClassRef) -> Option<(ClassKey, &'a ClassDef)> {
        let key = class_ref.to_key(containing);
        self.class(&key.schema, &key.name).map(|c| (key, c))
    }

    /// Transitive base classes of a class, cycle-safe.
    fn ancestors(&self, start: &ClassKey) -> HashSet<ClassKey> {
        let mut out = HashSet::new();
        let mut stack = vec![start.clone()];
        while let Some(key) = stack.pop() {
            let Some(class) = self.class(&key.schema, &key.name) else {
                continue;
            };
            for base in &class.base_classes {
                let base_key = base.to_key(&key.schema);
                if out.insert(base_key.clone()) {
                    stack.push(base_key);
                }
            }
        }
        out
    }
}

/// Validate a set of schemas against the structural legality rules.
///
/// Never short-circuits; the returned list holds every violation found.
pub fn validate_schemas(schemas: &[Arc<SchemaDef>]) -> Vec<ValidationIssue> {
    let set = SchemaSet::build(schemas);
    let mut issues = Vec::new();

    for schema in schemas {
        if schema.is_supplemental() {
            continue;
        }
        check_class_name_collisions(schema, &mut issues);
        for class in &schema.classes {
            let key = ClassKey::new(schema.name(), class.name.clone());
            check_property_collisions(schema.name(), class, &key, &set, &mut issues);
            check_self_typing(schema.name(), class, &key, &set, &mut issues);
            check_base_kinds(schema.name(), class, &set, &mut issues);
            check_relationship_endpoints(schema.name(), class, &set, &mut issues);
        }
    }

    issues
}

fn check_class_name_collisions(schema: &SchemaDef, issues: &mut Vec<ValidationIssue>) {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for class in &schema.classes {
        let lower = class.name.to_lowercase();
        if let Some(first) = seen.get(lower.as_str()) {
            issues.push(ValidationIssue::new(
                schema.name(),
                format!(
                    "classes '{}' and '{}' differ only by case",
                    first, class.name
                ),
            ));
        } else {
            seen.insert(lower, &class.name);
        }
    }
}

fn check_property_collisions(
    schema: &str,
    class: &ClassDef,
    key: &ClassKey,
    set: &SchemaSet<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    // Inherited names from every transitive base.
    let mut inherited: HashMap<String, ClassKey> = HashMap::new();
    for base_key in set.ancestors(key) {
        if let Some(base) = set.class(&base_key.schema, &base_key.name) {
            for prop in &base.properties {
                inherited
                    .entry(prop.name.to_lowercase())
                    .or_insert_with(|| base_key.clone());
            }
        }
    }

    let mut declared: HashSet<String> = HashSet::new();
    for prop in &class.properties {
        let lower = prop.name.to_lowercase();
        if !declared.insert(lower.clone()) {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "class '{}' declares properties named '{}' differing only by case",
                    class.name, prop.name
                ),
            ));
        }
        if let Some(base_key) = inherited.get(&lower) {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "property '{}' of class '{}' collides with a property of base class '{}'",
                    prop.name, class.name, base_key
                ),
            ));
        }
    }
}

fn check_self_typing(
    schema: &str,
    class: &ClassDef,
    key: &ClassKey,
    set: &SchemaSet<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    let ancestors = set.ancestors(key);
    for prop in &class.properties {
        let Some(target_ref) = prop.property_type.struct_target() else {
            continue;
        };
        let Some((target_key, _)) = set.resolve(schema, target_ref) else {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "property '{}' of class '{}' is typed as unresolvable class '{}'",
                    prop.name, class.name, target_ref.name
                ),
            ));
            continue;
        };
        let is_self = target_key == *key;
        let is_ancestor = ancestors.contains(&target_key);
        let is_descendant = set.ancestors(&target_key).contains(key);
        if is_self || is_ancestor || is_descendant {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "property '{}' of class '{}' is typed as its own class hierarchy ('{}')",
                    prop.name, class.name, target_key
                ),
            ));
        }
    }
}

fn check_base_kinds(
    schema: &str,
    class: &ClassDef,
    set: &SchemaSet<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    for base_ref in &class.base_classes {
        let Some((base_key, base)) = set.resolve(schema, base_ref) else {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "class '{}' has unresolvable base class '{}'",
                    class.name, base_ref.name
                ),
            ));
            continue;
        };
        if base.is_relationship() && !class.is_relationship() {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "class '{}' derives from relationship class '{}'",
                    class.name, base_key
                ),
            ));
        } else if !base.is_relationship() && class.is_relationship() {
            issues.push(ValidationIssue::new(
                schema,
                format!(
                    "relationship class '{}' derives from non-relationship class '{}'",
                    class.name, base_key
                ),
            ));
        }
    }
}

fn check_relationship_endpoints(
    schema: &str,
    class: &ClassDef,
    set: &SchemaSet<'_>,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(rel) = &class.relationship else {
        return;
    };
    for (side, constraint) in [("source", &rel.source), ("target", &rel.target)] {
        for endpoint in &constraint.classes {
            let Some((endpoint_key, endpoint_class)) = set.resolve(schema, endpoint) else {
                issues.push(ValidationIssue::new(
                    schema,
                    format!(
                        "relationship '{}' {} constraint references unresolvable class '{}'",
                        class.name, side, endpoint.name
                    ),
                ));
                continue;
            };
            if endpoint_class.is_relationship() && constraint.polymorphic {
                issues.push(ValidationIssue::new(
                    schema,
                    format!(
                        "relationship '{}' {} constraint references relationship class '{}' polymorphically",
                        class.name, side, endpoint_key
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadb_model::{
        CardinalityRange, ClassRef, PrimitiveType, PropertyDef, RelationshipConstraint,
        RelationshipDef,
    };

    fn wrap(schema: SchemaDef) -> Vec<Arc<SchemaDef>> {
        vec![Arc::new(schema)]
    }

    #[test]
    fn test_class_case_collision() {
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        schema.classes.push(ClassDef::entity("TestClass"));
        schema.classes.push(ClassDef::entity("TESTCLASS"));
        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("differ only by case"));
    }

    #[test]
    fn test_same_property_name_in_unrelated_classes_is_legal() {
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        let mut a = ClassDef::entity("TestClass");
        a.add_property(PropertyDef::primitive("TestProperty", PrimitiveType::String))
            .unwrap();
        let mut b = ClassDef::entity("TestClass2");
        b.add_property(PropertyDef::primitive("TestProperty", PrimitiveType::String))
            .unwrap();
        schema.add_class(a).unwrap();
        schema.add_class(b).unwrap();
        assert!(validate_schemas(&wrap(schema)).is_empty());
    }

    #[test]
    fn test_base_property_case_collision() {
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        let mut base = ClassDef::entity("Base");
        base.add_property(PropertyDef::primitive("Code", PrimitiveType::String))
            .unwrap();
        let mut grand = ClassDef::entity("Mid");
        grand.add_base_class(ClassRef::local("Base")).unwrap();
        let mut sub = ClassDef::entity("Sub");
        sub.add_base_class(ClassRef::local("Mid")).unwrap();
        sub.add_property(PropertyDef::primitive("CODE", PrimitiveType::Int32))
            .unwrap();
        schema.add_class(base).unwrap();
        schema.add_class(grand).unwrap();
        schema.add_class(sub).unwrap();

        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("base class"));
    }

    #[test]
    fn test_struct_typed_as_itself() {
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        let mut part = ClassDef::structure("Part");
        part.add_property(PropertyDef::structure("Inner", ClassRef::local("Part")))
            .unwrap();
        schema.add_class(part).unwrap();

        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("own class hierarchy"));
    }

    #[test]
    fn test_array_of_subclass_rejected() {
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        let mut base = ClassDef::structure("Base");
        base.add_property(PropertyDef::struct_array("Items", ClassRef::local("Sub")))
            .unwrap();
        let mut sub = ClassDef::structure("Sub");
        sub.add_base_class(ClassRef::local("Base")).unwrap();
        schema.add_class(base).unwrap();
        schema.add_class(sub).unwrap();

        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_relationship_inheritance_both_directions() {
        let rel = RelationshipDef::new(
            RelationshipConstraint::new(CardinalityRange::one_one()).with_class(ClassRef::local("A")),
            RelationshipConstraint::new(CardinalityRange::zero_many())
                .with_class(ClassRef::local("B")),
        );

        // Non-relationship deriving from a relationship.
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        schema.add_class(ClassDef::entity("A")).unwrap();
        schema.add_class(ClassDef::entity("B")).unwrap();
        schema
            .add_class(ClassDef::relationship("Link", rel.clone()))
            .unwrap();
        let mut bad = ClassDef::entity("NotALink");
        bad.add_base_class(ClassRef::local("Link")).unwrap();
        schema.add_class(bad).unwrap();
        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("derives from relationship class"));

        // Relationship deriving from a non-relationship.
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        schema.add_class(ClassDef::entity("A")).unwrap();
        schema.add_class(ClassDef::entity("B")).unwrap();
        let mut bad = ClassDef::relationship("Link", rel);
        bad.add_base_class(ClassRef::local("A")).unwrap();
        schema.add_class(bad).unwrap();
        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
        assert!(issues[0]
            .message
            .contains("derives from non-relationship class"));
    }

    #[test]
    fn test_polymorphic_relationship_endpoint_rejected() {
        let inner = RelationshipDef::new(
            RelationshipConstraint::new(CardinalityRange::one_one()).with_class(ClassRef::local("A")),
            RelationshipConstraint::new(CardinalityRange::zero_many())
                .with_class(ClassRef::local("B")),
        );
        let outer = RelationshipDef::new(
            RelationshipConstraint::new(CardinalityRange::one_one()).with_class(ClassRef::local("A")),
            RelationshipConstraint::new(CardinalityRange::zero_many())
                .with_class(ClassRef::local("Link")),
        );

        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        schema.add_class(ClassDef::entity("A")).unwrap();
        schema.add_class(ClassDef::entity("B")).unwrap();
        schema
            .add_class(ClassDef::relationship("Link", inner.clone()))
            .unwrap();
        schema
            .add_class(ClassDef::relationship("Outer", outer))
            .unwrap();
        let issues = validate_schemas(&wrap(schema));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("polymorphically"));

        // Explicitly non-polymorphic endpoint is allowed.
        let outer = RelationshipDef::new(
            RelationshipConstraint::new(CardinalityRange::one_one()).with_class(ClassRef::local("A")),
            RelationshipConstraint::new(CardinalityRange::zero_many())
                .with_class(ClassRef::local("Link"))
                .polymorphic(false),
        );
        let mut schema = SchemaDef::new("Test", "t", 1, 0);
        schema.add_class(ClassDef::entity("A")).unwrap();
        schema.add_class(ClassDef::entity("B")).unwrap();
        schema.add_class(ClassDef::relationship("Link", inner)).unwrap();
        schema
            .add_class(ClassDef::relationship("Outer", outer))
            .unwrap();
        assert!(validate_schemas(&wrap(schema)).is_empty());
    }

    #[test]
    fn test_cross_schema_resolution_through_references() {
        let mut core = SchemaDef::new("Core", "co", 1, 0);
        let mut element = ClassDef::entity("Element");
        element
            .add_property(PropertyDef::primitive("Id", PrimitiveType::Int64))
            .unwrap();
        core.add_class(element).unwrap();
        let core = Arc::new(core);

        let mut domain = SchemaDef::new("Domain", "dm", 1, 0);
        domain.add_reference(Arc::clone(&core));
        let mut widget = ClassDef::entity("Widget");
        widget
            .add_base_class(ClassRef::foreign("Core", "Element"))
            .unwrap();
        widget
            .add_property(PropertyDef::primitive("ID", PrimitiveType::Int32))
            .unwrap();
        domain.add_class(widget).unwrap();

        // Only the referencing schema is passed in; the reference is
        // found through its reference edge.
        let issues = validate_schemas(&wrap(domain));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("base class"));
    }
}
