//! Incremental loading behavior over a populated store.

use std::sync::Arc;

use metadb_core::{
    Error, ImportOptions, ResolveSchema, SchemaImporter, SchemaManager, SchemaStore, StoreConfig,
};
use metadb_model::{ClassDef, ClassRef, PrimitiveType, PropertyDef, SchemaCache, SchemaDef};

/// Base / Sub1 / Sub1Sub1 / Sub1Sub2 / Sub2, five classes.
fn hierarchy_schema() -> SchemaDef {
    let mut schema = SchemaDef::new("TestSchema", "ts", 1, 0);

    let mut base = ClassDef::entity("Base");
    base.add_property(PropertyDef::primitive("Code", PrimitiveType::String))
        .unwrap();
    schema.add_class(base).unwrap();

    for (name, parent) in [
        ("Sub1", "Base"),
        ("Sub1Sub1", "Sub1"),
        ("Sub1Sub2", "Sub1"),
        ("Sub2", "Base"),
    ] {
        let mut class = ClassDef::entity(name);
        class.add_base_class(ClassRef::local(parent)).unwrap();
        class
            .add_property(PropertyDef::primitive(
                format!("{name}Prop"),
                PrimitiveType::Int32,
            ))
            .unwrap();
        schema.add_class(class).unwrap();
    }
    schema
}

fn populated_store() -> Arc<SchemaStore> {
    let store = Arc::new(SchemaStore::open(StoreConfig::temporary()).unwrap());
    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(hierarchy_schema())).unwrap();
    SchemaImporter::new(&store)
        .import(&cache, ImportOptions::default())
        .unwrap();
    store
}

#[test]
fn test_derived_classes_load_only_on_request() {
    let manager = SchemaManager::new(populated_store());

    let base = manager
        .get_class("TestSchema", "Base", ResolveSchema::ByName)
        .unwrap();
    // Nothing asked for derived classes yet.
    assert!(base.derived_classes().is_empty());

    let derived = manager.derived_classes(&base).unwrap();
    let mut names: Vec<_> = derived.iter().map(|c| c.name().to_string()).collect();
    names.sort();
    assert_eq!(names, ["Sub1", "Sub2"]);

    // The cheap accessor now reflects the populated index.
    let mut names: Vec<_> = base
        .derived_classes()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, ["Sub1", "Sub2"]);
}

#[test]
fn test_ensure_all_classes_loaded() {
    let manager = SchemaManager::new(populated_store());

    let schema = manager.get_schema("TestSchema", false).unwrap();
    assert_eq!(schema.class_count(), 0);
    assert!(!schema.is_fully_loaded());

    let schema = manager.get_schema("TestSchema", true).unwrap();
    assert_eq!(schema.class_count(), 5);
    assert!(schema.is_fully_loaded());

    // Idempotent.
    let schema = manager.get_schema("TestSchema", true).unwrap();
    assert_eq!(schema.class_count(), 5);
}

#[test]
fn test_single_class_loads_base_closure_only() {
    let manager = SchemaManager::new(populated_store());

    let leaf = manager
        .get_class("TestSchema", "Sub1Sub1", ResolveSchema::ByName)
        .unwrap();
    assert_eq!(leaf.property_count(false).unwrap(), 1);
    assert_eq!(leaf.property_count(true).unwrap(), 3);

    // Sub1Sub1, Sub1 and Base are resident; siblings are not.
    let schema = manager.get_schema("TestSchema", false).unwrap();
    assert_eq!(schema.class_count(), 3);
    assert!(!schema.is_fully_loaded());
}

#[test]
fn test_resolution_modes_agree() {
    let manager = SchemaManager::new(populated_store());

    let by_name = manager
        .get_class("TestSchema", "Base", ResolveSchema::ByName)
        .unwrap();
    let by_alias = manager
        .get_class("ts", "Base", ResolveSchema::ByAlias)
        .unwrap();
    let auto_name = manager
        .get_class("TestSchema", "Base", ResolveSchema::AutoDetect)
        .unwrap();
    let auto_alias = manager
        .get_class("ts", "Base", ResolveSchema::AutoDetect)
        .unwrap();

    assert_eq!(by_name.key(), by_alias.key());
    assert_eq!(by_name.key(), auto_name.key());
    assert_eq!(by_name.key(), auto_alias.key());

    let err = manager
        .get_class("TestSchema", "Base", ResolveSchema::ByAlias)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_cross_schema_bases_load_individually() {
    let store = Arc::new(SchemaStore::open(StoreConfig::temporary()).unwrap());

    let mut core = SchemaDef::new("CoreSchema", "core", 1, 0);
    let mut element = ClassDef::entity("Element");
    element
        .add_property(PropertyDef::primitive("Id", PrimitiveType::Int64))
        .unwrap();
    core.add_class(element).unwrap();
    core.add_class(ClassDef::entity("Unrelated")).unwrap();
    let core = Arc::new(core);

    let mut domain = SchemaDef::new("DomainSchema", "dom", 1, 0);
    domain.add_reference(Arc::clone(&core));
    let mut widget = ClassDef::entity("Widget");
    widget
        .add_base_class(ClassRef::foreign("CoreSchema", "Element"))
        .unwrap();
    widget
        .add_property(PropertyDef::primitive("Label", PrimitiveType::String))
        .unwrap();
    domain.add_class(widget).unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(domain)).unwrap();
    SchemaImporter::new(&store)
        .import(&cache, ImportOptions::default())
        .unwrap();

    let manager = SchemaManager::new(store);
    let widget = manager
        .get_class("DomainSchema", "Widget", ResolveSchema::ByName)
        .unwrap();
    assert_eq!(widget.property_count(true).unwrap(), 2);

    // The referenced schema is only partially loaded: the base class
    // came in, its sibling did not.
    let core_schema = manager.get_schema("CoreSchema", false).unwrap();
    assert_eq!(core_schema.class_count(), 1);
    assert!(!core_schema.is_fully_loaded());
}

#[test]
fn test_missing_lookups_leave_state_unchanged() {
    let manager = SchemaManager::new(populated_store());

    let err = manager.get_schema("NoSuchSchema", true).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = manager
        .get_class("TestSchema", "NoSuchClass", ResolveSchema::ByName)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let schema = manager.get_schema("TestSchema", false).unwrap();
    assert_eq!(schema.class_count(), 0);
}

#[test]
fn test_managers_load_independently() {
    let store = populated_store();
    let first = SchemaManager::new(Arc::clone(&store));
    let second = SchemaManager::new(store);

    let schema = first.get_schema("TestSchema", true).unwrap();
    assert_eq!(schema.class_count(), 5);

    let schema = second.get_schema("TestSchema", false).unwrap();
    assert_eq!(schema.class_count(), 0);
}

#[test]
fn test_derived_classes_across_schemas() {
    let store = Arc::new(SchemaStore::open(StoreConfig::temporary()).unwrap());

    let mut core = SchemaDef::new("CoreSchema", "core", 1, 0);
    core.add_class(ClassDef::entity("Element")).unwrap();
    let core = Arc::new(core);

    let mut domain = SchemaDef::new("DomainSchema", "dom", 1, 0);
    domain.add_reference(Arc::clone(&core));
    let mut widget = ClassDef::entity("Widget");
    widget
        .add_base_class(ClassRef::foreign("CoreSchema", "Element"))
        .unwrap();
    domain.add_class(widget).unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(domain)).unwrap();
    SchemaImporter::new(&store)
        .import(&cache, ImportOptions::default())
        .unwrap();

    let manager = SchemaManager::new(store);
    let element = manager
        .get_class("CoreSchema", "Element", ResolveSchema::ByName)
        .unwrap();
    let derived = manager.derived_classes(&element).unwrap();
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].key().schema, "DomainSchema");
    assert_eq!(derived[0].name(), "Widget");
}
