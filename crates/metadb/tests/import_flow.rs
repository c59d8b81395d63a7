//! End-to-end import, supplementation and update flows.

use std::sync::Arc;

use metadb::{
    AttributeInstance, ClassDef, ClassRef, Error, ImportOptions, MetaDb, PrimitiveType,
    PropertyDef, ResolveSchema, SchemaCache, SchemaDef, StoreConfig, SupplementalInfo,
};
use serde_json::json;

fn company_schema() -> SchemaDef {
    let mut schema = SchemaDef::new("Company", "co", 1, 2);

    let mut person = ClassDef::entity("Person");
    person
        .add_property(PropertyDef::primitive("Name", PrimitiveType::String))
        .unwrap();
    person.set_attribute(AttributeInstance::with_values(
        "DisplayOptions",
        json!({"hidden": false}),
    ));
    schema.add_class(person).unwrap();

    let mut employee = ClassDef::entity("Employee");
    employee.add_base_class(ClassRef::local("Person")).unwrap();
    employee
        .add_property(PropertyDef::primitive("Salary", PrimitiveType::Double))
        .unwrap();
    schema.add_class(employee).unwrap();

    schema
}

fn units_overlay(priority: u32, minor: u32, digits: u32) -> SchemaDef {
    let mut overlay = SchemaDef::supplemental(
        format!("Company_Units_{minor}"),
        "cu",
        1,
        minor,
        SupplementalInfo {
            primary_name: "Company".into(),
            primary_major: 1,
            primary_minor: minor,
            purpose: "Units".into(),
            priority,
        },
    );
    let mut person = ClassDef::entity("Person");
    person.set_attribute(AttributeInstance::with_values(
        "UnitFormat",
        json!({"digits": digits}),
    ));
    overlay.classes.push(person);
    overlay
}

#[test]
fn test_import_and_reopen_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());

    {
        let db = MetaDb::open(config.clone()).unwrap();
        let cache = SchemaCache::new();
        cache.add_schema(Arc::new(company_schema())).unwrap();
        db.import_schemas(&cache, ImportOptions::default()).unwrap();
        db.flush().unwrap();
    }

    let db = MetaDb::open(config).unwrap();
    let schema = db.schemas().get_schema("Company", true).unwrap();
    assert_eq!(schema.class_count(), 2);
    assert_eq!(schema.alias(), "co");

    let employee = db
        .schemas()
        .get_class("co", "Employee", ResolveSchema::AutoDetect)
        .unwrap();
    assert_eq!(employee.property_count(true).unwrap(), 2);

    // Inherited attribute comes through the base class.
    assert_eq!(employee.attributes(false).unwrap().len(), 0);
    assert_eq!(employee.attributes(true).unwrap().len(), 1);
}

#[test]
fn test_supplemented_attributes_are_durable() {
    let db = MetaDb::temporary().unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(company_schema())).unwrap();
    cache.add_schema(Arc::new(units_overlay(1, 2, 4))).unwrap();
    db.import_schemas(&cache, ImportOptions::default()).unwrap();

    let person = db
        .schemas()
        .get_class("Company", "Person", ResolveSchema::ByName)
        .unwrap();
    let attrs = person.attributes(false).unwrap();
    assert_eq!(attrs.len(), 2);
    let unit = attrs.iter().find(|a| a.attr_class == "UnitFormat").unwrap();
    assert_eq!(unit.values, json!({"digits": 4}));
}

#[test]
fn test_supplement_version_gating_end_to_end() {
    let db = MetaDb::temporary().unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(company_schema())).unwrap();
    // Declared minor below the primary's actual minor: gated out.
    cache.add_schema(Arc::new(units_overlay(1, 1, 9))).unwrap();
    let summary = db.import_schemas(&cache, ImportOptions::default()).unwrap();
    // The overlay itself is still persisted; only its merge is gated.
    assert_eq!(summary.imported.len(), 2);

    let person = db
        .schemas()
        .get_class("Company", "Person", ResolveSchema::ByName)
        .unwrap();
    let attrs = person.attributes(false).unwrap();
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[0].attr_class, "DisplayOptions");
}

#[test]
fn test_supplement_opt_out() {
    let db = MetaDb::temporary().unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(company_schema())).unwrap();
    cache.add_schema(Arc::new(units_overlay(1, 2, 4))).unwrap();
    db.import_schemas(&cache, ImportOptions::default().supplement(false))
        .unwrap();

    let person = db
        .schemas()
        .get_class("Company", "Person", ResolveSchema::ByName)
        .unwrap();
    assert_eq!(person.attributes(false).unwrap().len(), 1);

    // The overlay schema itself was persisted with its marker.
    let overlay = db.schemas().get_schema("Company_Units_2", false).unwrap();
    assert_eq!(overlay.key().version(), (1, 2));
}

#[test]
fn test_duplicate_import_via_facade_is_idempotent() {
    let db = MetaDb::temporary().unwrap();

    for _ in 0..2 {
        let cache = SchemaCache::new();
        cache.add_schema(Arc::new(company_schema())).unwrap();
        db.import_schemas(&cache, ImportOptions::default()).unwrap();
    }

    let schema = db.schemas().get_schema("Company", true).unwrap();
    assert_eq!(schema.class_count(), 2);
}

#[test]
fn test_update_flow_with_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());

    {
        let db = MetaDb::open(config.clone()).unwrap();
        let cache = SchemaCache::new();
        cache.add_schema(Arc::new(company_schema())).unwrap();
        db.import_schemas(&cache, ImportOptions::default()).unwrap();
        db.flush().unwrap();
    }

    {
        let db = MetaDb::open(config.clone()).unwrap();
        let mut updated = company_schema();
        updated.key.version_minor = 3;
        updated.add_class(ClassDef::entity("Department")).unwrap();

        let cache = SchemaCache::new();
        cache.add_schema(Arc::new(updated)).unwrap();
        db.import_schemas(&cache, ImportOptions::default().allow_update(true))
            .unwrap();
        db.flush().unwrap();
    }

    let db = MetaDb::open(config).unwrap();
    let schema = db.schemas().get_schema("Company", true).unwrap();
    assert_eq!(schema.class_count(), 3);
    assert_eq!(schema.key().version(), (1, 3));
}

#[test]
fn test_failed_update_leaves_durable_schema_intact() {
    let db = MetaDb::temporary().unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(company_schema())).unwrap();
    db.import_schemas(&cache, ImportOptions::default()).unwrap();

    // New version drops the Employee class.
    let mut broken = SchemaDef::new("Company", "co", 1, 3);
    let mut person = ClassDef::entity("Person");
    person
        .add_property(PropertyDef::primitive("Name", PrimitiveType::String))
        .unwrap();
    broken.add_class(person).unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(broken)).unwrap();
    let err = db
        .import_schemas(&cache, ImportOptions::default().allow_update(true))
        .unwrap_err();
    assert!(matches!(err, Error::UpdateConflict(_)));

    let schema = db.schemas().get_schema("Company", true).unwrap();
    assert_eq!(schema.class_count(), 2);
    assert_eq!(schema.key().version(), (1, 2));
}

#[test]
fn test_cache_cannot_be_imported_into_second_db() {
    let first = MetaDb::temporary().unwrap();
    let second = MetaDb::temporary().unwrap();

    let cache = SchemaCache::new();
    cache.add_schema(Arc::new(company_schema())).unwrap();
    first.import_schemas(&cache, ImportOptions::default()).unwrap();

    let err = second
        .import_schemas(&cache, ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::StoreMismatch));
}
