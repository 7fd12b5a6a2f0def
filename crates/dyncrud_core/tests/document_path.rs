//! End-to-end tests of the document path.

use dyncrud_core::{
    fields, CascadeMode, Config, CoreError, Engine, ErrorStatus, FieldMap, InMemoryEngine,
    SubObject, TransactionRequest, TypeRegistry,
};
use serde_json::json;
use std::sync::Arc;

fn engine_with(registry: TypeRegistry, config: Config) -> Engine {
    Engine::with_config(Arc::new(InMemoryEngine::new()), registry, config)
}

#[test]
fn create_and_get_round_trip() {
    let engine = Engine::in_memory();
    let input = fields! { "Title" => "Groceries", "Items" => ["milk", "eggs"], "Done" => false };
    let created = engine.create("Note", input.clone()).unwrap();

    let doc = created.as_document().unwrap();
    assert_eq!(doc.object_type, "note");
    assert_eq!(doc.fields().unwrap(), input);

    let loaded = engine.get_by_id("note", doc.id).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn get_checks_the_type() {
    let engine = Engine::in_memory();
    let note = engine.create("note", fields! { "Title" => "x" }).unwrap();
    let err = engine.get_by_id("memo", note.id().unwrap()).unwrap_err();
    assert_eq!(err.status(), ErrorStatus::NotFound);
}

#[test]
fn registered_document_types_validate_required_fields() {
    let engine = engine_with(
        TypeRegistry::builtin().with_document("note", ["Title", "Body"]),
        Config::default(),
    );
    let err = engine.create("note", fields! { "Body" => "b" }).unwrap_err();
    assert!(matches!(err, CoreError::MissingFields { ref fields, .. } if fields == &["Title"]));

    let note = engine
        .create("note", fields! { "Title" => "t", "Body" => "b" })
        .unwrap();
    let err = engine
        .update("note", note.id().unwrap(), fields! { "Title" => "only" })
        .unwrap_err();
    assert!(matches!(err, CoreError::MissingFields { .. }));
}

#[test]
fn filters_match_structurally() {
    let engine = Engine::in_memory();
    engine
        .create("item", fields! { "Name" => "Lamp", "Price" => 19.99, "Stock" => 5 })
        .unwrap();
    engine
        .create("item", fields! { "Name" => "Lamp shade", "Price" => "19.99", "Stock" => 0 })
        .unwrap();
    engine
        .create("item", fields! { "Name" => "Note: Price 19.99", "Price" => 3 })
        .unwrap();

    let by_price = engine.list("item", [("Price", "19.99")]).unwrap();
    assert_eq!(by_price.len(), 2);

    let exact = engine.list("item", [("Name", "Lamp"), ("Stock", "5")]).unwrap();
    assert_eq!(exact.len(), 1);

    // Keys are exact: no field named "price" exists
    assert!(engine.list("item", [("price", "19.99")]).unwrap().is_empty());
    assert_eq!(engine.list_all("item").unwrap().len(), 3);
}

#[test]
fn update_replaces_the_whole_payload() {
    let engine = Engine::in_memory();
    let doc = engine
        .create("note", fields! { "Title" => "a", "Body" => "b" })
        .unwrap();
    let id = doc.id().unwrap();

    let updated = engine.update("note", id, fields! { "Title" => "c" }).unwrap();
    let fields = updated.as_document().unwrap().fields().unwrap();
    assert_eq!(fields.get("Title"), Some(&json!("c")));
    assert!(fields.get("Body").is_none());

    let err = engine.update("note", 999, FieldMap::new()).unwrap_err();
    assert_eq!(err.status(), ErrorStatus::NotFound);
}

#[test]
fn delete_cascades_to_documents_naming_the_parent() {
    let engine = Engine::in_memory();
    let parent = engine
        .create("catalogue", fields! { "ProductId" => 5, "Name" => "Lamp" })
        .unwrap();
    engine
        .create("review", fields! { "ParentId" => 5, "Stars" => 4 })
        .unwrap();
    engine
        .create("review", fields! { "ParentId" => "5", "Stars" => 2 })
        .unwrap();
    engine
        .create("review", fields! { "ParentId" => 6, "Stars" => 1 })
        .unwrap();

    let parent_id = parent.id().unwrap();
    assert_eq!(engine.delete("catalogue", parent_id).unwrap(), 3);

    assert!(engine.get_by_id("catalogue", parent_id).is_err());
    let left = engine.list("review", [("ParentId", "5")]).unwrap();
    assert!(left.is_empty());
    assert_eq!(engine.list_all("review").unwrap().len(), 1);
}

#[test]
fn one_level_cascade_keeps_grandchildren() {
    let engine = engine_with(
        TypeRegistry::builtin(),
        Config::new().cascade(CascadeMode::OneLevel),
    );
    let created = engine
        .create_with_dependents(
            "folder",
            fields! { "FolderId" => 1 },
            vec![SubObject::new("folder", fields! { "ParentId" => 1, "FolderId" => 2 })],
        )
        .unwrap();
    engine
        .create("folder", fields! { "ParentId" => 2, "FolderId" => 3 })
        .unwrap();

    assert_eq!(engine.delete("folder", created[0].id().unwrap()).unwrap(), 2);
    assert_eq!(engine.list_all("folder").unwrap().len(), 1);
}

#[test]
fn transaction_requires_matching_parent_ids() {
    let engine = Engine::in_memory();
    let request = TransactionRequest {
        master_object_type: "invoice".into(),
        master_fields: fields! { "InvoiceId" => 10, "Total" => 3 },
        sub_objects: vec![
            SubObject::new("line", fields! { "ParentId" => 10, "Qty" => 1 }),
            SubObject::new("line", fields! { "ParentId" => 11, "Qty" => 2 }),
        ],
    };

    let err = engine.execute(request.clone()).unwrap_err();
    assert!(matches!(err, CoreError::ValidationMismatch { .. }));
    assert!(engine.list_all("invoice").unwrap().is_empty());
    assert!(engine.list_all("line").unwrap().is_empty());

    let mut missing_parent = request.clone();
    missing_parent.sub_objects[1].fields.remove("ParentId");
    assert!(matches!(
        engine.execute(missing_parent),
        Err(CoreError::ValidationMismatch { .. })
    ));

    let mut no_key = request.clone();
    no_key.master_fields = fields! { "Total" => 3 };
    no_key.sub_objects.clear();
    assert!(matches!(
        engine.execute(no_key),
        Err(CoreError::ValidationMismatch { .. })
    ));

    let mut fixed = request;
    fixed.sub_objects[1].fields.insert("ParentId", "10");
    let created = engine.execute(fixed).unwrap();
    assert_eq!(created.len(), 3);
    assert_eq!(created[0].type_name(), "invoice");
    assert_eq!(engine.list("line", [("ParentId", "10")]).unwrap().len(), 2);
}

#[test]
fn typed_names_can_be_stored_as_documents() {
    let engine = Engine::in_memory();
    let mut session = engine.session().unwrap();
    let doc = engine
        .documents()
        .create(
            &mut session,
            "Product",
            &fields! {
                "ProductName" => "Lamp",
                "ProductDescription" => "Desk lamp",
                "Price" => "cheap",
                "Extra" => [1, 2],
            },
        )
        .unwrap();
    session.commit().unwrap();

    // Required fields still apply, but nothing is coerced
    assert_eq!(doc.object_type, "product");
    assert_eq!(doc.fields().unwrap().get("Price"), Some(&json!("cheap")));
    // The facade routes "product" to the typed table, which is empty
    assert!(engine.list_all("product").unwrap().is_empty());
}

#[test]
fn documents_only_routes_typed_names_to_documents() {
    let engine = engine_with(TypeRegistry::builtin(), Config::new().documents_only(true));
    let created = engine
        .create(
            "Product",
            fields! { "ProductName" => "Lamp", "ProductDescription" => "Desk", "Price" => "cheap" },
        )
        .unwrap();
    let id = created.id().unwrap();
    assert_eq!(created.as_document().unwrap().object_type, "product");

    let err = engine.create("product", fields! { "ProductName" => "Bare" }).unwrap_err();
    assert!(matches!(err, CoreError::MissingFields { .. }));

    assert_eq!(engine.get_by_id("product", id).unwrap(), created);
    assert_eq!(engine.list("product", [("Price", "cheap")]).unwrap().len(), 1);
    assert!(engine.get_by_id("customer", id).is_err());
    assert_eq!(engine.delete("product", id).unwrap(), 1);
}
