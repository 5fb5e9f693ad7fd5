mod common;

use common::connect;
use graphconn::db::SYSTEM_DB;
use graphconn::driver::MemoryDriver;
use graphconn::meta::{
    self, Direction, Func, NodeProperty, RelProperty, Strategy, FUNCTIONS, LABELS, META_SCHEMA,
    PROCEDURES, PROPERTY_KEYS, RELATIONSHIP_TYPES,
};
use graphconn::{DriverError, GraphError, Record, Value};
use serde_json::json;

fn catalog(names: &[&str]) -> Vec<Record> {
    names
        .iter()
        .map(|name| Record::from_pairs([("name", *name), ("signature", "()")]))
        .collect()
}

fn column(key: &str, values: &[&str]) -> Vec<Record> {
    values
        .iter()
        .map(|value| Record::from_pairs([(key, *value)]))
        .collect()
}

fn with_meta_schema(driver: &MemoryDriver, payload: serde_json::Value) {
    driver
        .respond(FUNCTIONS, catalog(&["apoc.coll.sum", "toLower"]))
        .respond(
            PROCEDURES,
            catalog(&["apoc.math.round", "apoc.meta.schema", "zzz.other"]),
        )
        .respond(
            META_SCHEMA,
            vec![Record::from_pairs([("value", Value::from(payload))])],
        );
}

#[test]
fn system_database_yields_empty_metadata() {
    let driver = MemoryDriver::new();
    with_meta_schema(&driver, json!({"broken": 1}));
    let conn = connect(&driver, SYSTEM_DB);

    let metadata = meta::fetch_metadata(&conn).unwrap();
    assert!(metadata.is_empty());
}

#[test]
fn meta_schema_payload_is_normalized() {
    let driver = MemoryDriver::new();
    with_meta_schema(
        &driver,
        json!({
            "Person": {
                "type": "node",
                "count": 3,
                "properties": {
                    "id": {"indexed": true, "unique": true, "existence": true, "type": "String"}
                }
            },
            "KNOWS": {
                "type": "relationship",
                "count": 5,
                "properties": {
                    "since": {
                        "array": false,
                        "indexed": false,
                        "existence": false,
                        "type": "Integer"
                    }
                }
            }
        }),
    );
    let conn = connect(&driver, "neo4j");

    let fetched = meta::fetch(&conn).unwrap();
    assert_eq!(fetched.strategy, Some(Strategy::MetaSchema));
    assert!(fetched.warnings.is_empty());

    let metadata = fetched.metadata;
    assert_eq!(metadata.nodes.len(), 1);
    let person = &metadata.nodes[0];
    assert_eq!(person.labels, vec!["Person"]);
    assert_eq!(person.count, Some(3));
    assert_eq!(person.kind.as_deref(), Some("node"));
    assert_eq!(
        person.properties["id"],
        NodeProperty {
            indexed: true,
            unique: true,
            existence: true,
            ty: "String".into(),
        }
    );

    assert_eq!(metadata.rels.len(), 1);
    let knows = &metadata.rels[0];
    assert_eq!(knows.rel_type, "KNOWS");
    assert_eq!(knows.count, Some(5));
    assert_eq!(
        knows.properties["since"],
        RelProperty {
            array: false,
            indexed: false,
            existence: false,
            ty: "Integer".into(),
        }
    );

    assert_eq!(metadata.props, vec!["id", "since"]);
    assert_eq!(
        metadata.funcs,
        vec![Func::new("apoc.coll.sum", "()"), Func::new("toLower", "()")]
    );
    assert_eq!(metadata.procs.len(), 3);
}

#[test]
fn meta_schema_sorts_nodes_and_relationships() {
    let driver = MemoryDriver::new();
    with_meta_schema(
        &driver,
        json!({
            "Movie": {"type": "node", "count": 1, "properties": {"title": {
                "indexed": false, "unique": false, "existence": false, "type": "String"}}},
            "Actor": {"type": "node", "count": 2, "properties": {"name": {
                "indexed": false, "unique": false, "existence": false, "type": "String"}},
                "relationships": {"ACTED_IN": {
                    "count": 2, "direction": "out", "labels": ["Movie"], "properties": {}}}},
            "DIRECTED": {"type": "relationship", "count": 1, "properties": {}},
            "ACTED_IN": {"type": "relationship", "count": 2, "properties": {"roles": {
                "array": true, "indexed": false, "existence": false, "type": "LIST"}}}
        }),
    );
    let conn = connect(&driver, "neo4j");

    let metadata = meta::fetch_metadata(&conn).unwrap();
    let labels: Vec<_> = metadata.nodes.iter().map(|n| n.to_string()).collect();
    assert_eq!(labels, [":Actor", ":Movie"]);
    let types: Vec<_> = metadata.rels.iter().map(|r| r.rel_type.as_str()).collect();
    assert_eq!(types, ["ACTED_IN", "DIRECTED"]);
    assert_eq!(metadata.props, vec!["name", "roles", "title"]);

    let acted_in = &metadata.nodes[0].relationships["ACTED_IN"];
    assert_eq!(acted_in.direction, Direction::Out);
    assert_eq!(acted_in.labels, vec!["Movie"]);
    assert!(metadata.nodes[1].relationships.is_empty());

    let schema = metadata.schema();
    assert_eq!(schema.labels, vec!["Actor", "Movie"]);
    assert_eq!(schema.rel_types, vec!["ACTED_IN", "DIRECTED"]);
}

#[test]
fn malformed_payload_fails_whole_fetch() {
    let driver = MemoryDriver::new();
    with_meta_schema(
        &driver,
        json!({
            "Person": {"type": "node", "count": "three", "properties": {}},
            "KNOWS": {"type": "relationship", "count": 5}
        }),
    );
    let conn = connect(&driver, "neo4j");

    match meta::fetch(&conn) {
        Err(GraphError::Decode(errors)) => {
            assert_eq!(errors.len(), 2);
            let rendered = errors.to_string();
            assert!(rendered.contains("Person.count: expected integer, found string"));
            assert!(rendered.contains("KNOWS.properties: expected map, found missing"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn catalog_is_used_without_meta_schema() {
    let driver = MemoryDriver::new();
    driver
        .respond(FUNCTIONS, catalog(&["toLower"]))
        .respond(PROCEDURES, catalog(&["apoc.math.round", "zzz.other"]))
        .respond(LABELS, column("label", &["Movie", "Person"]))
        .respond(
            RELATIONSHIP_TYPES,
            column("relationshipType", &["ACTED_IN", "DIRECTED"]),
        )
        .respond(PROPERTY_KEYS, column("propertyKey", &["name", "title"]));
    let conn = connect(&driver, "neo4j");

    let fetched = meta::fetch(&conn).unwrap();
    assert_eq!(fetched.strategy, Some(Strategy::Catalog));
    assert!(fetched.warnings.is_empty());
    assert!(!driver.queries().iter().any(|q| q == META_SCHEMA));

    let metadata = fetched.metadata;
    assert_eq!(metadata.nodes.len(), 2);
    assert!(metadata
        .nodes
        .iter()
        .all(|n| n.count.is_none() && n.kind.is_none() && n.properties.is_empty()));
    assert_eq!(metadata.rels[1].rel_type, "DIRECTED");
    assert_eq!(metadata.props, vec!["name", "title"]);
}

#[test]
fn catalog_degrades_on_later_listing_failures() {
    let driver = MemoryDriver::new();
    driver
        .respond(LABELS, column("label", &["Movie"]))
        .fail(RELATIONSHIP_TYPES, DriverError::new("timeout"))
        .fail(PROPERTY_KEYS, DriverError::new("timeout"));
    let conn = connect(&driver, "neo4j");

    let fetched = meta::fetch(&conn).unwrap();
    assert_eq!(fetched.warnings.len(), 2);
    assert_eq!(fetched.metadata.nodes.len(), 1);
    assert!(fetched.metadata.rels.is_empty());
    assert!(fetched.metadata.props.is_empty());

    let metadata = meta::fetch_metadata(&conn).unwrap();
    assert_eq!(metadata.nodes.len(), 1);
}
