#![forbid(unsafe_code)]

//! Schema introspection.
//!
//! A fetch lists functions and procedures first. If the procedure catalog
//! contains `apoc.meta.schema`, one call returns the whole schema with
//! counts and per-property descriptors. Otherwise labels, relationship types
//! and property keys are enumerated separately and only names are known.

mod decode;
mod model;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{Connection, SYSTEM_DB};
use crate::query::{Params, Record, Value};
use crate::types::{GraphError, Result};
use decode::{decode_meta_schema, MetaEntry, NODE_KIND};

pub use model::{
    Direction, Func, Metadata, Node, NodeProperty, NodeRelInfo, RelProperty, Relationship, Schema,
};

/// Lists functions, ordered case-insensitively by name.
pub const FUNCTIONS: &str =
    "CALL dbms.functions() YIELD name, signature RETURN name, signature ORDER BY toLower(name)";

/// Lists procedures, ordered case-insensitively by name.
pub const PROCEDURES: &str =
    "CALL dbms.procedures() YIELD name, signature RETURN name, signature ORDER BY toLower(name)";

/// Procedure whose presence enables [`Strategy::MetaSchema`].
pub const META_SCHEMA_PROCEDURE: &str = "apoc.meta.schema";

/// Single-row schema summary.
pub const META_SCHEMA: &str = "CALL apoc.meta.schema";

/// Lists node labels.
pub const LABELS: &str = "CALL db.labels() YIELD label RETURN label ORDER BY label";

/// Lists relationship types.
pub const RELATIONSHIP_TYPES: &str = "CALL db.relationshipTypes() YIELD relationshipType \
     RETURN relationshipType ORDER BY relationshipType";

/// Lists property keys.
pub const PROPERTY_KEYS: &str =
    "CALL db.propertyKeys() YIELD propertyKey RETURN propertyKey ORDER BY propertyKey";

/// How the schema was gathered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// One `apoc.meta.schema` call with counts and property descriptors.
    MetaSchema,
    /// Separate label, relationship type and property key listings.
    Catalog,
}

impl Strategy {
    /// Short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::MetaSchema => "metaSchema",
            Strategy::Catalog => "catalog",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the strategy for a procedure list sorted case-insensitively by
/// name, as returned by [`PROCEDURES`].
pub fn detect_strategy(procs: &[Func]) -> Strategy {
    let start = procs
        .partition_point(|p| p.name.to_lowercase().as_str() < META_SCHEMA_PROCEDURE);
    let present = procs[start..]
        .iter()
        .take_while(|p| p.name.to_lowercase() == META_SCHEMA_PROCEDURE)
        .any(|p| p.name == META_SCHEMA_PROCEDURE);
    if present {
        Strategy::MetaSchema
    } else {
        Strategy::Catalog
    }
}

/// Result of [`fetch`].
#[derive(Debug, Default)]
pub struct Fetched {
    /// The gathered schema.
    pub metadata: Metadata,
    /// Strategy used; `None` on the system database, which is not inspected.
    pub strategy: Option<Strategy>,
    /// Failures that left parts of the schema empty without failing the fetch.
    pub warnings: Vec<GraphError>,
}

/// Gathers the schema of the connection's active database.
///
/// Errors from listing functions or procedures, from the schema summary
/// call, and from the label listing fail the fetch. Failed relationship type
/// and property key listings leave those parts empty and are reported in
/// [`Fetched::warnings`].
pub fn fetch(conn: &Connection) -> Result<Fetched> {
    if conn.database() == SYSTEM_DB {
        debug!("system database has no schema");
        return Ok(Fetched::default());
    }

    let funcs = list_funcs(conn, FUNCTIONS)?;
    let procs = list_funcs(conn, PROCEDURES)?;
    let strategy = detect_strategy(&procs);
    debug!(
        database = conn.database(),
        strategy = %strategy,
        funcs = funcs.len(),
        procs = procs.len(),
        "fetching schema"
    );

    let mut fetched = match strategy {
        Strategy::MetaSchema => fetch_meta_schema(conn)?,
        Strategy::Catalog => fetch_catalog(conn)?,
    };
    fetched.metadata.funcs = funcs;
    fetched.metadata.procs = procs;
    fetched.strategy = Some(strategy);

    info!(
        database = conn.database(),
        strategy = %strategy,
        nodes = fetched.metadata.nodes.len(),
        rels = fetched.metadata.rels.len(),
        props = fetched.metadata.props.len(),
        warnings = fetched.warnings.len(),
        "schema fetched"
    );
    Ok(fetched)
}

/// Like [`fetch`], logging and discarding warnings.
pub fn fetch_metadata(conn: &Connection) -> Result<Metadata> {
    let fetched = fetch(conn)?;
    for warning in &fetched.warnings {
        warn!(error = %warning, "schema incomplete");
    }
    Ok(fetched.metadata)
}

fn list_funcs(conn: &Connection, query: &str) -> Result<Vec<Func>> {
    conn.query(query, &Params::new())?
        .into_iter()
        .map(|row| {
            Ok(Func::new(
                string_field(&row, "name")?,
                string_field(&row, "signature")?,
            ))
        })
        .collect()
}

fn string_field(row: &Record, key: &str) -> Result<String> {
    match row.value(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(GraphError::UnexpectedValue {
            path: key.to_owned(),
            expected: "string",
            found: other.map_or("missing", Value::kind),
        }),
    }
}

fn fetch_meta_schema(conn: &Connection) -> Result<Fetched> {
    let payload = conn
        .query_single(META_SCHEMA, &Params::new())?
        .into_value_at(0)?;
    let entries = decode_meta_schema(&payload).map_err(GraphError::Decode)?;

    let mut metadata = Metadata::default();
    let mut props = BTreeSet::new();
    for entry in entries {
        match entry {
            MetaEntry::Node {
                label,
                count,
                properties,
                relationships,
            } => {
                props.extend(properties.keys().cloned());
                metadata.nodes.push(Node {
                    count: Some(count),
                    relationships,
                    kind: Some(NODE_KIND.to_owned()),
                    properties,
                    labels: vec![label],
                });
            }
            MetaEntry::Relationship {
                rel_type,
                count,
                properties,
            } => {
                props.extend(properties.keys().cloned());
                metadata.rels.push(Relationship {
                    count: Some(count),
                    rel_type,
                    properties,
                });
            }
        }
    }
    metadata.props = props.into_iter().collect();
    metadata.nodes.sort_by(|a, b| a.labels.cmp(&b.labels));
    metadata.rels.sort_by(|a, b| a.rel_type.cmp(&b.rel_type));

    Ok(Fetched {
        metadata,
        ..Fetched::default()
    })
}

fn fetch_catalog(conn: &Connection) -> Result<Fetched> {
    let mut fetched = Fetched::default();
    fetched.metadata.nodes = list_names(conn, LABELS, "label")?
        .into_iter()
        .map(|label| Node::with_labels([label]))
        .collect();

    match list_names(conn, RELATIONSHIP_TYPES, "relationshipType") {
        Ok(types) => {
            fetched.metadata.rels = types.into_iter().map(Relationship::with_type).collect();
        }
        Err(err) => fetched.warnings.push(err),
    }
    match list_names(conn, PROPERTY_KEYS, "propertyKey") {
        Ok(keys) => fetched.metadata.props = keys,
        Err(err) => fetched.warnings.push(err),
    }
    Ok(fetched)
}

fn list_names(conn: &Connection, query: &str, column: &str) -> Result<Vec<String>> {
    conn.query(query, &Params::new())?
        .iter()
        .map(|row| string_field(row, column))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConnectOptions;
    use crate::driver::{MemoryConnector, MemoryDriver};
    use crate::types::DriverError;

    fn procs(names: &[&str]) -> Vec<Func> {
        names.iter().map(|n| Func::new(*n, format!("{n}()"))).collect()
    }

    fn connect(driver: &MemoryDriver, database: &str) -> Connection {
        let connector = MemoryConnector::new(driver.clone());
        let opts = ConnectOptions::default().database(database);
        Connection::open(&connector, &opts).unwrap()
    }

    fn names(column: &str, values: &[&str]) -> Vec<Record> {
        values
            .iter()
            .map(|v| Record::from_pairs([(column, *v)]))
            .collect()
    }

    #[test]
    fn detects_meta_schema_by_search() {
        let with = procs(&["apoc.math.round", "apoc.meta.schema", "zzz.other"]);
        assert_eq!(detect_strategy(&with), Strategy::MetaSchema);
        let without = procs(&["apoc.math.round", "zzz.other"]);
        assert_eq!(detect_strategy(&without), Strategy::Catalog);
        assert_eq!(detect_strategy(&[]), Strategy::Catalog);
    }

    #[test]
    fn detection_follows_case_insensitive_order() {
        let mixed = procs(&["apoc.a", "apoc.meta.schema", "B.x", "c"]);
        assert_eq!(detect_strategy(&mixed), Strategy::MetaSchema);
        let shadowed = procs(&["APOC.META.SCHEMA", "apoc.meta.schema", "Db.labels"]);
        assert_eq!(detect_strategy(&shadowed), Strategy::MetaSchema);
        let other_case = procs(&["Apoc.Meta.Schema", "B.x"]);
        assert_eq!(detect_strategy(&other_case), Strategy::Catalog);
    }

    #[test]
    fn system_database_is_not_inspected() {
        let driver = MemoryDriver::new();
        driver.fail(FUNCTIONS, DriverError::new("should not run"));
        let conn = connect(&driver, SYSTEM_DB);
        let fetched = fetch(&conn).unwrap();
        assert!(fetched.metadata.is_empty());
        assert!(fetched.strategy.is_none());
        assert!(!driver.queries().iter().any(|q| q == FUNCTIONS));
    }

    #[test]
    fn function_listing_failure_aborts() {
        let driver = MemoryDriver::new();
        driver.fail(PROCEDURES, DriverError::new("permission denied"));
        let conn = connect(&driver, "neo4j");
        assert!(matches!(fetch(&conn), Err(GraphError::Driver(_))));
    }

    #[test]
    fn catalog_collects_warnings() {
        let driver = MemoryDriver::new();
        driver
            .respond(LABELS, names("label", &["Movie", "Person"]))
            .fail(RELATIONSHIP_TYPES, DriverError::new("timeout"))
            .respond(PROPERTY_KEYS, names("propertyKey", &["name", "title"]));
        let conn = connect(&driver, "neo4j");

        let fetched = fetch(&conn).unwrap();
        assert_eq!(fetched.strategy, Some(Strategy::Catalog));
        assert_eq!(fetched.warnings.len(), 1);
        assert_eq!(fetched.metadata.nodes.len(), 2);
        assert_eq!(fetched.metadata.nodes[1].labels, vec!["Person"]);
        assert!(fetched.metadata.nodes[1].count.is_none());
        assert!(fetched.metadata.rels.is_empty());
        assert_eq!(fetched.metadata.props, vec!["name", "title"]);
    }

    #[test]
    fn catalog_label_failure_is_fatal() {
        let driver = MemoryDriver::new();
        driver.fail(LABELS, DriverError::new("timeout"));
        let conn = connect(&driver, "neo4j");
        assert!(fetch(&conn).is_err());
    }

    #[test]
    fn malformed_function_row_is_reported() {
        let driver = MemoryDriver::new();
        driver.respond(FUNCTIONS, vec![Record::from_pairs([("name", 1i64)])]);
        let conn = connect(&driver, "neo4j");
        match fetch(&conn) {
            Err(GraphError::UnexpectedValue { path, found, .. }) => {
                assert_eq!(path, "name");
                assert_eq!(found, "integer");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
