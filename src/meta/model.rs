//! Schema model produced by the metadata engine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::view::{Column, Tabular};

/// A function or procedure with its signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Func {
    /// Fully qualified name.
    pub name: String,
    /// Signature as reported by the server.
    pub signature: String,
    /// Return items, when they are described separately.
    #[serde(default, rename = "returnItems", skip_serializing_if = "Vec::is_empty")]
    pub return_items: Vec<Func>,
}

impl Func {
    /// Function without separately described return items.
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            return_items: Vec::new(),
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Metamodel of one kind of node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Number of nodes; unknown when the schema was enumerated from the catalog.
    pub count: Option<i64>,
    /// Outgoing and incoming relationship types, keyed by type.
    #[serde(default)]
    pub relationships: BTreeMap<String, NodeRelInfo>,
    /// Entry kind reported by the schema summary (`node`); unknown when
    /// enumerated from the catalog.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Properties keyed by name.
    #[serde(default)]
    pub properties: BTreeMap<String, NodeProperty>,
    /// Labels identifying this kind of node.
    pub labels: Vec<String>,
}

impl Node {
    /// Node known only by its labels.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.labels.join(":"))
    }
}

/// Metamodel of one relationship type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Number of relationships; unknown when enumerated from the catalog.
    pub count: Option<i64>,
    /// Relationship type.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Properties keyed by name.
    #[serde(default)]
    pub properties: BTreeMap<String, RelProperty>,
}

impl Relationship {
    /// Relationship known only by its type.
    pub fn with_type(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.rel_type)
    }
}

/// Direction of a relationship as seen from a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The node is the start of the relationship.
    #[default]
    Out,
    /// The node is the end of the relationship.
    In,
}

impl Direction {
    /// Lowercase name as used by the server.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
        }
    }
}

/// A relationship type attached to one kind of node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRelInfo {
    /// Number of relationships.
    pub count: i64,
    /// Properties keyed by name.
    #[serde(default)]
    pub properties: BTreeMap<String, RelProperty>,
    /// Direction relative to the node.
    pub direction: Direction,
    /// Labels of the nodes on the other side.
    pub labels: Vec<String>,
}

/// A single property of a node kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProperty {
    /// Covered by an index.
    pub indexed: bool,
    /// Covered by a uniqueness constraint.
    pub unique: bool,
    /// Covered by an existence constraint.
    pub existence: bool,
    /// Value type name.
    #[serde(rename = "type")]
    pub ty: String,
}

/// A single property of a relationship type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelProperty {
    /// Holds list values.
    pub array: bool,
    /// Covered by an index.
    pub indexed: bool,
    /// Covered by an existence constraint.
    pub existence: bool,
    /// Value type name.
    #[serde(rename = "type")]
    pub ty: String,
}

/// Labels, relationship types, properties, functions and procedures of one
/// database.
///
/// Nodes are ordered by their label sequence, relationships by type, and
/// property keys are sorted and unique. Functions and procedures keep the
/// case-insensitive name order the server returned them in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Node kinds.
    pub nodes: Vec<Node>,
    /// Relationship types.
    pub rels: Vec<Relationship>,
    /// Functions.
    pub funcs: Vec<Func>,
    /// Procedures.
    pub procs: Vec<Func>,
    /// Property keys.
    pub props: Vec<String>,
}

impl Metadata {
    /// Whether nothing at all is known.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.rels.is_empty()
            && self.funcs.is_empty()
            && self.procs.is_empty()
            && self.props.is_empty()
    }

    /// Looks up a node kind by a single label.
    pub fn node(&self, label: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.labels.len() == 1 && n.labels[0] == label)
    }

    /// Looks up a relationship type.
    pub fn rel(&self, rel_type: &str) -> Option<&Relationship> {
        self.rels
            .binary_search_by(|r| r.rel_type.as_str().cmp(rel_type))
            .ok()
            .map(|idx| &self.rels[idx])
    }

    /// Flattened names for completion and listings.
    pub fn schema(&self) -> Schema {
        let labels: BTreeSet<&str> = self
            .nodes
            .iter()
            .flat_map(|n| n.labels.iter().map(String::as_str))
            .collect();
        Schema {
            labels: labels.into_iter().map(str::to_owned).collect(),
            rel_types: self.rels.iter().map(|r| r.rel_type.clone()).collect(),
            prop_keys: self.props.clone(),
            funcs: self.funcs.clone(),
            procs: self.procs.clone(),
        }
    }
}

/// Name lists derived from [`Metadata`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Distinct node labels, sorted.
    pub labels: Vec<String>,
    /// Relationship types, sorted.
    #[serde(rename = "relTypes")]
    pub rel_types: Vec<String>,
    /// Property keys, sorted.
    #[serde(rename = "propKeys")]
    pub prop_keys: Vec<String>,
    /// Functions.
    pub funcs: Vec<Func>,
    /// Procedures.
    pub procs: Vec<Func>,
}

fn count_cell(count: Option<i64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_default()
}

fn names<V>(map: &BTreeMap<String, V>) -> String {
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl Tabular for Func {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[Column::new("Name"), Column::new("Signature")];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), self.signature.clone()]
    }
}

impl Tabular for Node {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("Labels"),
            Column::omit_empty("Type"),
            Column::omit_empty("Count"),
            Column::omit_empty("Properties"),
            Column::omit_empty("Relationships"),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.to_string(),
            self.kind.clone().unwrap_or_default(),
            count_cell(self.count),
            names(&self.properties),
            names(&self.relationships),
        ]
    }
}

impl Tabular for Relationship {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("Type"),
            Column::omit_empty("Count"),
            Column::omit_empty("Properties"),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.to_string(),
            count_cell(self.count),
            names(&self.properties),
        ]
    }
}

impl Tabular for NodeProperty {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("Indexed"),
            Column::new("Unique"),
            Column::new("Existence"),
            Column::new("Type"),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.indexed.to_string(),
            self.unique.to_string(),
            self.existence.to_string(),
            self.ty.clone(),
        ]
    }
}

impl Tabular for RelProperty {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("Array"),
            Column::new("Indexed"),
            Column::new("Existence"),
            Column::new("Type"),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.array.to_string(),
            self.indexed.to_string(),
            self.existence.to_string(),
            self.ty.clone(),
        ]
    }
}
