//! Execution statistics and operator trees of profiled statements.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::GraphError;
use crate::view::{Column, Tabular};

/// Kind of statement, as classified by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StmtType {
    /// Not classified.
    #[default]
    Unknown,
    /// Reads only.
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
    /// Writes only.
    WriteOnly,
    /// Changes indexes or constraints.
    SchemaWrite,
}

impl StmtType {
    /// Upper-case label, e.g. `READ_WRITE`.
    pub fn as_str(self) -> &'static str {
        match self {
            StmtType::Unknown => "UNKNOWN",
            StmtType::ReadOnly => "READ_ONLY",
            StmtType::ReadWrite => "READ_WRITE",
            StmtType::WriteOnly => "WRITE_ONLY",
            StmtType::SchemaWrite => "SCHEMA_WRITE",
        }
    }
}

impl TryFrom<i64> for StmtType {
    type Error = GraphError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StmtType::Unknown),
            1 => Ok(StmtType::ReadOnly),
            2 => Ok(StmtType::ReadWrite),
            3 => Ok(StmtType::WriteOnly),
            4 => Ok(StmtType::SchemaWrite),
            _ => Err(GraphError::InvalidEnumValue {
                kind: "statement type",
                value,
            }),
        }
    }
}

impl fmt::Display for StmtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one executed statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// `EXPLAIN`, `PROFILE` or empty for plain execution.
    pub plan: String,
    /// Statement classification.
    #[serde(rename = "queryType")]
    pub statement: StmtType,
    /// Cypher version.
    pub version: String,
    /// Planner that produced the plan.
    pub planner: String,
    /// Runtime that executed the plan.
    pub runtime: String,
    /// Execution time in milliseconds.
    pub time: i64,
    /// Total database hits.
    #[serde(rename = "dbHits")]
    pub db_hits: i64,
    /// Rows produced.
    pub rows: i64,
    /// Memory allocated, in bytes.
    pub memory: i64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} ms, {} rows, {} DB hits)",
            self.plan, self.time, self.rows, self.db_hits
        )
    }
}

/// One operator of a plan tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op {
    /// Operator name, e.g. `NodeByLabelScan`.
    #[serde(rename = "operatorType")]
    pub op: String,
    /// Operator arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Planner row estimate.
    #[serde(rename = "estimatedRows")]
    pub rows_est: i64,
    /// Rows produced.
    pub rows: i64,
    /// Database hits.
    #[serde(rename = "dbHits")]
    pub db_hits: i64,
    /// Memory allocated, in bytes.
    pub memory: i64,
    /// Page cache hits.
    #[serde(rename = "pageCacheHits")]
    pub cache_hits: i64,
    /// Page cache misses.
    #[serde(rename = "pageCacheMisses")]
    pub cache_misses: i64,
    /// Ordering the operator guarantees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Input operators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Op>,
}

fn plural(n: i64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

impl Op {
    /// Operator with no statistics.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            ..Self::default()
        }
    }

    /// Depth-first walk starting with `self`.
    pub fn iter(&self) -> OpIter<'_> {
        OpIter { stack: vec![self] }
    }

    /// Database hits of this operator and all of its inputs.
    pub fn total_db_hits(&self) -> i64 {
        self.iter().map(|op| op.db_hits).sum()
    }

    /// Indented tree, one operator per line, inputs two spaces deeper than
    /// their parent.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.to_string());
        if let Some(details) = &self.details {
            out.push_str(": ");
            out.push_str(details);
        }
        out.push('\n');
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}, {} DB {})",
            self.op,
            self.rows,
            plural(self.rows, "row", "rows"),
            self.db_hits,
            plural(self.db_hits, "hit", "hits"),
        )
    }
}

/// Pre-order iterator returned by [`Op::iter`].
#[derive(Debug)]
pub struct OpIter<'a> {
    stack: Vec<&'a Op>,
}

impl<'a> Iterator for OpIter<'a> {
    type Item = &'a Op;

    fn next(&mut self) -> Option<Self::Item> {
        let op = self.stack.pop()?;
        self.stack.extend(op.children.iter().rev());
        Some(op)
    }
}

impl Tabular for Stats {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::omit_empty("Plan"),
            Column::new("Statement"),
            Column::omit_empty("Version"),
            Column::omit_empty("Planner"),
            Column::omit_empty("Runtime"),
            Column::new("Time"),
            Column::new("DB Hits"),
            Column::new("Rows"),
            Column::new("Memory (Bytes)"),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.plan.clone(),
            self.statement.to_string(),
            self.version.clone(),
            self.planner.clone(),
            self.runtime.clone(),
            self.time.to_string(),
            self.db_hits.to_string(),
            self.rows.to_string(),
            self.memory.to_string(),
        ]
    }
}

impl Tabular for Op {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("Operator"),
            Column::omit_empty("Details"),
            Column::new("Estimated Rows"),
            Column::new("Rows"),
            Column::new("DB Hits"),
            Column::new("Memory (Bytes)"),
            Column::new("Cache Hits"),
            Column::new("Cache Misses"),
            Column::omit_empty("Ordered by"),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.op.clone(),
            self.details.clone().unwrap_or_default(),
            self.rows_est.to_string(),
            self.rows.to_string(),
            self.db_hits.to_string(),
            self.memory.to_string(),
            self.cache_hits.to_string(),
            self.cache_misses.to_string(),
            self.order.clone().unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::table;

    fn op(name: &str, rows: i64, db_hits: i64, children: Vec<Op>) -> Op {
        Op {
            rows,
            db_hits,
            children,
            ..Op::new(name)
        }
    }

    #[test]
    fn stmt_type_maps_every_ordinal() {
        let labels: Vec<_> = (0..5)
            .map(|i| StmtType::try_from(i).unwrap().as_str())
            .collect();
        assert_eq!(
            labels,
            ["UNKNOWN", "READ_ONLY", "READ_WRITE", "WRITE_ONLY", "SCHEMA_WRITE"]
        );
        assert_eq!(StmtType::try_from(2).unwrap().to_string(), "READ_WRITE");
    }

    #[test]
    fn stmt_type_rejects_out_of_range() {
        for value in [-1, 5, i64::MAX] {
            match StmtType::try_from(value) {
                Err(GraphError::InvalidEnumValue { kind, value: got }) => {
                    assert_eq!(kind, "statement type");
                    assert_eq!(got, value);
                }
                other => panic!("unexpected result for {value}: {other:?}"),
            }
        }
    }

    #[test]
    fn stmt_type_serializes_label() {
        let json = serde_json::to_string(&StmtType::ReadWrite).unwrap();
        assert_eq!(json, "\"READ_WRITE\"");
        let back: StmtType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StmtType::ReadWrite);
    }

    #[test]
    fn stats_summary() {
        let stats = Stats {
            plan: "PROFILE".into(),
            time: 12,
            rows: 3,
            db_hits: 40,
            ..Stats::default()
        };
        assert_eq!(stats.to_string(), "PROFILE (12 ms, 3 rows, 40 DB hits)");
    }

    #[test]
    fn op_pluralizes() {
        let one = op("Filter", 1, 1, vec![]);
        assert_eq!(one.to_string(), "Filter (1 row, 1 DB hit)");
        let none = op("Filter", 0, 2, vec![]);
        assert_eq!(none.to_string(), "Filter (0 rows, 2 DB hits)");
        let many = op("Filter", 2, 0, vec![]);
        assert_eq!(many.to_string(), "Filter (2 rows, 0 DB hits)");
    }

    #[test]
    fn walks_tree_in_pre_order() {
        let tree = op(
            "ProduceResults",
            2,
            0,
            vec![op(
                "Filter",
                2,
                4,
                vec![op("NodeByLabelScan", 4, 5, vec![]), op("Argument", 1, 0, vec![])],
            )],
        );
        let names: Vec<_> = tree.iter().map(|o| o.op.as_str()).collect();
        assert_eq!(names, ["ProduceResults", "Filter", "NodeByLabelScan", "Argument"]);
        assert_eq!(tree.total_db_hits(), 9);
        assert_eq!(
            tree.render_tree(),
            "ProduceResults (2 rows, 0 DB hits)\n  \
             Filter (2 rows, 4 DB hits)\n    \
             NodeByLabelScan (4 rows, 5 DB hits)\n    \
             Argument (1 row, 0 DB hits)\n"
        );
    }

    #[test]
    fn op_serializes_server_field_names() {
        let mut root = op("Filter", 1, 3, vec![]);
        root.details = Some("n.age > 30".into());
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["operatorType"], "Filter");
        assert_eq!(json["dbHits"], 3);
        assert_eq!(json["details"], "n.age > 30");
        assert!(json.get("order").is_none());
        assert!(json.get("children").is_none());
    }

    #[test]
    fn op_table_hides_empty_details() {
        let mut scan = op("AllNodesScan", 5, 6, vec![]);
        scan.rows_est = 4;
        scan.cache_hits = 7;
        scan.cache_misses = 1;
        let (headers, rows) = table(&[scan]);
        assert_eq!(
            headers,
            [
                "Operator",
                "Estimated Rows",
                "Rows",
                "DB Hits",
                "Memory (Bytes)",
                "Cache Hits",
                "Cache Misses",
            ]
        );
        assert_eq!(rows[0], ["AllNodesScan", "4", "5", "6", "0", "7", "1"]);
    }
}
