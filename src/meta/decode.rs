//! Decoding of the single-row schema summary returned by `apoc.meta.schema`.
//!
//! The payload is a map keyed by label or relationship type. Each entry is
//! decoded into a [`MetaEntry`]; every shape problem is recorded and reported
//! together, and nothing is returned if any entry is malformed.

use std::collections::BTreeMap;

use super::model::{Direction, NodeProperty, NodeRelInfo, RelProperty};
use crate::query::Value;
use crate::types::DecodeErrors;

/// Decoded payload entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MetaEntry {
    Node {
        label: String,
        count: i64,
        properties: BTreeMap<String, NodeProperty>,
        relationships: BTreeMap<String, NodeRelInfo>,
    },
    Relationship {
        rel_type: String,
        count: i64,
        properties: BTreeMap<String, RelProperty>,
    },
}

pub(crate) const NODE_KIND: &str = "node";

type Fields = BTreeMap<String, Value>;

#[derive(Default)]
struct Decoder {
    errors: DecodeErrors,
}

impl Decoder {
    fn issue(&mut self, path: &str, expected: &'static str, found: Option<&Value>) {
        self.errors.push(path, expected, found.map_or("missing", Value::kind));
    }

    fn map<'v>(&mut self, path: &str, value: Option<&'v Value>) -> Option<&'v Fields> {
        match value {
            Some(Value::Map(map)) => Some(map),
            other => {
                self.issue(path, "map", other);
                None
            }
        }
    }

    fn bool(&mut self, fields: &Fields, path: &str, key: &str) -> bool {
        match fields.get(key) {
            Some(Value::Bool(b)) => *b,
            other => {
                self.issue(&format!("{path}.{key}"), "boolean", other);
                false
            }
        }
    }

    fn int(&mut self, fields: &Fields, path: &str, key: &str) -> i64 {
        match fields.get(key) {
            Some(Value::Int(i)) => *i,
            other => {
                self.issue(&format!("{path}.{key}"), "integer", other);
                0
            }
        }
    }

    fn string(&mut self, fields: &Fields, path: &str, key: &str) -> String {
        match fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            other => {
                self.issue(&format!("{path}.{key}"), "string", other);
                String::new()
            }
        }
    }

    fn strings(&mut self, fields: &Fields, path: &str, key: &str) -> Vec<String> {
        let path = format!("{path}.{key}");
        let Some(items) = fields.get(key) else {
            self.issue(&path, "list", None);
            return Vec::new();
        };
        let Some(items) = items.as_list() else {
            self.issue(&path, "list", Some(items));
            return Vec::new();
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.clone()),
                other => self.issue(&format!("{path}[{i}]"), "string", Some(other)),
            }
        }
        out
    }

    fn node_property(&mut self, path: &str, value: &Value) -> NodeProperty {
        let Some(fields) = self.map(path, Some(value)) else {
            return NodeProperty::default();
        };
        NodeProperty {
            indexed: self.bool(fields, path, "indexed"),
            unique: self.bool(fields, path, "unique"),
            existence: self.bool(fields, path, "existence"),
            ty: self.string(fields, path, "type"),
        }
    }

    fn rel_property(&mut self, path: &str, value: &Value) -> RelProperty {
        let Some(fields) = self.map(path, Some(value)) else {
            return RelProperty::default();
        };
        RelProperty {
            array: self.bool(fields, path, "array"),
            indexed: self.bool(fields, path, "indexed"),
            existence: self.bool(fields, path, "existence"),
            ty: self.string(fields, path, "type"),
        }
    }

    fn properties<T>(
        &mut self,
        fields: &Fields,
        path: &str,
        decode: fn(&mut Self, &str, &Value) -> T,
    ) -> BTreeMap<String, T> {
        let path = format!("{path}.properties");
        let Some(props) = self.map(&path, fields.get("properties")) else {
            return BTreeMap::new();
        };
        props
            .iter()
            .map(|(name, value)| {
                let prop = decode(self, &format!("{path}.{name}"), value);
                (name.clone(), prop)
            })
            .collect()
    }

    fn direction(&mut self, fields: &Fields, path: &str) -> Direction {
        let path = format!("{path}.direction");
        match fields.get("direction") {
            Some(Value::String(s)) if s == "out" => Direction::Out,
            Some(Value::String(s)) if s == "in" => Direction::In,
            Some(Value::String(_)) => {
                self.errors.push(path, "direction", "unknown string");
                Direction::Out
            }
            other => {
                self.issue(&path, "string", other);
                Direction::Out
            }
        }
    }

    fn relationships(&mut self, fields: &Fields, path: &str) -> BTreeMap<String, NodeRelInfo> {
        let path = format!("{path}.relationships");
        let rels = match fields.get("relationships") {
            None | Some(Value::Null) => return BTreeMap::new(),
            Some(value) => match self.map(&path, Some(value)) {
                Some(rels) => rels,
                None => return BTreeMap::new(),
            },
        };
        let mut out = BTreeMap::new();
        for (rel_type, value) in rels {
            let rel_path = format!("{path}.{rel_type}");
            let Some(info) = self.map(&rel_path, Some(value)) else {
                continue;
            };
            let rel = NodeRelInfo {
                count: self.int(info, &rel_path, "count"),
                properties: self.properties(info, &rel_path, Self::rel_property),
                direction: self.direction(info, &rel_path),
                labels: self.strings(info, &rel_path, "labels"),
            };
            out.insert(rel_type.clone(), rel);
        }
        out
    }

    fn entry(&mut self, key: &str, value: &Value) -> Option<MetaEntry> {
        let fields = self.map(key, Some(value))?;
        let kind = self.string(fields, key, "type");
        let count = self.int(fields, key, "count");
        let entry = if kind == NODE_KIND {
            MetaEntry::Node {
                label: key.to_owned(),
                count,
                properties: self.properties(fields, key, Self::node_property),
                relationships: self.relationships(fields, key),
            }
        } else {
            MetaEntry::Relationship {
                rel_type: key.to_owned(),
                count,
                properties: self.properties(fields, key, Self::rel_property),
            }
        };
        Some(entry)
    }
}

/// Decodes the first column of the `apoc.meta.schema` row.
pub(crate) fn decode_meta_schema(payload: &Value) -> Result<Vec<MetaEntry>, DecodeErrors> {
    let mut decoder = Decoder::default();
    let Some(entries) = decoder.map("value", Some(payload)) else {
        return Err(decoder.errors);
    };
    let decoded: Vec<MetaEntry> = entries
        .iter()
        .filter_map(|(key, value)| decoder.entry(key, value))
        .collect();
    if decoder.errors.is_empty() {
        Ok(decoded)
    } else {
        Err(decoder.errors)
    }
}
