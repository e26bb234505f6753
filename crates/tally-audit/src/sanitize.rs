//! Snapshot sanitization.
//!
//! Turns a [`SnapshotValue`] into plain JSON: sensitive keys are redacted at
//! any depth, documents are flattened, dates become RFC 3339 strings and a
//! document met again on its own visit path becomes `"[Circular]"`. Nesting
//! beyond [`MAX_DEPTH`] containers is replaced by `"[MaxDepth]"`.

use std::collections::{BTreeMap, HashSet};

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::snapshot::SnapshotValue;

pub const REDACTED: &str = "[REDACTED]";
pub const CIRCULAR: &str = "[Circular]";
pub const TOO_DEEP: &str = "[MaxDepth]";

/// Containers (arrays, maps, documents) kept on any one path.
pub const MAX_DEPTH: usize = 64;

/// Case-insensitive set of key names whose values are never stored.
#[derive(Debug, Clone)]
pub struct SensitiveKeys(HashSet<String>);

impl SensitiveKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            keys.into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        )
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(&key.to_lowercase())
    }
}

/// Sanitize a snapshot into JSON.
pub fn sanitize(value: &SnapshotValue, sensitive: &SensitiveKeys) -> Value {
    Sanitizer {
        sensitive,
        path: Vec::new(),
        depth: 0,
    }
    .visit(value)
}

/// Sanitize an already-plain JSON value (e.g. metadata).
pub fn sanitize_json(value: Value, sensitive: &SensitiveKeys) -> Value {
    sanitize(&SnapshotValue::from(value), sensitive)
}

struct Sanitizer<'a> {
    sensitive: &'a SensitiveKeys,
    /// Addresses of the documents currently being visited.
    path: Vec<usize>,
    depth: usize,
}

impl Sanitizer<'_> {
    fn visit(&mut self, value: &SnapshotValue) -> Value {
        match value {
            SnapshotValue::Null => Value::Null,
            SnapshotValue::Bool(b) => Value::Bool(*b),
            SnapshotValue::Number(n) => Value::Number(n.clone()),
            SnapshotValue::String(s) => Value::String(s.clone()),
            SnapshotValue::Date(dt) => {
                Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            SnapshotValue::Id(id) => Value::String(id.clone()),
            SnapshotValue::Array(items) => self.nested(|this| {
                Value::Array(items.iter().map(|item| this.visit(item)).collect())
            }),
            SnapshotValue::Map(fields) => self.nested(|this| this.visit_fields(fields)),
            SnapshotValue::Document(doc) => {
                let addr = doc.addr();
                if self.path.contains(&addr) {
                    return Value::String(CIRCULAR.to_string());
                }
                self.nested(|this| {
                    this.path.push(addr);
                    let out = this.visit_fields(&doc.fields());
                    this.path.pop();
                    out
                })
            }
        }
    }

    fn nested(&mut self, visit: impl FnOnce(&mut Self) -> Value) -> Value {
        if self.depth >= MAX_DEPTH {
            return Value::String(TOO_DEEP.to_string());
        }
        self.depth += 1;
        let out = visit(self);
        self.depth -= 1;
        out
    }

    fn visit_fields(&mut self, fields: &BTreeMap<String, SnapshotValue>) -> Value {
        let mut out = Map::new();
        for (key, value) in fields {
            let clean = if self.sensitive.contains(key) {
                Value::String(REDACTED.to_string())
            } else {
                self.visit(value)
            };
            out.insert(key.clone(), clean);
        }
        Value::Object(out)
    }
}
