//! Snapshot values handed to the audit log.
//!
//! Callers describe the before/after state of a record with
//! [`SnapshotValue`], a closed set of value kinds. A [`DocumentRef`] is a
//! shared, mutable document that may end up referring to itself; the
//! sanitizer flattens it into a plain map and breaks any cycle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One value inside an audit snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Stored as an RFC 3339 string.
    Date(DateTime<Utc>),
    /// A record identifier, stored in its string form.
    Id(String),
    Array(Vec<SnapshotValue>),
    Map(BTreeMap<String, SnapshotValue>),
    Document(DocumentRef),
}

impl SnapshotValue {
    /// Identifier value from anything with a string form.
    pub fn id(id: impl fmt::Display) -> Self {
        SnapshotValue::Id(id.to_string())
    }

    /// Build a map snapshot from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<SnapshotValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        SnapshotValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Snapshot any serializable model through its JSON form.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }
}

impl From<serde_json::Value> for SnapshotValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => SnapshotValue::Null,
            Value::Bool(b) => SnapshotValue::Bool(b),
            Value::Number(n) => SnapshotValue::Number(n),
            Value::String(s) => SnapshotValue::String(s),
            Value::Array(items) => {
                SnapshotValue::Array(items.into_iter().map(Self::from).collect())
            }
            Value::Object(map) => {
                SnapshotValue::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for SnapshotValue {
    fn from(b: bool) -> Self {
        SnapshotValue::Bool(b)
    }
}

impl From<i64> for SnapshotValue {
    fn from(n: i64) -> Self {
        SnapshotValue::Number(n.into())
    }
}

impl From<u64> for SnapshotValue {
    fn from(n: u64) -> Self {
        SnapshotValue::Number(n.into())
    }
}

impl From<i32> for SnapshotValue {
    fn from(n: i32) -> Self {
        SnapshotValue::Number(n.into())
    }
}

/// Non-finite floats have no JSON form and become `Null`.
impl From<f64> for SnapshotValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(SnapshotValue::Null, SnapshotValue::Number)
    }
}

impl From<&str> for SnapshotValue {
    fn from(s: &str) -> Self {
        SnapshotValue::String(s.to_string())
    }
}

impl From<String> for SnapshotValue {
    fn from(s: String) -> Self {
        SnapshotValue::String(s)
    }
}

impl From<DateTime<Utc>> for SnapshotValue {
    fn from(dt: DateTime<Utc>) -> Self {
        SnapshotValue::Date(dt)
    }
}

impl From<Uuid> for SnapshotValue {
    fn from(id: Uuid) -> Self {
        SnapshotValue::Id(id.to_string())
    }
}

impl<T: Into<SnapshotValue>> From<Option<T>> for SnapshotValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SnapshotValue::Null, Into::into)
    }
}

impl From<Vec<SnapshotValue>> for SnapshotValue {
    fn from(items: Vec<SnapshotValue>) -> Self {
        SnapshotValue::Array(items)
    }
}

impl From<BTreeMap<String, SnapshotValue>> for SnapshotValue {
    fn from(map: BTreeMap<String, SnapshotValue>) -> Self {
        SnapshotValue::Map(map)
    }
}

impl From<DocumentRef> for SnapshotValue {
    fn from(doc: DocumentRef) -> Self {
        SnapshotValue::Document(doc)
    }
}

/// A shared, live document.
///
/// Clones point at the same document, so a document can be inserted into
/// itself. Equality is identity.
#[derive(Clone, Default)]
pub struct DocumentRef(Arc<RwLock<BTreeMap<String, SnapshotValue>>>);

impl DocumentRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: BTreeMap<String, SnapshotValue>) -> Self {
        Self(Arc::new(RwLock::new(fields)))
    }

    /// Set `key`, returning the previous value.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: impl Into<SnapshotValue>,
    ) -> Option<SnapshotValue> {
        let value = value.into();
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<SnapshotValue> {
        self.fields().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the fields. Do not insert while holding it.
    pub fn fields(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, SnapshotValue>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stable address used to spot a document already on the visit path.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for DocumentRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// Fields are not printed: a document may contain itself.
impl fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRef")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_map_onto_snapshot_kinds() {
        let snap = SnapshotValue::from(json!({"price": 50, "tags": ["a"], "note": null}));
        let SnapshotValue::Map(map) = snap else {
            panic!("expected a map");
        };
        assert_eq!(map["price"], SnapshotValue::Number(50.into()));
        assert_eq!(
            map["tags"],
            SnapshotValue::Array(vec![SnapshotValue::String("a".into())])
        );
        assert_eq!(map["note"], SnapshotValue::Null);
    }

    #[test]
    fn serializable_models_become_maps() {
        #[derive(Serialize)]
        struct Service {
            name: &'static str,
            price: u32,
        }

        let snap = SnapshotValue::from_serialize(&Service {
            name: "Wash",
            price: 72,
        })
        .unwrap();
        assert_eq!(
            snap,
            SnapshotValue::map([("name", SnapshotValue::from("Wash")), ("price", 72i64.into())])
        );
    }

    #[test]
    fn documents_compare_by_identity() {
        let a = DocumentRef::new();
        let b = DocumentRef::new();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn document_can_hold_itself() {
        let doc = DocumentRef::new();
        doc.insert("self", doc.clone());
        assert_eq!(doc.get("self"), Some(SnapshotValue::Document(doc.clone())));
        // Debug must not recurse.
        assert!(format!("{doc:?}").starts_with("DocumentRef"));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(SnapshotValue::from(f64::NAN), SnapshotValue::Null);
        assert_eq!(
            SnapshotValue::from(1.5),
            SnapshotValue::Number(serde_json::Number::from_f64(1.5).unwrap())
        );
    }
}
