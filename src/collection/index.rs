use crate::document::{Document, get_path};
use crate::types::{DocumentId, Value};
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};

/// Hashable form of the scalar values an index can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Num(OrderedFloat<f64>),
    Str(String),
    Date(DateTime<Utc>),
}

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub keys: usize,
    pub entries: usize,
}

/// Arrays and objects have no key.
#[must_use]
pub fn key_from_value(v: &Value) -> Option<IndexKey> {
    match v {
        Value::Null => Some(IndexKey::Null),
        Value::Bool(b) => Some(IndexKey::Bool(*b)),
        Value::Number(n) => Some(IndexKey::Num(OrderedFloat(*n))),
        Value::String(s) => Some(IndexKey::Str(s.clone())),
        Value::Date(d) => Some(IndexKey::Date(*d)),
        Value::Array(_) | Value::Object(_) => None,
    }
}

// A literal matches an array field when any element equals it, so each scalar element of an
// array gets its own entry.
fn keys_of(doc: &Document, field: &str) -> Vec<IndexKey> {
    match get_path(doc.as_map(), field) {
        Some(Value::Array(items)) => items.iter().filter_map(key_from_value).collect(),
        Some(v) => key_from_value(v).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Exact-match index over one dot path.
#[derive(Debug, Clone)]
pub struct HashIndex {
    pub field: String,
    map: HashMap<IndexKey, HashSet<DocumentId>>,
    pub stats: IndexStats,
}

impl HashIndex {
    #[must_use]
    pub fn new(field: String) -> Self {
        Self { field, map: HashMap::new(), stats: IndexStats::default() }
    }

    pub fn insert(&mut self, doc: &Document, id: &DocumentId) {
        for k in keys_of(doc, &self.field) {
            if self.map.entry(k).or_default().insert(id.clone()) {
                self.stats.entries += 1;
            }
        }
        self.stats.keys = self.map.len();
    }

    pub fn remove(&mut self, doc: &Document, id: &DocumentId) {
        for k in keys_of(doc, &self.field) {
            if let Some(set) = self.map.get_mut(&k) {
                if set.remove(id) {
                    self.stats.entries = self.stats.entries.saturating_sub(1);
                }
                if set.is_empty() {
                    self.map.remove(&k);
                }
            }
        }
        self.stats.keys = self.map.len();
    }

    /// `None` when `v` cannot be indexed; an empty set when nothing is stored under it.
    #[must_use]
    pub fn lookup_eq(&self, v: &Value) -> Option<HashSet<DocumentId>> {
        let k = key_from_value(v)?;
        Some(self.map.get(&k).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        Document::try_from(v).unwrap()
    }

    #[test]
    fn indexes_scalars_and_array_elements() {
        let mut idx = HashIndex::new("tags".into());
        idx.insert(&doc(json!({"tags": ["a", "b", {"x": 1}]})), &"1".to_string());
        idx.insert(&doc(json!({"tags": "a"})), &"2".to_string());
        idx.insert(&doc(json!({"other": 1})), &"3".to_string());
        assert_eq!(idx.lookup_eq(&"a".into()).unwrap().len(), 2);
        assert_eq!(idx.lookup_eq(&"b".into()).unwrap().len(), 1);
        assert!(idx.lookup_eq(&"zzz".into()).unwrap().is_empty());
        assert!(idx.lookup_eq(&Value::Array(vec![])).is_none());
        assert_eq!(idx.stats.entries, 3);
    }

    #[test]
    fn remove_cleans_up_empty_keys() {
        let mut idx = HashIndex::new("a.b".into());
        let d = doc(json!({"a": {"b": 5}}));
        idx.insert(&d, &"1".to_string());
        assert_eq!(idx.stats.keys, 1);
        idx.remove(&d, &"1".to_string());
        assert_eq!(idx.stats.keys, 0);
        assert_eq!(idx.stats.entries, 0);
        assert!(idx.lookup_eq(&5.into()).unwrap().is_empty());
    }

    #[test]
    fn variants_do_not_collide() {
        let mut idx = HashIndex::new("v".into());
        idx.insert(&doc(json!({"v": 1})), &"n".to_string());
        idx.insert(&doc(json!({"v": "1"})), &"s".to_string());
        idx.insert(&doc(json!({"v": true})), &"b".to_string());
        assert_eq!(idx.lookup_eq(&1.into()).unwrap(), HashSet::from(["n".to_string()]));
        assert_eq!(idx.lookup_eq(&"1".into()).unwrap(), HashSet::from(["s".to_string()]));
    }
}
