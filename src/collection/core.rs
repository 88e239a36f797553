use super::index::HashIndex;
use crate::document::Document;
use crate::query::CandidateSource;
use crate::types::{DocumentId, Map, Value};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct State {
    /// Insertion ordered; unsorted finds return documents in this order.
    pub(crate) docs: IndexMap<DocumentId, Arc<Document>>,
    pub(crate) indexes: HashMap<String, HashIndex>,
}

/// An in-memory set of documents keyed by `_id`.
#[derive(Debug)]
pub struct Collection {
    name: String,
    pub(crate) state: RwLock<State>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), state: RwLock::new(State::default()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl State {
    pub(crate) fn index_insert(&mut self, doc: &Document, id: &DocumentId) {
        for idx in self.indexes.values_mut() {
            idx.insert(doc, id);
        }
    }

    pub(crate) fn index_remove(&mut self, doc: &Document, id: &DocumentId) {
        for idx in self.indexes.values_mut() {
            idx.remove(doc, id);
        }
    }

    /// Every document that could match `query`, in insertion order.
    pub(crate) fn candidates(&self, query: &Map) -> Vec<Arc<Document>> {
        let Some(ids) = self.narrow(query) else {
            return self.docs.values().cloned().collect();
        };
        let mut positions: Vec<usize> = ids.iter().filter_map(|id| self.docs.get_index_of(id)).collect();
        positions.sort_unstable();
        log::debug!("index narrowed candidates to {} of {}", positions.len(), self.docs.len());
        positions.into_iter().filter_map(|i| self.docs.get_index(i).map(|(_, d)| Arc::clone(d))).collect()
    }

    // Smallest id set implied by a top-level literal equality, looking through `$and`.
    fn narrow(&self, query: &Map) -> Option<Vec<DocumentId>> {
        let mut best: Option<Vec<DocumentId>> = None;
        for (key, value) in query {
            let found = if key == "$and" {
                match value {
                    Value::Array(subs) => subs
                        .iter()
                        .filter_map(|s| s.as_object().and_then(|m| self.narrow(m)))
                        .min_by_key(Vec::len),
                    _ => None,
                }
            } else if key.starts_with('$') {
                None
            } else {
                self.lookup_field(key, value)
            };
            if let Some(ids) = found
                && best.as_ref().is_none_or(|b| ids.len() < b.len())
            {
                best = Some(ids);
            }
        }
        best
    }

    fn lookup_field(&self, field: &str, value: &Value) -> Option<Vec<DocumentId>> {
        if field == crate::document::ID_FIELD
            && let Value::String(id) = value
        {
            return Some(self.docs.get_key_value(id).map(|(k, _)| vec![k.clone()]).unwrap_or_default());
        }
        let ids = self.indexes.get(field)?.lookup_eq(value)?;
        Some(ids.into_iter().collect())
    }
}

impl CandidateSource for Collection {
    fn get_candidates(&self, query: &Map) -> Vec<Arc<Document>> {
        self.state.read().candidates(query)
    }
}
