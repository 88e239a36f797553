use super::core::Collection;
use super::index::{HashIndex, IndexStats};

impl Collection {
    // --- Index admin helpers ---

    /// Creates an exact-match index on `field` (dot paths allowed) and fills it from the
    /// current documents. A second call for the same field does nothing.
    pub fn ensure_index(&self, field: &str) {
        let mut st = self.state.write();
        if st.indexes.contains_key(field) {
            return;
        }
        let start = std::time::Instant::now();
        let mut idx = HashIndex::new(field.to_string());
        for (id, doc) in &st.docs {
            idx.insert(doc, id);
        }
        log::info!(
            "built index {}.{} over {} document(s) in {} ms",
            self.name(),
            field,
            st.docs.len(),
            start.elapsed().as_millis()
        );
        st.indexes.insert(field.to_string(), idx);
    }

    /// Returns whether an index existed.
    pub fn remove_index(&self, field: &str) -> bool {
        self.state.write().indexes.remove(field).is_some()
    }

    #[must_use]
    pub fn indexed_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.state.read().indexes.keys().cloned().collect();
        fields.sort();
        fields
    }

    #[must_use]
    pub fn index_stats(&self, field: &str) -> Option<IndexStats> {
        self.state.read().indexes.get(field).map(|i| i.stats.clone())
    }
}
