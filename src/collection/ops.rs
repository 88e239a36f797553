use super::core::Collection;
use crate::document::{Document, ID_FIELD, check_document, deserialize, serialize};
use crate::errors::DbError;
use crate::query::{
    Cursor, DeleteReport, UpdateOptions, UpdateReport, count, find_one, plan_remove, plan_update,
};
use crate::types::{DocumentId, Map, Value};
use crate::utils::num::usize_to_u64;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Gives `doc` an `_id` when it has none and checks the one it has.
fn prepare(mut doc: Document) -> Result<(DocumentId, Document), DbError> {
    let id = match doc.get(ID_FIELD) {
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            doc.set_id(id.clone());
            id
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(DbError::Validation(format!("_id must be a string, got {}", other.type_name())));
        }
    };
    check_document(&doc)?;
    Ok((id, doc))
}

impl Collection {
    /// Stores a copy of `doc` and returns it with its `_id`.
    ///
    /// # Errors
    /// `DbError::Validation` for a non-string `_id` or forbidden keys,
    /// `DbError::DuplicateId` when the `_id` is already taken.
    pub fn insert(&self, doc: Document) -> Result<Document, DbError> {
        let (id, doc) = prepare(doc)?;
        let mut st = self.state.write();
        if st.docs.contains_key(&id) {
            return Err(DbError::DuplicateId(id));
        }
        st.index_insert(&doc, &id);
        st.docs.insert(id.clone(), Arc::new(doc.clone()));
        log::debug!("insert {} into {}", id, self.name());
        Ok(doc)
    }

    #[must_use]
    pub fn find(&self, query: Map) -> Cursor<'_, Self> {
        Cursor::new(self, query)
    }

    /// # Errors
    /// Returns `DbError::Query` when the query is malformed.
    pub fn find_one(&self, query: &Map) -> Result<Option<Document>, DbError> {
        find_one(self, query)
    }

    /// # Errors
    /// Returns `DbError::Query` when the query is malformed.
    pub fn count(&self, query: &Map) -> Result<usize, DbError> {
        count(self, query)
    }

    /// Applies `update` to the first matching document, or to all of them with `multi`.
    /// Either every matched document is updated or, on error, none is.
    ///
    /// # Errors
    /// Query, modifier and validation errors from any matched document.
    pub fn update(
        &self,
        query: &Map,
        update: &Map,
        opts: UpdateOptions,
    ) -> Result<UpdateReport, DbError> {
        let mut st = self.state.write();
        let snapshot = st.candidates(query);
        let planned = plan_update(&snapshot, query, update, opts)?;
        let mut modified = 0u64;
        for (before, after) in &planned {
            let Some(id) = before.id().map(str::to_owned) else { continue };
            if before.as_ref() != after {
                modified += 1;
            }
            st.index_remove(before, &id);
            st.index_insert(after, &id);
            st.docs.insert(id, Arc::new(after.clone()));
        }
        log::debug!("update in {}: matched {} modified {}", self.name(), planned.len(), modified);
        Ok(UpdateReport { matched: usize_to_u64(planned.len()), modified })
    }

    /// # Errors
    /// Returns `DbError::Query` when the query is malformed.
    pub fn remove(&self, query: &Map, multi: bool) -> Result<DeleteReport, DbError> {
        let mut st = self.state.write();
        let snapshot = st.candidates(query);
        let doomed = plan_remove(&snapshot, query, multi)?;
        for doc in &doomed {
            if let Some(id) = doc.id().map(str::to_owned) {
                st.index_remove(doc, &id);
                st.docs.shift_remove(&id);
            }
        }
        log::debug!("remove from {}: {} document(s)", self.name(), doomed.len());
        Ok(DeleteReport { deleted: usize_to_u64(doomed.len()) })
    }

    /// Writes one serialized document per line, in insertion order.
    ///
    /// # Errors
    /// I/O failures and serialization errors.
    pub fn dump<W: Write>(&self, mut out: W) -> Result<usize, DbError> {
        let docs: Vec<Arc<Document>> = self.state.read().docs.values().cloned().collect();
        for doc in &docs {
            writeln!(out, "{}", serialize(doc)?)?;
        }
        out.flush()?;
        Ok(docs.len())
    }

    /// Replays lines written by [`Collection::dump`]. A later line with an `_id` already seen
    /// replaces the earlier document. Nothing is applied unless every line decodes.
    ///
    /// # Errors
    /// I/O failures, or `DbError::Format` naming the first bad line.
    pub fn load<R: BufRead>(&self, input: R) -> Result<usize, DbError> {
        let mut decoded = Vec::new();
        for (n, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let doc = deserialize(&line).map_err(|e| DbError::Format(format!("line {}: {e}", n + 1)))?;
            decoded.push(prepare(doc)?);
        }
        let mut st = self.state.write();
        for (id, doc) in &decoded {
            if let Some(old) = st.docs.get(id).cloned() {
                st.index_remove(&old, id);
            }
            st.index_insert(doc, id);
            st.docs.insert(id.clone(), Arc::new(doc.clone()));
        }
        log::info!("loaded {} line(s) into {}", decoded.len(), self.name());
        Ok(decoded.len())
    }
}
