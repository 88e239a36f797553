use crate::document::Document;
use crate::errors::DbError;
use crate::types::Map;
use crate::utils::num::{u128_to_u64_saturating, usize_to_u64};
use std::sync::Arc;
use std::time::Instant;

use super::eval::{compare_docs, eval_filter};
use super::parse::parse_query;
use super::types::{FindOptions, SortSpec};

/// Supplies the documents a query may match. Implementations may narrow the set using the
/// query (an index lookup, for instance) but must never drop a document that could match.
pub trait CandidateSource {
    fn get_candidates(&self, query: &Map) -> Vec<Arc<Document>>;
}

impl CandidateSource for [Arc<Document>] {
    fn get_candidates(&self, _query: &Map) -> Vec<Arc<Document>> {
        self.to_vec()
    }
}

impl CandidateSource for Vec<Arc<Document>> {
    fn get_candidates(&self, query: &Map) -> Vec<Arc<Document>> {
        self.as_slice().get_candidates(query)
    }
}

/// A pending find. Builder calls only record options; nothing runs until [`Cursor::exec`].
pub struct Cursor<'a, S: CandidateSource + ?Sized> {
    source: &'a S,
    query: Map,
    options: FindOptions,
}

impl<'a, S: CandidateSource + ?Sized> Cursor<'a, S> {
    #[must_use]
    pub fn new(source: &'a S, query: Map) -> Self {
        Self { source, query, options: FindOptions::default() }
    }

    #[must_use]
    pub fn with_options(source: &'a S, query: Map, options: FindOptions) -> Self {
        Self { source, query, options }
    }

    /// Zero means no limit.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.options.limit = Some(n);
        self
    }

    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.options.skip = Some(n);
        self
    }

    /// Keys earlier in `spec` take precedence over later ones.
    #[must_use]
    pub fn sort(mut self, spec: Vec<SortSpec>) -> Self {
        self.options.sort = Some(spec);
        self
    }

    #[must_use]
    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Runs the query and returns deep copies of the selected documents.
    ///
    /// # Errors
    /// Returns `DbError::Query` when the query is malformed. Documents that do not match
    /// are skipped, never reported.
    pub fn exec(&self) -> Result<Vec<Document>, DbError> {
        let filter = parse_query(&self.query)?;
        let start = Instant::now();
        let candidates = self.source.get_candidates(&self.query);
        let skip = self.options.skip.unwrap_or(0);
        let limit = self.options.limit.filter(|&n| n > 0);

        let docs: Vec<Document> = match self.options.sort.as_deref() {
            None => {
                let mut out = Vec::new();
                let mut skipped = 0usize;
                for doc in &candidates {
                    if !eval_filter(doc.as_map(), &filter) {
                        continue;
                    }
                    if skipped < skip {
                        skipped += 1;
                        continue;
                    }
                    out.push(Document::clone(doc));
                    if limit.is_some_and(|l| out.len() >= l) {
                        break;
                    }
                }
                out
            }
            Some(spec) => {
                let mut matched: Vec<&Arc<Document>> =
                    candidates.iter().filter(|d| eval_filter(d.as_map(), &filter)).collect();
                matched.sort_by(|a, b| compare_docs(a.as_map(), b.as_map(), spec));
                matched
                    .into_iter()
                    .skip(skip)
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|d| Document::clone(d))
                    .collect()
            }
        };

        crate::dev6!(
            "{{\"bench\":\"query\",\"op\":\"find\",\"duration_ms\":{},\"candidates\":{},\"result_count\":{},\"sorted\":{},\"limit\":{},\"skip\":{}}}",
            u128_to_u64_saturating(start.elapsed().as_millis()),
            usize_to_u64(candidates.len()),
            usize_to_u64(docs.len()),
            self.options.sort.is_some(),
            usize_to_u64(self.options.limit.unwrap_or(0)),
            usize_to_u64(skip)
        );
        Ok(docs)
    }

    /// Callback form of [`Cursor::exec`]; `done` runs exactly once with the outcome.
    pub fn exec_then<T>(&self, done: impl FnOnce(Result<Vec<Document>, DbError>) -> T) -> T {
        done(self.exec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arcs(values: Vec<serde_json::Value>) -> Vec<Arc<Document>> {
        values.into_iter().map(|v| Arc::new(Document::try_from(v).unwrap())).collect()
    }

    fn q(v: serde_json::Value) -> Map {
        Document::try_from(v).unwrap().into_map()
    }

    fn numbers(docs: &[Document]) -> Vec<f64> {
        docs.iter().filter_map(|d| d.get("n").and_then(|v| v.as_f64())).collect()
    }

    #[test]
    fn sort_then_skip_then_limit() {
        let src = arcs(vec![json!({"n": 3}), json!({"n": 1}), json!({"n": 2})]);
        let out = Cursor::new(&src, Map::new()).sort(vec![SortSpec::asc("n")]).skip(1).limit(1).exec().unwrap();
        assert_eq!(numbers(&out), vec![2.0]);
    }

    #[test]
    fn unsorted_keeps_candidate_order() {
        let src = arcs(vec![json!({"n": 3}), json!({"n": 1}), json!({"n": 2}), json!({"n": 5})]);
        let out = Cursor::new(&src, q(json!({"n": {"$gt": 1}}))).skip(1).limit(2).exec().unwrap();
        assert_eq!(numbers(&out), vec![2.0, 5.0]);
    }

    #[test]
    fn zero_limit_and_skip_mean_none() {
        let src = arcs(vec![json!({"n": 1}), json!({"n": 2})]);
        let out = Cursor::new(&src, Map::new()).limit(0).skip(0).exec().unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn descending_sort_and_missing_fields() {
        let src = arcs(vec![json!({"n": 1}), json!({"m": 0}), json!({"n": 7})]);
        let out = Cursor::new(&src, Map::new()).sort(vec![SortSpec::desc("n")]).exec().unwrap();
        assert_eq!(numbers(&out), vec![7.0, 1.0]);
        assert!(out[2].get("n").is_none());
    }

    #[test]
    fn results_are_copies() {
        let src = arcs(vec![json!({"n": 1})]);
        let mut out = Cursor::new(&src, Map::new()).exec().unwrap();
        out[0].insert("n".into(), 99.into());
        assert_eq!(src[0].get("n").and_then(|v| v.as_f64()), Some(1.0));
    }

    #[test]
    fn malformed_query_errors_even_without_candidates() {
        let src: Vec<Arc<Document>> = Vec::new();
        let err = Cursor::new(&src, q(json!({"$bogus": 1}))).exec();
        assert!(matches!(err, Err(DbError::Query(_))));
        let seen = Cursor::new(&src, q(json!({"a": {"$in": 5}}))).exec_then(|r| r.is_err());
        assert!(seen);
    }

    #[test]
    fn exec_emits_a_bench_line() {
        let src = arcs(vec![json!({"n": 1})]);
        let (out, lines) = crate::utils::devlog::capture(|| Cursor::new(&src, Map::new()).exec());
        assert_eq!(out.unwrap().len(), 1);
        assert!(lines.iter().any(|l| l.contains("\"op\":\"find\"") && l.contains("\"result_count\":1")));
    }
}
