use nexusdoc::document::Document;
use nexusdoc::query::{CandidateSource, Cursor, FindOptions, SortSpec, parse_sort};
use nexusdoc::{DbError, Map};
use serde_json::json;
use std::sync::Arc;

/// Source that hands out everything and counts how often it was asked.
struct Counting {
    docs: Vec<Arc<Document>>,
    calls: std::cell::Cell<usize>,
}

impl CandidateSource for Counting {
    fn get_candidates(&self, _query: &Map) -> Vec<Arc<Document>> {
        self.calls.set(self.calls.get() + 1);
        self.docs.clone()
    }
}

fn source(values: Vec<serde_json::Value>) -> Counting {
    Counting {
        docs: values.into_iter().map(|v| Arc::new(Document::try_from(v).unwrap())).collect(),
        calls: std::cell::Cell::new(0),
    }
}

fn map(v: serde_json::Value) -> Map {
    Document::try_from(v).unwrap().into_map()
}

fn field(docs: &[Document], name: &str) -> Vec<String> {
    docs.iter().map(|d| d.get(name).and_then(|v| v.as_str()).unwrap_or("-").to_string()).collect()
}

#[test]
fn builder_is_lazy() {
    let src = source(vec![json!({"a": "x"})]);
    let cursor = Cursor::new(&src, Map::new()).limit(3).skip(1).sort(vec![SortSpec::asc("a")]);
    assert_eq!(src.calls.get(), 0);
    assert_eq!(cursor.options().limit, Some(3));
    let _ = cursor.exec().unwrap();
    let _ = cursor.exec().unwrap();
    assert_eq!(src.calls.get(), 2);
}

#[test]
fn multi_key_sort_first_key_wins() {
    let src = source(vec![
        json!({"city": "b", "name": "z"}),
        json!({"city": "a", "name": "y"}),
        json!({"city": "b", "name": "a"}),
        json!({"city": "a", "name": "b"}),
    ]);
    let spec = parse_sort(&map(json!({"city": 1, "name": -1}))).unwrap();
    let out = Cursor::new(&src, Map::new()).sort(spec).exec().unwrap();
    assert_eq!(field(&out, "name"), ["y", "b", "z", "a"]);
}

#[test]
fn sort_is_stable_for_ties() {
    let src = source(vec![
        json!({"k": 1, "tag": "first"}),
        json!({"k": 0, "tag": "zero"}),
        json!({"k": 1, "tag": "second"}),
        json!({"k": 1, "tag": "third"}),
    ]);
    let out = Cursor::new(&src, Map::new()).sort(vec![SortSpec::asc("k")]).exec().unwrap();
    assert_eq!(field(&out, "tag"), ["zero", "first", "second", "third"]);
}

#[test]
fn mixed_types_sort_by_variant_rank() {
    let src = source(vec![
        json!({"v": true, "tag": "bool"}),
        json!({"v": "s", "tag": "string"}),
        json!({"tag": "absent"}),
        json!({"v": 2, "tag": "number"}),
        json!({"v": null, "tag": "null"}),
    ]);
    let out = Cursor::new(&src, Map::new()).sort(vec![SortSpec::asc("v")]).exec().unwrap();
    assert_eq!(field(&out, "tag"), ["absent", "null", "number", "string", "bool"]);
}

#[test]
fn skip_past_the_end_is_empty() {
    let src = source(vec![json!({"a": "1"}), json!({"a": "2"})]);
    assert!(Cursor::new(&src, Map::new()).skip(5).exec().unwrap().is_empty());
    let opts = FindOptions { sort: Some(vec![SortSpec::desc("a")]), limit: None, skip: Some(5) };
    assert!(Cursor::with_options(&src, Map::new(), opts).exec().unwrap().is_empty());
}

#[test]
fn bad_sort_direction_is_a_query_error() {
    assert!(matches!(parse_sort(&map(json!({"a": 0}))), Err(DbError::Query(_))));
    assert!(matches!(parse_sort(&map(json!({"a": "asc"}))), Err(DbError::Query(_))));
}

#[test]
fn exec_then_delivers_exactly_once() {
    let src = source(vec![json!({"a": "1"})]);
    let mut calls = 0;
    let n = Cursor::new(&src, Map::new()).exec_then(|r| {
        calls += 1;
        r.map(|d| d.len())
    });
    assert_eq!(n.unwrap(), 1);
    assert_eq!(calls, 1);
}
