#![no_main]
use libfuzzer_sys::fuzz_target;
use nexusdoc::Document;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(serde_json::Value::Object(q)) = serde_json::from_str::<serde_json::Value>(s) else { return };
    let Ok(query) = Document::try_from(serde_json::Value::Object(q)).map(Document::into_map) else { return };
    // Build a tiny set of docs to exercise eval paths
    let docs = [
        serde_json::json!({"a": 1, "b": 2, "name": "x"}),
        serde_json::json!({"a": 10, "b": -5, "name": "y", "nested": {"z": 3}, "tags": [1, "t", null]}),
        serde_json::json!({"active": true}),
    ];
    let compiled = nexusdoc::query::parse_query(&query);
    for d in docs {
        let Ok(doc) = Document::try_from(d) else { continue };
        let outcome = nexusdoc::query::match_document(doc.as_map(), &query);
        assert_eq!(outcome.is_ok(), compiled.is_ok());
    }
});
