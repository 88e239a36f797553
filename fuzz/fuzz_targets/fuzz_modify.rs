#![no_main]
use libfuzzer_sys::fuzz_target;
use nexusdoc::Document;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(update) = nexusdoc::query::parse_update_json(s) else { return };
    let original = Document::try_from(serde_json::json!({
        "_id": "fz", "n": 1, "s": "str", "arr": [1, 2, {"k": "v"}], "obj": {"deep": {"x": 0}}
    }))
    .expect("seed doc");
    let snapshot = original.clone();
    let _ = nexusdoc::query::apply_update(&original, &update);
    assert_eq!(original, snapshot);
});
