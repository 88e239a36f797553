#![no_main]
use libfuzzer_sys::fuzz_target;
use nexusdoc::document::{deserialize, serialize};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    if let Ok(doc) = deserialize(s) {
        // Anything accepted must encode again and decode to an equal document
        if let Ok(line) = serialize(&doc) {
            let back = deserialize(&line).expect("re-decode");
            assert!(nexusdoc::query::equal(&back.into_value(), &doc.into_value()) || line.contains("NaN"));
        }
    }
});
