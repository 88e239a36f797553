use chrono::{TimeZone, Utc};
use nexusdoc::document::{Document, check_document, deserialize, serialize};
use nexusdoc::{DbError, Map, Value};
use serde_json::json;

fn doc(v: serde_json::Value) -> Document {
    Document::try_from(v).unwrap()
}

#[test]
fn one_document_per_line() {
    let d = doc(json!({"a": "line\nbreak\r", "b": "sep\u{2028}par\u{2029}", "n": [1, 2.5, null]}));
    let line = serialize(&d).unwrap();
    assert!(!line.contains(['\n', '\r', '\u{2028}', '\u{2029}']));
    assert_eq!(deserialize(&line).unwrap(), d);
}

#[test]
fn dates_and_special_numbers_survive() {
    let mut d = Document::new();
    d.insert("when".into(), Value::Date(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()));
    d.insert("precise".into(), Value::Date(Utc.timestamp_nanos(1_700_000_000_123_456_789)));
    d.insert("inf".into(), Value::Number(f64::NEG_INFINITY));
    let back = deserialize(&serialize(&d).unwrap()).unwrap();
    assert_eq!(back, d);
    assert!(matches!(back.get("when"), Some(Value::Date(_))));
}

#[test]
fn nan_round_trips_as_nan() {
    let mut d = Document::new();
    d.insert("x".into(), Value::Number(f64::NAN));
    let back = deserialize(&serialize(&d).unwrap()).unwrap();
    assert!(matches!(back.get("x"), Some(Value::Number(n)) if n.is_nan()));
}

#[test]
fn serialize_validates_keys() {
    assert!(matches!(serialize(&doc(json!({"$x": 1}))), Err(DbError::Validation(_))));
    assert!(matches!(serialize(&doc(json!({"a": {"b.c": 1}}))), Err(DbError::Validation(_))));
    assert!(matches!(serialize(&doc(json!({"a": [{"$y": 1}]}))), Err(DbError::Validation(_))));
    assert!(check_document(&doc(json!({"a": [{"y": 1}], "_id": "ok"}))).is_ok());
}

#[test]
fn garbage_lines_are_format_errors() {
    for line in ["", "nope", "[1,2]", "{\"a\":", "{\"$bad\":1}", "{\"d\":{\"$$date\":\"yesterday\"}}"] {
        assert!(matches!(deserialize(line), Err(DbError::Format(_))), "{line}");
    }
}

#[test]
fn deep_nesting_is_rejected() {
    let mut v = Value::Null;
    for _ in 0..100 {
        let mut m = Map::new();
        m.insert("k".into(), v);
        v = Value::Object(m);
    }
    let Value::Object(m) = v else { unreachable!() };
    assert!(matches!(serialize(&Document::from_map(m)), Err(DbError::Validation(_))));
}
