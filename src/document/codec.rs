//! Single-line text encoding of a document, one document per line of an append-only log.
//!
//! The encoding is JSON. Values JSON cannot express are written as single-key marker
//! objects, which cannot collide with stored data because stored keys never start with `$`:
//! - dates: `{"$$date": <epoch millis>}`, or `{"$$date": {"s": <epoch secs>, "ns": <nanos>}}`
//!   when the instant has sub-millisecond precision;
//! - non-finite numbers: `{"$$number": "NaN" | "Infinity" | "-Infinity"}`.

use super::core::Document;
use super::validate::check_document;
use crate::errors::DbError;
use crate::types::{Map, Value};
use chrono::{DateTime, Utc};
use serde_json::Value as Json;

const DATE_MARKER: &str = "$$date";
const NUMBER_MARKER: &str = "$$number";

// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// # Errors
/// Returns `DbError::Validation` if any key (recursively) starts with `$` or contains `.`.
pub fn serialize(doc: &Document) -> Result<String, DbError> {
    check_document(doc)?;
    let json = Json::Object(map_to_json(doc.as_map()));
    let line = serde_json::to_string(&json).map_err(|e| DbError::Format(e.to_string()))?;
    // JSON escapes \n and \r but leaves the Unicode line separators raw.
    if line.contains(['\u{2028}', '\u{2029}']) {
        return Ok(line.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029"));
    }
    Ok(line)
}

/// # Errors
/// Returns `DbError::Format` if `text` is not a JSON object or carries a malformed marker.
pub fn deserialize(text: &str) -> Result<Document, DbError> {
    let json: Json = serde_json::from_str(text).map_err(|e| DbError::Format(e.to_string()))?;
    match json {
        Json::Object(m) => Ok(Document::from_map(map_from_json(m)?)),
        other => Err(DbError::Format(format!("expected an object, got {other}"))),
    }
}

fn map_to_json(map: &Map) -> serde_json::Map<String, Json> {
    map.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Date(d) => date_to_json(d),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Object(m) => Json::Object(map_to_json(m)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        let tag = if n.is_nan() {
            "NaN"
        } else if n > 0.0 {
            "Infinity"
        } else {
            "-Infinity"
        };
        return marker(NUMBER_MARKER, Json::String(tag.to_string()));
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}

fn date_to_json(d: &DateTime<Utc>) -> Json {
    if d.timestamp_subsec_nanos() % 1_000_000 == 0 {
        marker(DATE_MARKER, Json::from(d.timestamp_millis()))
    } else {
        let mut parts = serde_json::Map::with_capacity(2);
        parts.insert("s".to_string(), Json::from(d.timestamp()));
        parts.insert("ns".to_string(), Json::from(d.timestamp_subsec_nanos()));
        marker(DATE_MARKER, Json::Object(parts))
    }
}

fn marker(key: &str, v: Json) -> Json {
    let mut m = serde_json::Map::with_capacity(1);
    m.insert(key.to_string(), v);
    Json::Object(m)
}

fn map_from_json(m: serde_json::Map<String, Json>) -> Result<Map, DbError> {
    let mut out = Map::with_capacity(m.len());
    for (k, v) in m {
        if k.starts_with('$') {
            return Err(DbError::Format(format!("unexpected key {k}")));
        }
        out.insert(k, from_json(v)?);
    }
    Ok(out)
}

fn from_json(json: Json) -> Result<Value, DbError> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => Value::Number(
            n.as_f64().ok_or_else(|| DbError::Format(format!("unrepresentable number {n}")))?,
        ),
        Json::String(s) => Value::String(s),
        Json::Array(items) => {
            Value::Array(items.into_iter().map(from_json).collect::<Result<_, _>>()?)
        }
        Json::Object(m) => match decode_marker(&m)? {
            Some(v) => v,
            None => Value::Object(map_from_json(m)?),
        },
    })
}

fn decode_marker(m: &serde_json::Map<String, Json>) -> Result<Option<Value>, DbError> {
    if m.len() != 1 {
        return Ok(None);
    }
    let Some((key, v)) = m.iter().next() else { return Ok(None) };
    match key.as_str() {
        DATE_MARKER => decode_date(v).map(Some),
        NUMBER_MARKER => match v.as_str() {
            Some("NaN") => Ok(Some(Value::Number(f64::NAN))),
            Some("Infinity") => Ok(Some(Value::Number(f64::INFINITY))),
            Some("-Infinity") => Ok(Some(Value::Number(f64::NEG_INFINITY))),
            _ => Err(DbError::Format(format!("bad {NUMBER_MARKER} payload: {v}"))),
        },
        _ => Ok(None),
    }
}

fn decode_date(v: &Json) -> Result<Value, DbError> {
    let bad = || DbError::Format(format!("bad {DATE_MARKER} payload: {v}"));
    match v {
        Json::Number(n) => {
            let ms = n.as_i64().ok_or_else(bad)?;
            DateTime::from_timestamp_millis(ms).map(Value::Date).ok_or_else(bad)
        }
        Json::Object(parts) if parts.len() == 2 => {
            let secs = parts.get("s").and_then(Json::as_i64).ok_or_else(bad)?;
            let nanos = parts
                .get("ns")
                .and_then(Json::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| n < 1_000_000_000)
                .ok_or_else(bad)?;
            DateTime::from_timestamp(secs, nanos).map(Value::Date).ok_or_else(bad)
        }
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| Value::Date(d.with_timezone(&Utc)))
            .map_err(|_| bad()),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn one(key: &str, v: Value) -> Document {
        let mut d = Document::new();
        d.insert(key.to_string(), v);
        d
    }

    #[test]
    fn strings_with_newlines_stay_on_one_line() {
        let a = one("test", "With a new\nline".into());
        let line = serialize(&a).unwrap();
        assert!(!line.contains('\n'));
        let b = deserialize(&line).unwrap();
        assert_eq!(b.get("test"), Some(&Value::from("With a new\nline")));
    }

    #[test]
    fn unicode_line_separators_are_escaped() {
        let a = one("test", "a\u{2028}b\u{2029}c\r".into());
        let line = serialize(&a).unwrap();
        assert!(!line.contains(['\u{2028}', '\u{2029}', '\r']));
        assert_eq!(deserialize(&line).unwrap(), a);
    }

    #[test]
    fn scalars_round_trip() {
        for v in [Value::Bool(true), Value::Number(5.0), Value::Number(-0.25), Value::Null] {
            let a = one("test", v.clone());
            assert_eq!(deserialize(&serialize(&a).unwrap()).unwrap().get("test"), Some(&v));
        }
    }

    #[test]
    fn integral_numbers_have_no_fraction() {
        assert_eq!(serialize(&one("n", Value::Number(42.0))).unwrap(), r#"{"n":42}"#);
    }

    #[test]
    fn non_finite_numbers_round_trip() {
        let a = one("n", Value::Array(vec![f64::INFINITY.into(), f64::NEG_INFINITY.into(), f64::NAN.into()]));
        let b = deserialize(&serialize(&a).unwrap()).unwrap();
        let items = b.get("n").and_then(Value::as_array).unwrap();
        assert_eq!(items[0], Value::Number(f64::INFINITY));
        assert_eq!(items[1], Value::Number(f64::NEG_INFINITY));
        assert!(items[2].as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn dates_round_trip_at_full_precision() {
        let ms = Utc.timestamp_millis_opt(72_998_322).unwrap();
        let ns = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        for d in [ms, ns] {
            let a = one("test", Value::Date(d));
            let line = serialize(&a).unwrap();
            assert_eq!(deserialize(&line).unwrap().get("test"), Some(&Value::Date(d)));
        }
        assert_eq!(serialize(&one("d", Value::Date(ms))).unwrap(), r#"{"d":{"$$date":72998322}}"#);
    }

    #[test]
    fn sub_millisecond_dates_past_year_9999_round_trip() {
        let far = Utc.timestamp_opt(253_402_300_805, 123_456_789).unwrap();
        let line = serialize(&one("d", Value::Date(far))).unwrap();
        assert_eq!(line, r#"{"d":{"$$date":{"s":253402300805,"ns":123456789}}}"#);
        assert_eq!(deserialize(&line).unwrap().get("d"), Some(&Value::Date(far)));
        let early = Utc.timestamp_opt(-62_135_596_800, 1).unwrap();
        let back = deserialize(&serialize(&one("d", Value::Date(early))).unwrap()).unwrap();
        assert_eq!(back.get("d"), Some(&Value::Date(early)));
    }

    #[test]
    fn nested_objects_and_arrays_round_trip() {
        let d = Utc.timestamp_millis_opt(1_000).unwrap();
        let mut sub = Map::new();
        sub.insert("something".into(), 39.into());
        sub.insert("also".into(), Value::Date(d));
        sub.insert("yes".into(), Value::from(json!({"again": "yes"})));
        let a = one("test", Value::Array(vec![39.into(), Value::Date(d), Value::Object(sub)]));
        let line = serialize(&a).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(deserialize(&line).unwrap(), a);
    }

    #[test]
    fn key_order_is_preserved() {
        let a = Document::try_from(json!({"z": 1, "a": 2, "m": 3})).unwrap();
        let b = deserialize(&serialize(&a).unwrap()).unwrap();
        let keys: Vec<&String> = b.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn dollar_fields_are_rejected_on_serialize() {
        let a = Document::try_from(json!({"$something": "totest"})).unwrap();
        assert!(matches!(serialize(&a), Err(DbError::Validation(_))));
    }

    #[test]
    fn malformed_text_is_a_format_error() {
        for bad in ["", "{", "[1,2]", "42", r#"{"a":{"$$date":"yesterday"}}"#, r#"{"$x":1}"#,
            r#"{"a":{"$$date":{"s":1,"ns":1000000000}}}"#, r#"{"a":{"$$date":{"s":1.5,"ns":0}}}"#] {
            assert!(matches!(deserialize(bad), Err(DbError::Format(_))), "{bad}");
        }
    }
}
