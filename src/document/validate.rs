//! Key-shape rules for stored documents.
//!
//! Dot paths and `$` operators are query and update syntax, so a stored field name may
//! neither start with `$` nor contain `.`. Strings inside arrays are values, not field
//! names, and are never checked.

use super::core::Document;
use crate::errors::DbError;
use crate::types::{Map, Value};

/// Maximum nesting of arrays and objects accepted in a stored document.
pub const MAX_DOCUMENT_DEPTH: usize = 64;

/// # Errors
/// Returns `DbError::Validation` on the first forbidden key, or when nesting exceeds
/// [`MAX_DOCUMENT_DEPTH`].
pub fn check_object(value: &Value) -> Result<(), DbError> {
    check_value(value, 0)
}

/// # Errors
/// Same conditions as [`check_object`].
pub fn check_document(doc: &Document) -> Result<(), DbError> {
    check_map(doc.as_map(), 0)
}

fn check_value(value: &Value, depth: usize) -> Result<(), DbError> {
    match value {
        Value::Object(m) => check_map(m, depth),
        Value::Array(items) => {
            if depth >= MAX_DOCUMENT_DEPTH {
                return Err(too_deep());
            }
            items.iter().try_for_each(|v| check_value(v, depth + 1))
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Date(_) => {
            Ok(())
        }
    }
}

fn check_map(map: &Map, depth: usize) -> Result<(), DbError> {
    if depth >= MAX_DOCUMENT_DEPTH {
        return Err(too_deep());
    }
    for (k, v) in map {
        check_key(k)?;
        check_value(v, depth + 1)?;
    }
    Ok(())
}

fn check_key(key: &str) -> Result<(), DbError> {
    if key.starts_with('$') {
        return Err(DbError::Validation(format!("field names cannot begin with the $ character: {key}")));
    }
    if key.contains('.') {
        return Err(DbError::Validation(format!("field names cannot contain a .: {key}")));
    }
    Ok(())
}

fn too_deep() -> DbError {
    DbError::Validation(format!("document nesting exceeds {MAX_DOCUMENT_DEPTH} levels"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dollar_prefixed_names_are_forbidden() {
        assert!(check_object(&json!({"$bad": true}).into()).is_err());
        assert!(check_object(&json!({"some": 42, "nested": {"again": "no", "$worse": true}}).into()).is_err());
    }

    #[test]
    fn dollar_strings_inside_arrays_are_values() {
        let ok = json!({"some": 42, "nested": [5, "no", "$actuallyok", true]});
        assert!(check_object(&ok.into()).is_ok());
        let hidden = json!({"some": 42, "nested": [5, "no", "$actuallyok", true, {"$hidden": "useless"}]});
        assert!(matches!(check_object(&hidden.into()), Err(DbError::Validation(_))));
    }

    #[test]
    fn dotted_names_are_forbidden() {
        assert!(matches!(check_object(&json!({"so.bad": true}).into()), Err(DbError::Validation(_))));
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let mut v = Value::Null;
        for _ in 0..=MAX_DOCUMENT_DEPTH {
            v = Value::Array(vec![v]);
        }
        let mut m = Map::new();
        m.insert("deep".into(), v);
        assert!(check_object(&Value::Object(m)).is_err());
    }
}
