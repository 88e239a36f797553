//! Cross-type equality and the total order used by sorting and range operators.
//!
//! Order between variants: `Null < Number < String < Bool < Date < Array < Object`.
//! Within a variant the natural order applies; arrays compare element-wise then by length,
//! objects compare by their sorted keys and the values under them.
//!
//! Recursion stops at [`MAX_DOCUMENT_DEPTH`]: below that depth values are never equal and
//! always tie. Stored documents and compiled query literals are held to the same limit, so
//! only values from unvalidated sources can reach it.

use crate::document::validate::MAX_DOCUMENT_DEPTH;
use crate::types::{Map, Value};
use std::cmp::Ordering;

/// Deep equality. Arrays compare in order, objects by key set regardless of key order.
/// A value of one variant never equals a value of another.
#[must_use]
pub fn equal(a: &Value, b: &Value) -> bool {
    equal_at(a, b, 0)
}

fn equal_at(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_DOCUMENT_DEPTH {
        return false;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        #[allow(clippy::float_cmp)]
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| equal_at(p, q, depth + 1))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| equal_at(v, w, depth + 1)))
        }
        _ => false,
    }
}

/// Equality where either side may be absent. Absent is never equal to anything,
/// including another absent value.
#[must_use]
pub fn things_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => equal(x, y),
        _ => false,
    }
}

#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    compare_at(a, b, 0)
}

fn compare_at(a: &Value, b: &Value, depth: usize) -> Ordering {
    if depth > MAX_DOCUMENT_DEPTH {
        return Ordering::Equal;
    }
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Number(x), Value::Number(y)) => compare_numbers(*x, *y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_arrays(x, y, depth + 1),
        (Value::Object(x), Value::Object(y)) => compare_objects(x, y, depth + 1),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Order where either side may be absent; absent sorts before every value.
#[must_use]
pub fn compare_options(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// True when both values are of a variant range operators accept, and the same one.
#[must_use]
pub const fn are_comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Date(_), Value::Date(_))
    )
}

const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Bool(_) => 3,
        Value::Date(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

// -0.0 and 0.0 are equal here as they are under `equal`; NaN falls back to the IEEE total order.
fn compare_numbers(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
}

/// True when `v` nests arrays and objects more than `limit` levels deep.
pub(crate) fn nested_deeper_than(v: &Value, limit: usize) -> bool {
    match v {
        Value::Array(items) => limit == 0 || items.iter().any(|c| nested_deeper_than(c, limit - 1)),
        Value::Object(m) => limit == 0 || m.values().any(|c| nested_deeper_than(c, limit - 1)),
        _ => false,
    }
}

fn compare_arrays(x: &[Value], y: &[Value], depth: usize) -> Ordering {
    for (p, q) in x.iter().zip(y) {
        let ord = compare_at(p, q, depth);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    x.len().cmp(&y.len())
}

fn compare_objects(x: &Map, y: &Map, depth: usize) -> Ordering {
    let mut xk: Vec<&String> = x.keys().collect();
    let mut yk: Vec<&String> = y.keys().collect();
    xk.sort_unstable();
    yk.sort_unstable();
    for (kx, ky) in xk.iter().zip(&yk) {
        let ord = kx.cmp(ky).then_with(|| match (x.get(*kx), y.get(*ky)) {
            (Some(p), Some(q)) => compare_at(p, q, depth),
            (p, q) => compare_options(p, q),
        });
        if ord != Ordering::Equal {
            return ord;
        }
    }
    xk.len().cmp(&yk.len())
}
