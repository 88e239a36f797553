use crate::document::get_path;
use crate::errors::DbError;
use crate::types::{Map, Value};
use std::cmp::Ordering;

use super::compare::{are_comparable, compare, compare_options, equal};
use super::parse::parse_query;
use super::types::{CmpOp, Filter, Order, SortSpec};

/// Tests `doc` against a query document.
///
/// # Errors
/// Returns `DbError::Query` when the query is structurally invalid; the outcome never
/// depends on the document in that case.
pub fn match_document(doc: &Map, query: &Map) -> Result<bool, DbError> {
    let filter = parse_query(query)?;
    Ok(eval_filter(doc, &filter))
}

pub fn eval_filter(doc: &Map, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        // An array field matches when any element equals the literal; a literal array is
        // not compared against the field as a whole.
        Filter::Eq { path, value } => get_path(doc, path).is_some_and(|v| match v {
            Value::Array(items) => items.iter().any(|item| equal(item, value)),
            other => equal(other, value),
        }),
        Filter::Cmp { path, op, value } => {
            get_path(doc, path).is_some_and(|v| any_element(v, |x| cmp_matches(x, *op, value)))
        }
        Filter::Ne { path, value } => {
            get_path(doc, path).is_none_or(|v| any_element(v, |x| !equal(x, value)))
        }
        Filter::In { path, values } => {
            get_path(doc, path).is_some_and(|v| any_element(v, |x| is_in_set(x, values)))
        }
        Filter::Nin { path, values } => {
            get_path(doc, path).is_none_or(|v| any_element(v, |x| !is_in_set(x, values)))
        }
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::Size { path, size } => {
            matches!(get_path(doc, path), Some(Value::Array(items)) if items.len() == *size)
        }
        #[cfg(feature = "regex")]
        Filter::Regex { path, regex } => get_path(doc, path)
            .is_some_and(|v| any_element(v, |x| x.as_str().is_some_and(|s| regex.is_match(s)))),
    }
}

/// Orders two documents by successive sort keys; the first key is primary.
pub fn compare_docs(a: &Map, b: &Map, sort: &[SortSpec]) -> Ordering {
    for s in sort {
        let ord = compare_options(get_path(a, &s.field), get_path(b, &s.field));
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

fn any_element(v: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match v {
        Value::Array(items) => items.iter().any(pred),
        other => pred(other),
    }
}

fn cmp_matches(v: &Value, op: CmpOp, bound: &Value) -> bool {
    if !are_comparable(v, bound) || is_nan(v) || is_nan(bound) {
        return false;
    }
    let c = compare(v, bound);
    match op {
        CmpOp::Gt => c == Ordering::Greater,
        CmpOp::Gte => c != Ordering::Less,
        CmpOp::Lt => c == Ordering::Less,
        CmpOp::Lte => c != Ordering::Greater,
    }
}

// Range operators use IEEE ordering, under which NaN is unordered with everything.
fn is_nan(v: &Value) -> bool {
    matches!(v, Value::Number(n) if n.is_nan())
}

fn is_in_set(v: &Value, set: &[Value]) -> bool {
    set.iter().any(|x| equal(x, v))
}
