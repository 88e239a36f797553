use crate::document::Document;
use crate::document::validate::MAX_DOCUMENT_DEPTH;
use crate::errors::DbError;
use crate::types::{Map, Value};

use super::compare::nested_deeper_than;
use super::types::{
    FieldOp, Filter, LogicalOp, MAX_QUERY_DEPTH, Modifier, ModifierOp, Order, SortSpec, UpdateDoc,
};
use super::update::PULL_SLOT;

/// Compiles a query document into a [`Filter`].
///
/// # Errors
/// Returns `DbError::Query` for an unknown `$` operator, a logical operator below the top
/// level of a clause, a logical operator not given an array, or a malformed operand.
pub fn parse_query(query: &Map) -> Result<Filter, DbError> {
    parse_clause(query, 0)
}

/// # Errors
/// Returns `DbError::Query` if the text is not a JSON object or is not a valid query.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let v: serde_json::Value =
        serde_json::from_str(json).map_err(|e| DbError::Query(format!("invalid query JSON: {e}")))?;
    match Value::from(v) {
        Value::Object(m) => parse_query(&m),
        other => Err(DbError::Query(format!("a query must be an object, got {}", other.type_name()))),
    }
}

/// Turns `{ "field": 1 | -1, ... }` into sort keys, first key primary.
///
/// # Errors
/// Returns `DbError::Query` when a direction is anything but `1` or `-1`.
pub fn parse_sort(spec: &Map) -> Result<Vec<SortSpec>, DbError> {
    spec.iter()
        .map(|(field, dir)| {
            let order = match dir.as_f64() {
                Some(d) if d == 1.0 => Order::Asc,
                Some(d) if d == -1.0 => Order::Desc,
                _ => {
                    return Err(DbError::Query(format!(
                        "sort direction for {field} must be 1 or -1"
                    )));
                }
            };
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}

/// Classifies and compiles an update query.
///
/// # Errors
/// Returns `DbError::Modifier` when plain fields and modifiers are mixed, a modifier is
/// unknown, or a modifier argument has the wrong shape.
pub fn parse_update(update: &Map) -> Result<UpdateDoc, DbError> {
    let modifiers = update.keys().filter(|k| k.starts_with('$')).count();
    if modifiers == 0 {
        return Ok(UpdateDoc::Replace(Document::from_map(update.clone())));
    }
    if modifiers != update.len() {
        return Err(DbError::Modifier("you cannot mix modifiers and normal fields".into()));
    }
    let mut out = Vec::new();
    for (key, arg) in update {
        let op = ModifierOp::from_key(key)
            .ok_or_else(|| DbError::Modifier(format!("unknown modifier {key}")))?;
        let Value::Object(fields) = arg else {
            return Err(DbError::Modifier(format!("modifier {key}'s argument must be an object")));
        };
        for (path, v) in fields {
            out.push(parse_modifier(op, key, path, v)?);
        }
    }
    Ok(UpdateDoc::Patch(out))
}

/// # Errors
/// Returns `DbError::Modifier` if the text is not a JSON object or is not a valid update.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    let v: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| DbError::Modifier(format!("invalid update JSON: {e}")))?;
    match Value::from(v) {
        Value::Object(m) => parse_update(&m),
        other => Err(DbError::Modifier(format!(
            "an update must be an object, got {}",
            other.type_name()
        ))),
    }
}

fn parse_clause(query: &Map, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_QUERY_DEPTH {
        return Err(DbError::Query(format!("query nesting exceeds {MAX_QUERY_DEPTH} levels")));
    }
    let mut parts = Vec::with_capacity(query.len());
    for (key, value) in query {
        if key.starts_with('$') {
            let op = LogicalOp::from_key(key)
                .ok_or_else(|| DbError::Query(format!("unknown logical operator {key}")))?;
            parts.push(parse_logical(op, key, value, depth)?);
        } else {
            parts.push(parse_field(key, value)?);
        }
    }
    Ok(match parts.len() {
        0 => Filter::True,
        1 => parts.remove(0),
        _ => Filter::And(parts),
    })
}

fn parse_logical(op: LogicalOp, key: &str, value: &Value, depth: usize) -> Result<Filter, DbError> {
    if op == LogicalOp::Not {
        return match value {
            Value::Object(m) => Ok(Filter::Not(Box::new(parse_clause(m, depth + 1)?))),
            other => Err(DbError::Query(format!(
                "{key} operand must be a query, got {}",
                other.type_name()
            ))),
        };
    }
    let Value::Array(items) = value else {
        return Err(DbError::Query(format!("{key} operator used without an array")));
    };
    let subs = items
        .iter()
        .map(|item| match item {
            Value::Object(m) => parse_clause(m, depth + 1),
            other => Err(DbError::Query(format!(
                "{key} operands must be queries, got {}",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if op == LogicalOp::And { Filter::And(subs) } else { Filter::Or(subs) })
}

/// Compiles the condition on one field. Only an object holding `$` keys is an operator
/// object; any other value, objects included, is a literal matched by deep equality.
pub(crate) fn parse_field(path: &str, value: &Value) -> Result<Filter, DbError> {
    // One extra level for the operator object itself.
    if nested_deeper_than(value, MAX_DOCUMENT_DEPTH + 1) {
        return Err(DbError::Query(format!(
            "value under {path} nests deeper than {MAX_DOCUMENT_DEPTH} levels"
        )));
    }
    match value {
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            parse_operators(path, ops, value)
        }
        other => Ok(Filter::Eq { path: path.to_string(), value: other.clone() }),
    }
}

fn parse_operators(path: &str, ops: &Map, whole: &Value) -> Result<Filter, DbError> {
    if let Some(k) = ops
        .iter()
        .find(|(k, v)| LogicalOp::from_key(k).is_some() && matches!(v, Value::Array(_)))
        .map(|(k, _)| k)
    {
        return Err(DbError::Query(format!(
            "logical operator {k} can only be used at the top level of a query"
        )));
    }
    if ops.keys().any(|k| LogicalOp::from_key(k).is_some()) {
        return Ok(Filter::Eq { path: path.to_string(), value: whole.clone() });
    }
    if let Some(k) = ops.keys().find(|k| !k.starts_with('$')) {
        return Err(DbError::Query(format!(
            "you cannot mix operators and normal fields ({k} under {path})"
        )));
    }
    let mut parts = Vec::with_capacity(ops.len());
    for (key, operand) in ops {
        let op = FieldOp::from_key(key)
            .ok_or_else(|| DbError::Query(format!("unknown comparison operator {key}")))?;
        let path = path.to_string();
        match op {
            FieldOp::Cmp(op) => parts.push(Filter::Cmp { path, op, value: operand.clone() }),
            FieldOp::Ne => parts.push(Filter::Ne { path, value: operand.clone() }),
            FieldOp::In | FieldOp::Nin => {
                let Value::Array(values) = operand else {
                    return Err(DbError::Query(format!("{key} operator called with a non-array")));
                };
                let values = values.clone();
                parts.push(if op == FieldOp::In {
                    Filter::In { path, values }
                } else {
                    Filter::Nin { path, values }
                });
            }
            FieldOp::Exists => parts.push(Filter::Exists { path, exists: truthy(operand) }),
            FieldOp::Size => {
                let size = operand
                    .as_f64()
                    .and_then(crate::utils::num::f64_to_usize_exact)
                    .ok_or_else(|| {
                        DbError::Query("$size operator expects a non-negative integer".into())
                    })?;
                parts.push(Filter::Size { path, size });
            }
            FieldOp::Regex => parts.push(parse_regex(path, operand, ops.get("$options"))?),
            FieldOp::Options => {
                if !ops.contains_key("$regex") {
                    return Err(DbError::Query("$options is only valid alongside $regex".into()));
                }
            }
        }
    }
    Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::And(parts) })
}

#[cfg(feature = "regex")]
fn parse_regex(path: String, pattern: &Value, options: Option<&Value>) -> Result<Filter, DbError> {
    let Value::String(pattern) = pattern else {
        return Err(DbError::Query("$regex operator expects a string pattern".into()));
    };
    let mut builder = regex::RegexBuilder::new(pattern);
    if let Some(options) = options {
        let Value::String(flags) = options else {
            return Err(DbError::Query("$options expects a string of flags".into()));
        };
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                other => return Err(DbError::Query(format!("unsupported $options flag {other}"))),
            }
        }
    }
    let regex = builder.build().map_err(|e| DbError::Query(format!("invalid $regex: {e}")))?;
    Ok(Filter::Regex { path, regex })
}

#[cfg(not(feature = "regex"))]
fn parse_regex(_path: String, _pattern: &Value, _options: Option<&Value>) -> Result<Filter, DbError> {
    Err(DbError::Query("$regex requires the 'regex' feature".into()))
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::String(_) | Value::Date(_) | Value::Array(_) | Value::Object(_) => true,
    }
}

fn parse_modifier(op: ModifierOp, key: &str, path: &str, v: &Value) -> Result<Modifier, DbError> {
    let path = path.to_string();
    Ok(match op {
        ModifierOp::Set => Modifier::Set { path, value: v.clone() },
        ModifierOp::Unset => Modifier::Unset { path },
        ModifierOp::Inc => match v {
            Value::Number(by) => Modifier::Inc { path, by: *by },
            other => {
                return Err(DbError::Modifier(format!(
                    "{key} cannot increment {path} by a {}",
                    other.type_name()
                )));
            }
        },
        ModifierOp::Push => Modifier::Push { values: each_items(key, v)?, path },
        ModifierOp::AddToSet => Modifier::AddToSet { values: each_items(key, v)?, path },
        ModifierOp::Pop => match v {
            Value::Number(n) if !n.is_nan() => {
                let direction = if *n > 0.0 {
                    1
                } else if *n < 0.0 {
                    -1
                } else {
                    0
                };
                Modifier::Pop { path, direction }
            }
            _ => return Err(DbError::Modifier(format!("{key} for {path} expects a number"))),
        },
        ModifierOp::Pull => {
            let filter = parse_field(PULL_SLOT, v).map_err(|e| match e {
                DbError::Query(m) => DbError::Modifier(format!("{key} for {path}: {m}")),
                other => other,
            })?;
            Modifier::Pull { path, filter }
        }
    })
}

/// `{ "$each": [..] }` adds several values; anything else is one value.
fn each_items(key: &str, v: &Value) -> Result<Vec<Value>, DbError> {
    match v {
        Value::Object(m) if m.contains_key("$each") => {
            if m.len() != 1 {
                return Err(DbError::Modifier(format!("{key}: $each cannot be combined with other keys")));
            }
            match m.get("$each") {
                Some(Value::Array(items)) => Ok(items.clone()),
                _ => Err(DbError::Modifier(format!("{key}: $each requires an array"))),
            }
        }
        other => Ok(vec![other.clone()]),
    }
}
