//! Applies update queries. The input document is never touched; every update works on a
//! copy and either yields the finished result or an error, never a partial result.

use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::types::{Map, Value};

use super::compare::equal;
use super::eval::eval_filter;
use super::parse::parse_update;
use super::types::{Filter, MAX_PATH_DEPTH, Modifier, UpdateDoc};

/// Field name under which `$pull` presents each array element to its filter.
pub(crate) const PULL_SLOT: &str = "v";

/// Produces the document that results from applying `update` to `doc`.
///
/// # Errors
/// Returns `DbError::Modifier` for an invalid update query, an attempt to change `_id`,
/// or a modifier applied to a value of the wrong type.
pub fn modify(doc: &Document, update: &Map) -> Result<Document, DbError> {
    let update = parse_update(update)?;
    apply_update(doc, &update)
}

/// # Errors
/// Same conditions as [`modify`], minus the parsing ones.
pub fn apply_update(doc: &Document, update: &UpdateDoc) -> Result<Document, DbError> {
    match update {
        UpdateDoc::Replace(replacement) => replace(doc, replacement),
        UpdateDoc::Patch(modifiers) => {
            let mut out = doc.clone();
            for m in modifiers {
                apply_modifier(&mut out, m)?;
            }
            if !same_id(doc.get(ID_FIELD), out.get(ID_FIELD)) {
                return Err(DbError::Modifier("you cannot change a document's _id".into()));
            }
            Ok(out)
        }
    }
}

fn replace(doc: &Document, replacement: &Document) -> Result<Document, DbError> {
    if let Some(new_id) = replacement.get(ID_FIELD)
        && !doc.get(ID_FIELD).is_some_and(|old| equal(old, new_id))
    {
        return Err(DbError::Modifier("you cannot change a document's _id".into()));
    }
    let mut out = replacement.clone();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    Ok(out)
}

fn same_id(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => equal(x, y),
        _ => false,
    }
}

fn apply_modifier(doc: &mut Map, m: &Modifier) -> Result<(), DbError> {
    match m {
        Modifier::Set { path, value } => {
            let (parent, last) = traverse_to_parent(doc, path)?;
            parent.insert(last.to_string(), value.clone());
        }
        Modifier::Unset { path } => {
            if let Some((parent, last)) = find_parent(doc, path) {
                parent.shift_remove(last);
            }
        }
        Modifier::Inc { path, by } => {
            let (parent, last) = traverse_to_parent(doc, path)?;
            match parent.get_mut(last) {
                Some(Value::Number(n)) => *n += by,
                Some(other) => {
                    return Err(DbError::Modifier(format!(
                        "don't use the $inc modifier on non-number fields ({path} is a {})",
                        other.type_name()
                    )));
                }
                None => {
                    parent.insert(last.to_string(), Value::Number(*by));
                }
            }
        }
        Modifier::Push { path, values } => {
            array_slot(doc, path, "$push")?.extend(values.iter().cloned());
        }
        Modifier::AddToSet { path, values } => {
            let items = array_slot(doc, path, "$addToSet")?;
            for v in values {
                if !items.iter().any(|x| equal(x, v)) {
                    items.push(v.clone());
                }
            }
        }
        Modifier::Pop { path, direction } => {
            if let Some(items) = existing_array(doc, path, "$pop")? {
                if *direction > 0 {
                    items.pop();
                } else if *direction < 0 && !items.is_empty() {
                    items.remove(0);
                }
            }
        }
        Modifier::Pull { path, filter } => {
            if let Some(items) = existing_array(doc, path, "$pull")? {
                items.retain(|x| !element_matches(x, filter));
            }
        }
    }
    Ok(())
}

/// Walks to the object holding the last path segment, creating missing objects on the way.
pub(crate) fn traverse_to_parent<'a, 'p>(
    root: &'a mut Map,
    path: &'p str,
) -> Result<(&'a mut Map, &'p str), DbError> {
    let mut segs: Vec<&str> = path.split('.').collect();
    if segs.len() > MAX_PATH_DEPTH {
        return Err(DbError::Modifier(format!("path {path} is deeper than {MAX_PATH_DEPTH} levels")));
    }
    let last = segs.pop().unwrap_or_default();
    let mut cur = root;
    for seg in segs {
        let slot = cur.entry(seg.to_string()).or_insert_with(|| Value::Object(Map::new()));
        cur = match slot {
            Value::Object(m) => m,
            other => {
                return Err(DbError::Modifier(format!(
                    "cannot create field {seg} of {path} inside a {}",
                    other.type_name()
                )));
            }
        };
    }
    Ok((cur, last))
}

/// Like [`traverse_to_parent`] but never creates anything; `None` when the path cannot exist.
pub(crate) fn find_parent<'a, 'p>(root: &'a mut Map, path: &'p str) -> Option<(&'a mut Map, &'p str)> {
    let mut segs: Vec<&str> = path.split('.').collect();
    if segs.len() > MAX_PATH_DEPTH {
        return None;
    }
    let last = segs.pop()?;
    let mut cur = root;
    for seg in segs {
        match cur.get_mut(seg) {
            Some(Value::Object(m)) => cur = m,
            _ => return None,
        }
    }
    Some((cur, last))
}

fn array_slot<'a>(doc: &'a mut Map, path: &str, op: &str) -> Result<&'a mut Vec<Value>, DbError> {
    let (parent, last) = traverse_to_parent(doc, path)?;
    match parent.entry(last.to_string()).or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(items) => Ok(items),
        other => Err(DbError::Modifier(format!(
            "can't {op} an element on non-array values ({path} is a {})",
            other.type_name()
        ))),
    }
}

fn existing_array<'a>(
    doc: &'a mut Map,
    path: &str,
    op: &str,
) -> Result<Option<&'a mut Vec<Value>>, DbError> {
    let Some((parent, last)) = find_parent(doc, path) else { return Ok(None) };
    match parent.get_mut(last) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(DbError::Modifier(format!(
            "can't {op} an element on non-array values ({path} is a {})",
            other.type_name()
        ))),
    }
}

fn element_matches(element: &Value, filter: &Filter) -> bool {
    let mut slot = Map::with_capacity(1);
    slot.insert(PULL_SLOT.to_string(), element.clone());
    eval_filter(&slot, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        Document::try_from(v).unwrap()
    }

    fn upd(v: serde_json::Value) -> Map {
        doc(v).into_map()
    }

    #[test]
    fn replacement_keeps_id() {
        let obj = doc(json!({"some": "thing", "_id": "keepit"}));
        let t = modify(&obj, &upd(json!({"replace": "done", "bloup": [1, 8]}))).unwrap();
        assert_eq!(t, doc(json!({"replace": "done", "bloup": [1, 8], "_id": "keepit"})));
        assert!(t.get("some").is_none());
    }

    #[test]
    fn replacement_cannot_change_id() {
        let obj = doc(json!({"some": "thing", "_id": "keepit"}));
        let bad = upd(json!({"replace": "done", "bloup": [1, 8], "_id": "donttryit"}));
        assert!(matches!(modify(&obj, &bad), Err(DbError::Modifier(_))));
        let same = upd(json!({"replace": "done", "bloup": [1, 8], "_id": "keepit"}));
        assert!(modify(&obj, &same).is_ok());
    }

    #[test]
    fn set_changes_fields_without_touching_the_original() {
        let obj = doc(json!({"some": "thing", "yup": "yes", "nay": "noes"}));
        let modified = modify(&obj, &upd(json!({"$set": {"some": "changed", "nay": "yes indeed"}}))).unwrap();
        assert_eq!(modified, doc(json!({"some": "changed", "yup": "yes", "nay": "yes indeed"})));
        assert_eq!(obj, doc(json!({"some": "thing", "yup": "yes", "nay": "noes"})));
    }

    #[test]
    fn set_creates_sub_fields() {
        let obj = doc(json!({"yup": {"subfield": "bloup"}}));
        let u = upd(json!({"$set": {"yup.subfield": "changed", "yup.yop": "yes indeed", "totally.doesnt.exist": "now it does"}}));
        assert_eq!(
            modify(&obj, &u).unwrap(),
            doc(json!({"yup": {"subfield": "changed", "yop": "yes indeed"}, "totally": {"doesnt": {"exist": "now it does"}}}))
        );
    }

    #[test]
    fn set_through_a_scalar_fails() {
        let obj = doc(json!({"a": 5}));
        assert!(matches!(modify(&obj, &upd(json!({"$set": {"a.b": 1}}))), Err(DbError::Modifier(_))));
    }

    #[test]
    fn inc_type_checks() {
        let obj = doc(json!({"some": "thing", "yup": "yes", "nay": 2}));
        assert!(modify(&obj, &upd(json!({"$inc": {"nay": "notanumber"}}))).is_err());
        let obj = doc(json!({"some": "thing", "yup": "yes", "nay": "nope"}));
        assert!(matches!(modify(&obj, &upd(json!({"$inc": {"nay": 1}}))), Err(DbError::Modifier(_))));
    }

    #[test]
    fn inc_increments_or_creates() {
        let obj = doc(json!({"some": "thing", "nay": 40}));
        assert_eq!(modify(&obj, &upd(json!({"$inc": {"nay": 2}}))).unwrap(), doc(json!({"some": "thing", "nay": 42})));
        assert_eq!(
            modify(&obj, &upd(json!({"$inc": {"inexistent": -6}}))).unwrap(),
            doc(json!({"some": "thing", "nay": 40, "inexistent": -6}))
        );
    }

    #[test]
    fn inc_works_on_nested_paths() {
        let obj = doc(json!({"some": "thing", "nay": {"nope": 40}}));
        assert_eq!(
            modify(&obj, &upd(json!({"$inc": {"nay.nope": -2, "blip.blop": 123}}))).unwrap(),
            doc(json!({"some": "thing", "nay": {"nope": 38}, "blip": {"blop": 123}}))
        );
    }

    #[test]
    fn unset_removes_and_ignores_missing() {
        let obj = doc(json!({"a": 1, "b": {"c": 2, "d": 3}}));
        assert_eq!(
            modify(&obj, &upd(json!({"$unset": {"a": true, "b.c": true, "x.y": true}}))).unwrap(),
            doc(json!({"b": {"d": 3}}))
        );
    }

    #[test]
    fn push_and_add_to_set() {
        let obj = doc(json!({"arr": ["hello"]}));
        assert_eq!(modify(&obj, &upd(json!({"$push": {"arr": "world"}}))).unwrap(), doc(json!({"arr": ["hello", "world"]})));
        assert_eq!(modify(&obj, &upd(json!({"$push": {"new": {"a": 1}}}))).unwrap(), doc(json!({"arr": ["hello"], "new": [{"a": 1}]})));
        assert_eq!(
            modify(&obj, &upd(json!({"$push": {"arr": {"$each": ["x", "y"]}}}))).unwrap(),
            doc(json!({"arr": ["hello", "x", "y"]}))
        );
        assert_eq!(
            modify(&obj, &upd(json!({"$addToSet": {"arr": {"$each": ["hello", "x", "x"]}}}))).unwrap(),
            doc(json!({"arr": ["hello", "x"]}))
        );
        let scalar = doc(json!({"arr": "nope"}));
        assert!(matches!(modify(&scalar, &upd(json!({"$push": {"arr": 1}}))), Err(DbError::Modifier(_))));
        assert!(matches!(modify(&scalar, &upd(json!({"$addToSet": {"arr": 1}}))), Err(DbError::Modifier(_))));
    }

    #[test]
    fn pop_both_ends() {
        let obj = doc(json!({"arr": [1, 2, 3, 4]}));
        assert_eq!(modify(&obj, &upd(json!({"$pop": {"arr": 1}}))).unwrap(), doc(json!({"arr": [1, 2, 3]})));
        assert_eq!(modify(&obj, &upd(json!({"$pop": {"arr": -1}}))).unwrap(), doc(json!({"arr": [2, 3, 4]})));
        assert_eq!(modify(&obj, &upd(json!({"$pop": {"arr": 0}}))).unwrap(), obj);
        assert_eq!(modify(&obj, &upd(json!({"$pop": {"missing": 1}}))).unwrap(), obj);
        let scalar = doc(json!({"arr": false}));
        assert!(modify(&scalar, &upd(json!({"$pop": {"arr": 1}}))).is_err());
    }

    #[test]
    fn pull_by_literal_and_by_operator() {
        let obj = doc(json!({"arr": ["hello", "world", "hello", 5, 12]}));
        assert_eq!(
            modify(&obj, &upd(json!({"$pull": {"arr": "hello"}}))).unwrap(),
            doc(json!({"arr": ["world", 5, 12]}))
        );
        assert_eq!(
            modify(&obj, &upd(json!({"$pull": {"arr": {"$gte": 6}}}))).unwrap(),
            doc(json!({"arr": ["hello", "world", "hello", 5]}))
        );
        assert!(modify(&obj, &upd(json!({"$pull": {"arr": {"$bogus": 1}}}))).is_err());
    }

    #[test]
    fn modifiers_combine() {
        let obj = doc(json!({"_id": "x", "n": 1, "tags": []}));
        let out = modify(&obj, &upd(json!({"$inc": {"n": 1}, "$push": {"tags": "a"}, "$set": {"s": "t"}}))).unwrap();
        assert_eq!(out, doc(json!({"_id": "x", "n": 2, "tags": ["a"], "s": "t"})));
    }

    #[test]
    fn patch_cannot_change_id() {
        let obj = doc(json!({"_id": "keepit", "a": 1}));
        assert!(matches!(modify(&obj, &upd(json!({"$set": {"_id": "other"}}))), Err(DbError::Modifier(_))));
        assert!(matches!(modify(&obj, &upd(json!({"$unset": {"_id": true}}))), Err(DbError::Modifier(_))));
        assert!(modify(&obj, &upd(json!({"$set": {"_id": "keepit"}}))).is_ok());
    }
}
