use crate::errors::DbError;
use crate::query::types::MAX_PATH_DEPTH;
use crate::types::{Map, Value};
use std::ops::{Deref, DerefMut};

/// Name of the identity field.
pub const ID_FIELD: &str = "_id";

/// An object value that may carry an `_id`.
///
/// Dereferences to its field [`Map`], so the usual map API is available directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(Map);

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    #[must_use]
    pub const fn from_map(fields: Map) -> Self {
        Self(fields)
    }

    /// The `_id` when it is present and a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Resolves a dot-notation path such as `a.b.c`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        get_path(&self.0, path)
    }

    /// Writes `value` at a dot-notation path, creating missing intermediate objects.
    ///
    /// # Errors
    /// Returns `DbError::Modifier` when an existing intermediate is not an object or the path
    /// is too deep.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), DbError> {
        let (parent, last) = crate::query::update::traverse_to_parent(&mut self.0, path)?;
        parent.insert(last.to_string(), value);
        Ok(())
    }

    /// Removes the value at a dot-notation path and returns it.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = crate::query::update::find_parent(&mut self.0, path)?;
        parent.shift_remove(last)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map {
        &self.0
    }

    #[must_use]
    pub fn into_map(self) -> Map {
        self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Deref for Document {
    type Target = Map;
    fn deref(&self) -> &Map {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Map {
        &mut self.0
    }
}

impl From<Map> for Document {
    fn from(fields: Map) -> Self {
        Self(fields)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = DbError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Object(m) => Ok(Self(m)),
            other => Err(DbError::Format(format!(
                "a document must be an object, got {}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = DbError;
    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        Self::try_from(Value::from(v))
    }
}

/// Walks object levels only; an array or scalar in the middle of the path ends the lookup.
#[must_use]
pub fn get_path<'a>(root: &'a Map, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut cur = root.get(first)?;
    for (depth, part) in parts.enumerate() {
        if depth + 1 >= MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Value::Object(m) => cur = m.get(part)?,
            _ => return None,
        }
    }
    Some(cur)
}
