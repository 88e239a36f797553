use crate::document::Document;
use crate::types::Value;

// Safety limits to keep recursive walks bounded
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_QUERY_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Sort and pagination accumulated by a `Cursor`.
///
/// A `limit` or `skip` of zero means "none", as does `None`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Clause-level operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(Self::And),
            "$or" => Some(Self::Or),
            "$not" => Some(Self::Not),
            _ => None,
        }
    }
}

/// Operators accepted inside a field's operator object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Cmp(CmpOp),
    Ne,
    In,
    Nin,
    Exists,
    Regex,
    Options,
    Size,
}

impl FieldOp {
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$lt" => Self::Cmp(CmpOp::Lt),
            "$lte" => Self::Cmp(CmpOp::Lte),
            "$gt" => Self::Cmp(CmpOp::Gt),
            "$gte" => Self::Cmp(CmpOp::Gte),
            "$ne" => Self::Ne,
            "$in" => Self::In,
            "$nin" => Self::Nin,
            "$exists" => Self::Exists,
            "$regex" => Self::Regex,
            "$options" => Self::Options,
            "$size" => Self::Size,
            _ => return None,
        })
    }
}

/// A compiled query.
#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// Literal under a field: deep equality, or membership when the field is an array.
    Eq { path: String, value: Value },
    Cmp { path: String, op: CmpOp, value: Value },
    Ne { path: String, value: Value },
    In { path: String, values: Vec<Value> },
    Nin { path: String, values: Vec<Value> },
    Exists { path: String, exists: bool },
    Size { path: String, size: usize },
    #[cfg(feature = "regex")]
    Regex { path: String, regex: regex::Regex },
}

/// Update modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierOp {
    Set,
    Unset,
    Inc,
    Push,
    AddToSet,
    Pop,
    Pull,
}

impl ModifierOp {
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$set" => Some(Self::Set),
            "$unset" => Some(Self::Unset),
            "$inc" => Some(Self::Inc),
            "$push" => Some(Self::Push),
            "$addToSet" => Some(Self::AddToSet),
            "$pop" => Some(Self::Pop),
            "$pull" => Some(Self::Pull),
            _ => None,
        }
    }
}

/// A single per-path transform of a patch update.
#[derive(Debug, Clone)]
pub enum Modifier {
    Set { path: String, value: Value },
    Unset { path: String },
    Inc { path: String, by: f64 },
    Push { path: String, values: Vec<Value> },
    AddToSet { path: String, values: Vec<Value> },
    /// Positive removes the last element, negative the first, zero leaves the array alone.
    Pop { path: String, direction: i8 },
    /// Removes every element the filter accepts; the filter reads the element at `PULL_SLOT`.
    Pull { path: String, filter: Filter },
}

/// A compiled update query.
#[derive(Debug, Clone)]
pub enum UpdateDoc {
    Replace(Document),
    Patch(Vec<Modifier>),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub multi: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}
