use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A stored document carries a forbidden key (`$` prefix or `.`).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A serialized line is not a well-formed document encoding.
    #[error("Format error: {0}")]
    Format(String),

    /// A query is structurally invalid.
    #[error("Query error: {0}")]
    Query(String),

    /// An update query is structurally invalid or cannot be applied.
    #[error("Modifier error: {0}")]
    Modifier(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
