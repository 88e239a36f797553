//! Embedded document store core: a dynamic value model, a line-oriented serializer,
//! a query matcher, update modifiers and a cursor over pluggable candidate sources.

pub mod collection;
pub mod document;
pub mod errors;
pub mod logger;
pub mod query;
pub mod types;
pub mod utils;

pub use collection::Collection;
pub use document::Document;
pub use errors::DbError;
pub use types::{Map, Value};

/// Initializes logging from the `NEXUSDOC_LOG_*` environment.
///
/// Call once, before any other operation, from binaries that want log output.
///
/// # Errors
/// Returns `DbError::Config` when a logger is already installed or the log directory is unusable.
pub fn init() -> Result<(), DbError> {
    logger::configure_from_env()
}
