//! In-memory document collection: the candidate source behind `find`, with optional
//! exact-match indexes and line-oriented dump/load through the serializer.

mod core;
mod index;
mod index_admin;
mod ops;

pub use self::core::Collection;
pub use index::{HashIndex, IndexKey, IndexStats, key_from_value};
