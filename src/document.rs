//! Documents, their line encoding and the key-shape rules enforced before persistence.

pub mod codec;
pub mod core;
pub mod validate;

pub use codec::{deserialize, serialize};
pub use self::core::{Document, ID_FIELD, get_path};
pub use validate::{check_document, check_object};
