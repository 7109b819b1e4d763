//! Bot response module.
//!
//! - `model`: Response, ResponseVariant, ResponseBlock and the shared ResponseCatalog
//! - `codec`: structured-text encoding of block content
//! - `sequence`: copy-on-write sequence edits addressed by `(key, lang)`

pub mod codec;
pub mod model;
pub mod sequence;

pub use codec::{Button, ResponseContent, TemplateKind};
pub use model::{Response, ResponseBlock, ResponseCatalog, ResponseVariant};
pub use sequence::{
    change_response, create_response, create_sequence, delete_response, find_variant,
    next_response_key, update_sequence, update_sequence_or_keep,
};
