//! Project document module.
//!
//! Provides the CRDT-based collaborative document holding a project's stories
//! and responses.

pub mod manager;
pub mod model;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use manager::ProjectManager;
pub use model::ProjectRoot;

#[cfg(feature = "wasm")]
pub use wasm::JsProjectManager;
