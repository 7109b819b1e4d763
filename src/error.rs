//! Error types for story, response and project document operations.

use thiserror::Error;

/// Result type alias for collab operations.
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors that can occur while editing stories, responses and project documents.
#[derive(Error, Debug)]
pub enum CollabError {
    /// Automerge error during document operations.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// Line or block index outside the current bounds.
    #[error("Index {index} out of range for sequence of length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// A replacement line must keep the kind of the line it replaces.
    #[error("Line {index} is a {expected} line, cannot replace it with a {found} line")]
    LineKindMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// A story must keep at least one line.
    #[error("Cannot delete the last remaining line of story {0}")]
    LastRemainingLine(String),

    /// Story (or branch) not found in the project.
    #[error("Story not found: {0}")]
    StoryNotFound(String),

    /// No response variant for the given key and language.
    #[error("Response not found: {key} ({lang})")]
    NotFound { key: String, lang: String },

    /// Backend call rejected; local state has been reverted.
    #[error("Remote operation {operation} failed: {message}")]
    RemoteOperationFailed {
        operation: &'static str,
        message: String,
    },

    /// Operation refused in the current editor state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CollabError {
    /// Creates an IndexOutOfRange error.
    pub fn index_out_of_range(index: usize, length: usize) -> Self {
        Self::IndexOutOfRange { index, length }
    }

    /// Creates a LineKindMismatch error.
    pub fn line_kind_mismatch(index: usize, expected: &'static str, found: &'static str) -> Self {
        Self::LineKindMismatch {
            index,
            expected,
            found,
        }
    }

    /// Creates a StoryNotFound error.
    pub fn story_not_found(id: impl Into<String>) -> Self {
        Self::StoryNotFound(id.into())
    }

    /// Creates a NotFound error for a response variant.
    pub fn not_found(key: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.into(),
            lang: lang.into(),
        }
    }

    /// Creates a RemoteOperationFailed error.
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteOperationFailed {
            operation,
            message: message.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Creates a Serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_yaml::Error> for CollabError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for CollabError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
