//! Backend calls the editors delegate persistence to.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::activity::{ActivityItem, ActivityPatch};
use crate::error::CollabError;

/// A backend call that did not succeed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The backend answered and refused the call.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The call never got an answer.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Converts into the crate error for `operation`.
    pub fn into_collab(self, operation: &'static str) -> CollabError {
        CollabError::remote(operation, self.to_string())
    }
}

/// Remote procedures used by the rules editor and the activity feed.
///
/// Each call either succeeds or fails; callers have already updated local
/// state and roll it back on failure.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn update_rules(&self, project_id: &str, story_id: &str, rules: &Value) -> Result<(), RemoteError>;

    async fn delete_rules(&self, project_id: &str, story_id: &str) -> Result<(), RemoteError>;

    async fn insert_examples(&self, model_id: &str, examples: &[ActivityItem]) -> Result<(), RemoteError>;

    async fn upsert_activity(&self, model_id: &str, patches: &[ActivityPatch]) -> Result<(), RemoteError>;

    async fn delete_activity(&self, model_id: &str, ids: &[String]) -> Result<(), RemoteError>;

    /// Parses the utterances again with the current model.
    async fn reinterpret(
        &self,
        model_id: &str,
        lang: &str,
        items: &[ActivityItem],
    ) -> Result<Vec<ActivityItem>, RemoteError>;
}
