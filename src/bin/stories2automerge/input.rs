//! Input structs for parsing a project export.
//!
//! Stories come in their markdown form, one `story` string per story or
//! branch. Ids use the `_id` field name of the export.

use serde::Deserialize;

use storycollab::response::Response;

// =============================================================================
// ROOT PROJECT
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProject {
    #[serde(rename = "_id")]
    pub id: String,

    pub default_language: Option<String>,

    #[serde(default)]
    pub stories: Vec<InputStory>,

    /// Responses already have the document shape.
    #[serde(default)]
    pub responses: Vec<Response>,
}

// =============================================================================
// STORIES
// =============================================================================

/// A story or branch with its markdown body.
#[derive(Debug, Deserialize)]
pub struct InputStory {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub story: String,

    #[serde(default)]
    pub branches: Vec<InputStory>,
}

impl InputStory {
    /// Number of stories in this tree, the story itself included.
    pub fn tree_size(&self) -> usize {
        1 + self.branches.iter().map(InputStory::tree_size).sum::<usize>()
    }
}
