//! Bottom-up aggregation of validation counts over a story's branch tree.

use serde::Serialize;
use tracing::warn;

use super::validator::{Diagnostic, Severity, StoryValidator, ValidationCounts};
use crate::story::markdown::render_lines;
use crate::story::{Story, StoryLine};

/// Validation results for one story and everything below it.
///
/// `total` is `own` plus the totals of all branches, so the root's total is
/// what the top menu shows and each branch's total is what its tab shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationTree {
    pub story_id: String,
    pub own: ValidationCounts,
    pub total: ValidationCounts,
    pub diagnostics: Vec<Diagnostic>,
    pub branches: Vec<ValidationTree>,
}

impl ValidationTree {
    /// Validates `story` and all its branches.
    pub fn build(story: &Story, validator: &dyn StoryValidator) -> Self {
        let (own, diagnostics) = validate_one(story, validator);
        let branches: Vec<ValidationTree> = story
            .branches
            .iter()
            .map(|b| ValidationTree::build(b, validator))
            .collect();
        let total = branches.iter().fold(own, |acc, b| acc + b.total);
        Self {
            story_id: story.id.clone(),
            own,
            total,
            diagnostics,
            branches,
        }
    }

    /// Finds the node for a story or branch id.
    pub fn find(&self, story_id: &str) -> Option<&ValidationTree> {
        if self.story_id == story_id {
            return Some(self);
        }
        self.branches.iter().find_map(|b| b.find(story_id))
    }

    /// Subtree total for a story or branch, zero when the id is unknown.
    pub fn total_for(&self, story_id: &str) -> ValidationCounts {
        self.find(story_id).map(|n| n.total).unwrap_or_default()
    }
}

/// Validates a single story, ignoring its branches.
///
/// A story without any user line has nothing to trigger it and counts as
/// clean. A validator failure counts as one error for the story.
fn validate_one(story: &Story, validator: &dyn StoryValidator) -> (ValidationCounts, Vec<Diagnostic>) {
    if !story.lines.iter().any(|line| matches!(line, StoryLine::User(_))) {
        return (ValidationCounts::default(), Vec::new());
    }
    match validator.validate(&render_lines(story)) {
        Ok(report) => (report.counts(), report.diagnostics),
        Err(err) => {
            warn!(story_id = %story.id, error = %err, "Story validation failed");
            let diagnostic = Diagnostic {
                line: 0,
                severity: Severity::Error,
                message: err.to_string(),
            };
            (ValidationCounts::new(1, 0), vec![diagnostic])
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
