//! Story editing session.
//!
//! `StoryEditor` owns one story tree (root plus branches), the "add line here"
//! insertion point, and validation results that are rebuilt after every
//! structural change.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{LineChange, Story, StoryLine, Utterance};
use crate::config::EditorConfig;
use crate::error::{CollabError, CollabResult};
use crate::response::{self, ResponseCatalog, TemplateKind};
use crate::validation::{MarkdownValidator, StoryValidator, ValidationTree};

// =============================================================================
// INSERTION POINT
// =============================================================================

/// Where the "add line" control is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum InsertionPoint {
    #[default]
    Closed,
    /// Open in story `story_id`, inserting before line `index`.
    Open { story_id: String, index: usize },
}

/// Where focus went when the insertion control lost it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// Inside the insertion control itself.
    Editor,
    /// A modal or popup opened from the control.
    Overlay,
    /// A text input.
    Input,
    Outside,
}

// =============================================================================
// STORY EDITOR
// =============================================================================

/// Editing session over a story and its branches.
pub struct StoryEditor {
    story: Story,
    insertion: InsertionPoint,
    last_change: Option<LineChange>,
    validator: Box<dyn StoryValidator>,
    validation: ValidationTree,
    response_prefix: String,
}

impl StoryEditor {
    /// Creates an editor using the default markdown validator.
    pub fn new(story: Story) -> Self {
        Self::with_validator(story, Box::new(MarkdownValidator::new()))
    }

    /// Creates an editor with a custom validator.
    pub fn with_validator(story: Story, validator: Box<dyn StoryValidator>) -> Self {
        let validation = ValidationTree::build(&story, validator.as_ref());
        Self {
            story,
            insertion: InsertionPoint::Closed,
            last_change: None,
            validator,
            validation,
            response_prefix: EditorConfig::default().new_response_prefix,
        }
    }

    /// Applies editor settings (the prefix for auto-named responses).
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.response_prefix = config.new_response_prefix.clone();
        self
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Consumes the editor, returning the edited story.
    pub fn into_story(self) -> Story {
        self.story
    }

    pub fn insertion(&self) -> &InsertionPoint {
        &self.insertion
    }

    /// The most recent line mutation, for refocusing.
    pub fn last_change(&self) -> Option<LineChange> {
        self.last_change
    }

    pub fn validation(&self) -> &ValidationTree {
        &self.validation
    }

    /// Swaps the validator and revalidates.
    pub fn set_validator(&mut self, validator: Box<dyn StoryValidator>) {
        self.validator = validator;
        self.revalidate();
    }

    fn revalidate(&mut self) {
        self.validation = ValidationTree::build(&self.story, self.validator.as_ref());
    }

    fn target(&self, story_id: &str) -> CollabResult<&Story> {
        self.story
            .find(story_id)
            .ok_or_else(|| CollabError::story_not_found(story_id))
    }

    fn target_mut(&mut self, story_id: &str) -> CollabResult<&mut Story> {
        self.story
            .find_mut(story_id)
            .ok_or_else(|| CollabError::story_not_found(story_id))
    }

    // =========================================================================
    // INSERTION POINT
    // =========================================================================

    /// Opens the insertion control before line `index` of `story_id`.
    pub fn open_insertion(&mut self, story_id: &str, index: usize) -> CollabResult<()> {
        let len = self.target(story_id)?.len();
        if index > len {
            return Err(CollabError::index_out_of_range(index, len));
        }
        self.insertion = InsertionPoint::Open {
            story_id: story_id.to_string(),
            index,
        };
        Ok(())
    }

    /// Focus left the insertion control.
    pub fn blur(&mut self, target: FocusTarget) {
        if target == FocusTarget::Outside {
            self.insertion = InsertionPoint::Closed;
        }
    }

    // =========================================================================
    // LINE OPERATIONS
    // =========================================================================

    fn commit(&mut self, change: LineChange) -> LineChange {
        self.insertion = InsertionPoint::Closed;
        self.last_change = Some(change);
        self.revalidate();
        change
    }

    /// Inserts `line` before `index` of `story_id`.
    pub fn insert_line(&mut self, story_id: &str, index: usize, line: StoryLine) -> CollabResult<LineChange> {
        let change = self.target_mut(story_id)?.insert_line(index, line)?;
        Ok(self.commit(change))
    }

    /// Replaces line `index` of `story_id` with a line of the same kind.
    pub fn replace_line(&mut self, story_id: &str, index: usize, line: StoryLine) -> CollabResult<LineChange> {
        let change = self.target_mut(story_id)?.replace_line(index, line)?;
        Ok(self.commit(change))
    }

    /// Whether lines of `story_id` may be deleted: a story keeps at least one.
    pub fn is_deletable(&self, story_id: &str) -> bool {
        self.story.find(story_id).map(|s| s.len() > 1).unwrap_or(false)
    }

    /// Deletes line `index` of `story_id`, refusing to remove the last line.
    pub fn delete_line(&mut self, story_id: &str, index: usize) -> CollabResult<LineChange> {
        let story = self.target_mut(story_id)?;
        if story.len() == 1 && index == 0 {
            return Err(CollabError::LastRemainingLine(story_id.to_string()));
        }
        let change = story.delete_line(index)?;
        Ok(self.commit(change))
    }

    pub fn create_user_utterance(
        &mut self,
        story_id: &str,
        index: usize,
        utterance: Option<Utterance>,
    ) -> CollabResult<LineChange> {
        self.insert_line(story_id, index, StoryLine::User(utterance))
    }

    pub fn change_user_utterance(
        &mut self,
        story_id: &str,
        index: usize,
        utterance: Utterance,
    ) -> CollabResult<LineChange> {
        self.replace_line(story_id, index, StoryLine::user(utterance))
    }

    pub fn create_action(&mut self, story_id: &str, index: usize, name: &str) -> CollabResult<LineChange> {
        self.insert_line(story_id, index, StoryLine::action(name))
    }

    pub fn change_action(&mut self, story_id: &str, index: usize, name: &str) -> CollabResult<LineChange> {
        self.replace_line(story_id, index, StoryLine::action(name))
    }

    pub fn create_slot(
        &mut self,
        story_id: &str,
        index: usize,
        name: &str,
        value: Option<String>,
    ) -> CollabResult<LineChange> {
        self.insert_line(story_id, index, StoryLine::slot(name, value))
    }

    pub fn change_slot(
        &mut self,
        story_id: &str,
        index: usize,
        name: &str,
        value: Option<String>,
    ) -> CollabResult<LineChange> {
        self.replace_line(story_id, index, StoryLine::slot(name, value))
    }

    /// Creates an auto-named response from `template` and inserts a bot line
    /// referencing it before `index`.
    ///
    /// Returns the catalog holding the new response; on error neither the
    /// story nor the catalog changes.
    pub fn create_sequence(
        &mut self,
        story_id: &str,
        index: usize,
        catalog: &ResponseCatalog,
        lang: &str,
        template: TemplateKind,
    ) -> CollabResult<ResponseCatalog> {
        let len = self.target(story_id)?.len();
        if index > len {
            return Err(CollabError::index_out_of_range(index, len));
        }
        let (updated, key) = response::create_sequence(catalog, &self.response_prefix, lang, template)?;
        debug!(story_id, key = %key, "Created response for new bot line");
        self.insert_line(story_id, index, StoryLine::bot(key))?;
        Ok(updated)
    }

    // =========================================================================
    // BRANCHES
    // =========================================================================

    /// Adds an empty branch under `parent_id`, returning its id.
    pub fn add_branch(&mut self, parent_id: &str, title: &str) -> CollabResult<String> {
        let branch = Story::with_random_id(title);
        let id = branch.id.clone();
        self.story.add_branch(parent_id, branch)?;
        self.revalidate();
        Ok(id)
    }

    /// Removes a branch and its descendants.
    pub fn remove_branch(&mut self, branch_id: &str) -> CollabResult<Story> {
        let removed = self.story.remove_branch(branch_id)?;
        let inside_removed = matches!(
            &self.insertion,
            InsertionPoint::Open { story_id, .. } if removed.find(story_id).is_some()
        );
        if inside_removed {
            self.insertion = InsertionPoint::Closed;
        }
        self.revalidate();
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
