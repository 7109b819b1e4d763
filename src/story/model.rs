//! Data models for stories and their lines.
//!
//! Lines are tagged variants serialized as `{type, data}`. Autosurgeon derives
//! let a whole story tree live inside the project document.

use autosurgeon::{Hydrate, Reconcile};
use serde::{Deserialize, Serialize};

use crate::error::{CollabError, CollabResult};

// =============================================================================
// UTTERANCE
// =============================================================================

/// An entity recognized in a user utterance.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub entity: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl Entity {
    /// Creates an entity without character offsets.
    pub fn new(entity: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            value: value.into(),
            start: None,
            end: None,
        }
    }
}

/// A single user input: an intent plus the entities found in it.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Utterance {
    /// Creates an utterance for the given intent.
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            ..Default::default()
        }
    }

    /// Builder: Set example text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: Add an entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }
}

// =============================================================================
// LINE PAYLOADS
// =============================================================================

/// Reference to a named response in the catalog.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct BotLine {
    pub name: String,
}

/// A custom action invocation.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct ActionLine {
    pub name: String,
}

/// A slot being set. `None` clears the slot.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct SlotLine {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

// =============================================================================
// STORY LINE
// =============================================================================

/// One line of a story.
///
/// The variant tag never changes once a line is in a story; edits replace the
/// payload of a line of the same kind.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StoryLine {
    /// User turn. `None` while the utterance is still being typed.
    User(Option<Utterance>),
    Bot(BotLine),
    Action(ActionLine),
    Slot(SlotLine),
}

impl StoryLine {
    /// User line holding one utterance.
    pub fn user(utterance: Utterance) -> Self {
        Self::User(Some(utterance))
    }

    /// Bot line referencing a response by key.
    pub fn bot(name: impl Into<String>) -> Self {
        Self::Bot(BotLine { name: name.into() })
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::Action(ActionLine { name: name.into() })
    }

    pub fn slot(name: impl Into<String>, value: Option<String>) -> Self {
        Self::Slot(SlotLine {
            name: name.into(),
            value,
        })
    }

    /// Variant tag as it appears in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Bot(_) => "bot",
            Self::Action(_) => "action",
            Self::Slot(_) => "slot",
        }
    }

    /// True for user lines carrying an intent.
    pub fn has_intent(&self) -> bool {
        matches!(self, Self::User(Some(u)) if !u.intent.trim().is_empty())
    }
}

// =============================================================================
// LINE CHANGE
// =============================================================================

/// What a line mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Replaced,
    Deleted,
}

/// A discrete, cursor-addressable change produced by every line mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    pub kind: ChangeKind,
    pub index: usize,
}

impl LineChange {
    /// Insertion position just after the affected line.
    ///
    /// For deletions this is the slot the removed line occupied.
    pub fn cursor(&self) -> usize {
        match self.kind {
            ChangeKind::Inserted | ChangeKind::Replaced => self.index + 1,
            ChangeKind::Deleted => self.index,
        }
    }
}

// =============================================================================
// STORY
// =============================================================================

/// An ordered conversation flow with optional child branches.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Story {
    #[key]
    pub id: String,
    pub title: String,
    pub lines: Vec<StoryLine>,
    pub branches: Vec<Story>,
}

impl Story {
    /// Creates an empty story.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Creates an empty story with a random id.
    pub fn with_random_id(title: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), title)
    }

    /// Builder: Append a line.
    pub fn with_line(mut self, line: StoryLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Builder: Append a branch.
    pub fn with_branch(mut self, branch: Story) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Inserts `line` before `index`; `index == len` appends.
    pub fn insert_line(&mut self, index: usize, line: StoryLine) -> CollabResult<LineChange> {
        if index > self.lines.len() {
            return Err(CollabError::index_out_of_range(index, self.lines.len()));
        }
        self.lines.insert(index, line);
        Ok(LineChange {
            kind: ChangeKind::Inserted,
            index,
        })
    }

    /// Replaces the payload of the line at `index`, keeping its kind.
    pub fn replace_line(&mut self, index: usize, line: StoryLine) -> CollabResult<LineChange> {
        let length = self.lines.len();
        let current = self
            .lines
            .get_mut(index)
            .ok_or_else(|| CollabError::index_out_of_range(index, length))?;
        if current.kind() != line.kind() {
            return Err(CollabError::line_kind_mismatch(
                index,
                current.kind(),
                line.kind(),
            ));
        }
        *current = line;
        Ok(LineChange {
            kind: ChangeKind::Replaced,
            index,
        })
    }

    /// Removes the line at `index`.
    pub fn delete_line(&mut self, index: usize) -> CollabResult<LineChange> {
        if index >= self.lines.len() {
            return Err(CollabError::index_out_of_range(index, self.lines.len()));
        }
        self.lines.remove(index);
        Ok(LineChange {
            kind: ChangeKind::Deleted,
            index,
        })
    }

    /// Finds this story or a descendant branch by id.
    pub fn find(&self, id: &str) -> Option<&Story> {
        if self.id == id {
            return Some(self);
        }
        self.branches.iter().find_map(|b| b.find(id))
    }

    /// Mutable counterpart of [`Story::find`].
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Story> {
        if self.id == id {
            return Some(self);
        }
        self.branches.iter_mut().find_map(|b| b.find_mut(id))
    }

    /// Adds a branch under the story (or branch) `parent_id`.
    pub fn add_branch(&mut self, parent_id: &str, branch: Story) -> CollabResult<()> {
        let parent = self
            .find_mut(parent_id)
            .ok_or_else(|| CollabError::story_not_found(parent_id))?;
        parent.branches.push(branch);
        Ok(())
    }

    /// Removes a descendant branch and everything below it.
    pub fn remove_branch(&mut self, branch_id: &str) -> CollabResult<Story> {
        if let Some(pos) = self.branches.iter().position(|b| b.id == branch_id) {
            return Ok(self.branches.remove(pos));
        }
        for branch in &mut self.branches {
            if branch.find(branch_id).is_some() {
                return branch.remove_branch(branch_id);
            }
        }
        Err(CollabError::story_not_found(branch_id))
    }

    /// Total number of stories in the tree, this one included.
    pub fn tree_size(&self) -> usize {
        1 + self.branches.iter().map(Story::tree_size).sum::<usize>()
    }
}

// =============================================================================
// TESTS
// =============================================================================
