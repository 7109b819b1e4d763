//! Core ProjectManager implementation.
//!
//! This module provides the `ProjectManager` struct that wraps an Automerge
//! document holding a whole project (stories with their branch trees and the
//! response catalog) and exposes the story and response operations on it.
//! Every mutation goes through `update_state`, which applies the change to a
//! copy and reconciles only when the change succeeded.

use automerge::{AutoCommit, ChangeHash};
use autosurgeon::{hydrate, reconcile};
use tracing::debug;

use super::model::ProjectRoot;
use crate::error::{CollabError, CollabResult};
use crate::response::{self, ResponseBlock, ResponseCatalog, ResponseContent, TemplateKind};
use crate::story::{LineChange, Story, StoryLine};
use crate::validation::{StoryValidator, ValidationTree};

/// The collaborative document manager for a chatbot project.
///
/// # Caching Strategy
///
/// `cached_state` holds the last hydrated `ProjectRoot`. It is replaced after
/// each successful update and dropped on load, merge and sync.
pub struct ProjectManager {
    doc: AutoCommit,
    /// Cached hydrated state - invalidated after merge/sync.
    cached_state: Option<ProjectRoot>,
}

impl ProjectManager {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates a manager for a new, empty project.
    pub fn new(project_id: &str, default_language: &str) -> CollabResult<Self> {
        Self::from_root(ProjectRoot::new(project_id, default_language))
    }

    /// Creates a manager whose document starts from `root`.
    pub fn from_root(root: ProjectRoot) -> CollabResult<Self> {
        let mut doc = AutoCommit::new();
        reconcile(&mut doc, &root)?;
        Ok(Self {
            doc,
            cached_state: Some(root),
        })
    }

    /// Creates a ProjectManager from saved binary data.
    pub fn from_bytes(bytes: &[u8]) -> CollabResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        Ok(Self {
            doc,
            cached_state: None,
        })
    }

    /// Saves the document to binary format.
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Returns the current heads (for sync protocol).
    pub fn get_heads(&mut self) -> Vec<ChangeHash> {
        self.doc.get_heads()
    }

    /// Gets the actor ID for this document instance.
    pub fn actor_id(&self) -> String {
        self.doc.get_actor().to_hex_string()
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Hydrates the entire document state to Rust structs.
    pub fn get_state(&mut self) -> CollabResult<ProjectRoot> {
        if let Some(ref cached) = self.cached_state {
            return Ok(cached.clone());
        }
        let state: ProjectRoot = hydrate(&self.doc)?;
        self.cached_state = Some(state.clone());
        Ok(state)
    }

    /// Applies a fallible change to a copy of the state and reconciles it.
    ///
    /// When `f` fails the document is left untouched.
    pub fn update_state<F, R>(&mut self, f: F) -> CollabResult<R>
    where
        F: FnOnce(&mut ProjectRoot) -> CollabResult<R>,
    {
        let mut state = self.get_state()?;
        let out = f(&mut state)?;
        if let Err(err) = reconcile(&mut self.doc, &state) {
            self.cached_state = None;
            return Err(err.into());
        }
        self.cached_state = Some(state);
        Ok(out)
    }

    // =========================================================================
    // STORIES
    // =========================================================================

    /// Adds a top-level story at the end of the story order.
    pub fn create_story(&mut self, story: Story) -> CollabResult<()> {
        self.update_state(|state| {
            if state.stories.contains_key(&story.id) {
                return Err(CollabError::invalid_state(format!(
                    "story {} already exists",
                    story.id
                )));
            }
            state.story_order.push(story.id.clone());
            state.stories.insert(story.id.clone(), story);
            Ok(())
        })
    }

    /// Gets a story or branch by id.
    pub fn get_story(&mut self, id: &str) -> CollabResult<Option<Story>> {
        let state = self.get_state()?;
        Ok(state.find_story(id).cloned())
    }

    /// Removes a top-level story with all its branches.
    pub fn delete_story(&mut self, id: &str) -> CollabResult<Story> {
        self.update_state(|state| {
            let story = state
                .stories
                .remove(id)
                .ok_or_else(|| CollabError::story_not_found(id))?;
            state.story_order.retain(|s| s != id);
            Ok(story)
        })
    }

    /// Moves a story from one position of the order to another.
    pub fn move_story(&mut self, from: usize, to: usize) -> CollabResult<()> {
        self.update_state(|state| {
            let len = state.story_order.len();
            if from >= len {
                return Err(CollabError::index_out_of_range(from, len));
            }
            if to > len {
                return Err(CollabError::index_out_of_range(to, len));
            }
            if from != to {
                let id = state.story_order.remove(from);
                let adjusted_to = if from < to { to - 1 } else { to };
                state.story_order.insert(adjusted_to, id);
            }
            Ok(())
        })
    }

    /// Returns the ordered list of top-level story ids.
    pub fn get_order(&mut self) -> CollabResult<Vec<String>> {
        let state = self.get_state()?;
        Ok(state.story_order)
    }

    /// Inserts `line` before `index` of the story or branch `story_id`.
    pub fn insert_line(&mut self, story_id: &str, index: usize, line: StoryLine) -> CollabResult<LineChange> {
        self.update_state(|state| target(state, story_id)?.insert_line(index, line))
    }

    /// Replaces line `index` with a line of the same kind.
    pub fn replace_line(&mut self, story_id: &str, index: usize, line: StoryLine) -> CollabResult<LineChange> {
        self.update_state(|state| target(state, story_id)?.replace_line(index, line))
    }

    /// Deletes line `index`. The last line of a story cannot be deleted.
    pub fn delete_line(&mut self, story_id: &str, index: usize) -> CollabResult<LineChange> {
        self.update_state(|state| {
            let story = target(state, story_id)?;
            if story.len() == 1 && index == 0 {
                return Err(CollabError::LastRemainingLine(story_id.to_string()));
            }
            story.delete_line(index)
        })
    }

    /// Adds an empty branch under `parent_id` and returns its id.
    pub fn add_branch(&mut self, parent_id: &str, title: &str) -> CollabResult<String> {
        self.update_state(|state| {
            let branch = Story::with_random_id(title);
            let id = branch.id.clone();
            target(state, parent_id)?.branches.push(branch);
            Ok(id)
        })
    }

    /// Removes a branch and everything below it.
    pub fn remove_branch(&mut self, branch_id: &str) -> CollabResult<Story> {
        self.update_state(|state| {
            let root = state
                .stories
                .values_mut()
                .find(|story| story.id != branch_id && story.find(branch_id).is_some())
                .ok_or_else(|| CollabError::story_not_found(branch_id))?;
            root.remove_branch(branch_id)
        })
    }

    /// Validates a story or branch together with its sub-branches.
    pub fn validate_story(&mut self, story_id: &str, validator: &dyn StoryValidator) -> CollabResult<ValidationTree> {
        let state = self.get_state()?;
        let story = state
            .find_story(story_id)
            .ok_or_else(|| CollabError::story_not_found(story_id))?;
        Ok(ValidationTree::build(story, validator))
    }

    // =========================================================================
    // RESPONSES
    // =========================================================================

    /// Returns the response catalog.
    pub fn get_responses(&mut self) -> CollabResult<ResponseCatalog> {
        Ok(self.get_state()?.responses)
    }

    /// Replaces the whole response catalog.
    pub fn set_responses(&mut self, responses: ResponseCatalog) -> CollabResult<()> {
        self.update_state(|state| {
            state.responses = responses;
            Ok(())
        })
    }

    /// Derives a new catalog from the current one, e.g. with
    /// [`crate::response::update_sequence`].
    pub fn update_responses<F>(&mut self, f: F) -> CollabResult<()>
    where
        F: FnOnce(&ResponseCatalog) -> CollabResult<ResponseCatalog>,
    {
        self.update_state(|state| {
            state.responses = f(&state.responses)?;
            Ok(())
        })
    }

    /// Replaces the block sequence of `(key, lang)`.
    pub fn set_sequence(&mut self, key: &str, lang: &str, sequence: Vec<ResponseBlock>) -> CollabResult<()> {
        self.update_responses(|catalog| response::update_sequence(catalog, key, lang, |_| Ok(sequence)))
    }

    /// Inserts a block from `template` after block `index` of `(key, lang)`.
    pub fn create_response(&mut self, key: &str, lang: &str, index: usize, template: &str) -> CollabResult<()> {
        self.update_responses(|catalog| response::create_response(catalog, key, lang, index, template))
    }

    pub fn delete_response(&mut self, key: &str, lang: &str, index: usize) -> CollabResult<()> {
        self.update_responses(|catalog| response::delete_response(catalog, key, lang, index))
    }

    pub fn change_response(
        &mut self,
        key: &str,
        lang: &str,
        index: usize,
        content: &ResponseContent,
    ) -> CollabResult<()> {
        self.update_responses(|catalog| response::change_response(catalog, key, lang, index, content))
    }

    /// Appends an auto-named response and returns its key.
    pub fn create_sequence(&mut self, prefix: &str, lang: &str, template: TemplateKind) -> CollabResult<String> {
        self.update_state(|state| {
            let (catalog, key) = response::create_sequence(&state.responses, prefix, lang, template)?;
            state.responses = catalog;
            Ok(key)
        })
    }

    // =========================================================================
    // SYNC OPERATIONS
    // =========================================================================

    /// Merges another document into this one.
    pub fn merge(&mut self, other: &mut Self) -> CollabResult<()> {
        self.cached_state = None;
        let heads = self.doc.merge(&mut other.doc)?;
        debug!(new_heads = heads.len(), "Merged project document");
        Ok(())
    }

    /// Generates sync message for incremental sync.
    /// Returns None if there are no changes since their_heads.
    pub fn generate_sync_message(&mut self, their_heads: &[ChangeHash]) -> Option<Vec<u8>> {
        let changes = self.doc.get_changes(their_heads);
        if changes.is_empty() {
            return None;
        }
        let mut bytes = Vec::new();
        for change in changes {
            bytes.extend_from_slice(change.raw_bytes());
        }
        Some(bytes)
    }

    /// Applies sync message from peer.
    pub fn apply_sync_message(&mut self, msg: &[u8]) -> CollabResult<()> {
        self.cached_state = None;
        let ops = self.doc.load_incremental(msg)?;
        debug!(ops, "Applied sync message");
        Ok(())
    }
}

fn target<'a>(state: &'a mut ProjectRoot, story_id: &str) -> CollabResult<&'a mut Story> {
    state
        .find_story_mut(story_id)
        .ok_or_else(|| CollabError::story_not_found(story_id))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{update_sequence, Response, ResponseBlock};
    use crate::story::Utterance;
    use crate::validation::MarkdownValidator;

    fn manager() -> ProjectManager {
        let mut manager = ProjectManager::new("p1", "en").unwrap();
        manager
            .create_story(
                Story::new("s1", "Greeting")
                    .with_line(StoryLine::user(Utterance::new("hello")))
                    .with_line(StoryLine::bot("utter_hi")),
            )
            .unwrap();
        manager
    }

    #[test]
    fn test_new_manager() {
        let mut manager = ProjectManager::new("p1", "en").unwrap();
        let state = manager.get_state().unwrap();
        assert!(state.is_empty());
        assert_eq!(state.default_language, "en");
    }

    #[test]
    fn test_create_story_twice_is_rejected() {
        let mut manager = manager();
        let err = manager.create_story(Story::new("s1", "Again")).unwrap_err();
        assert!(matches!(err, CollabError::InvalidState(_)));
        assert_eq!(manager.get_order().unwrap(), vec!["s1"]);
    }

    #[test]
    fn test_line_operations() {
        let mut manager = manager();
        let change = manager
            .insert_line("s1", 1, StoryLine::action("action_check"))
            .unwrap();
        assert_eq!(change.cursor(), 2);

        manager
            .replace_line("s1", 1, StoryLine::action("action_lookup"))
            .unwrap();
        manager.delete_line("s1", 2).unwrap();

        let story = manager.get_story("s1").unwrap().unwrap();
        assert_eq!(story.lines.len(), 2);
        assert_eq!(story.lines[1], StoryLine::action("action_lookup"));
    }

    #[test]
    fn test_failed_update_leaves_document_untouched() {
        let mut manager = manager();
        let before = manager.get_heads();

        let err = manager
            .replace_line("s1", 1, StoryLine::action("action_x"))
            .unwrap_err();
        assert!(matches!(err, CollabError::LineKindMismatch { .. }));
        assert!(manager.insert_line("s1", 9, StoryLine::bot("utter_x")).is_err());

        assert_eq!(manager.get_heads(), before);
        let story = manager.get_story("s1").unwrap().unwrap();
        assert_eq!(story.lines[1], StoryLine::bot("utter_hi"));
    }

    #[test]
    fn test_last_line_cannot_be_deleted() {
        let mut manager = ProjectManager::new("p1", "en").unwrap();
        manager
            .create_story(Story::new("s1", "One").with_line(StoryLine::bot("utter_hi")))
            .unwrap();
        let err = manager.delete_line("s1", 0).unwrap_err();
        assert!(matches!(err, CollabError::LastRemainingLine(_)));
    }

    #[test]
    fn test_branch_lines_and_removal() {
        let mut manager = manager();
        let branch_id = manager.add_branch("s1", "Yes").unwrap();
        manager
            .insert_line(&branch_id, 0, StoryLine::user(Utterance::new("affirm")))
            .unwrap();

        let branch = manager.get_story(&branch_id).unwrap().unwrap();
        assert_eq!(branch.lines.len(), 1);

        manager.remove_branch(&branch_id).unwrap();
        assert!(manager.get_story(&branch_id).unwrap().is_none());
        assert!(manager.remove_branch("s1").is_err());
    }

    #[test]
    fn test_delete_and_move_stories() {
        let mut manager = manager();
        manager.create_story(Story::new("s2", "Two")).unwrap();
        manager.create_story(Story::new("s3", "Three")).unwrap();

        manager.move_story(0, 3).unwrap();
        assert_eq!(manager.get_order().unwrap(), vec!["s2", "s3", "s1"]);

        let removed = manager.delete_story("s3").unwrap();
        assert_eq!(removed.title, "Three");
        assert_eq!(manager.get_order().unwrap(), vec!["s2", "s1"]);
        assert!(manager.delete_story("s3").is_err());
    }

    #[test]
    fn test_update_responses() {
        let mut manager = manager();
        manager
            .set_responses(ResponseCatalog::new().with_response(
                Response::new("utter_hi").with_variant("en", vec![ResponseBlock::new("text: hi")]),
            ))
            .unwrap();

        manager
            .update_responses(|catalog| {
                update_sequence(catalog, "utter_hi", "en", |seq| {
                    let mut seq = seq.to_vec();
                    seq.push(ResponseBlock::new("text: welcome"));
                    Ok(seq)
                })
            })
            .unwrap();

        let bytes = manager.save();
        let mut loaded = ProjectManager::from_bytes(&bytes).unwrap();
        let responses = loaded.get_responses().unwrap();
        let variant = responses.get("utter_hi").unwrap().variant("en").unwrap();
        assert_eq!(variant.sequence.len(), 2);
    }

    #[test]
    fn test_response_operations() {
        let mut manager = manager();
        let key = manager
            .create_sequence("utter_new", "en", TemplateKind::Text)
            .unwrap();
        assert_eq!(key, "utter_new_1");

        manager.create_response(&key, "en", 0, "qr").unwrap();
        manager
            .change_response(&key, "en", 0, &ResponseContent::text("hello"))
            .unwrap();
        let heads = manager.get_heads();
        assert!(manager.delete_response(&key, "en", 5).is_err());
        assert!(manager.create_response(&key, "fr", 0, "text").is_err());
        assert_eq!(manager.get_heads(), heads);

        let mut loaded = ProjectManager::from_bytes(&manager.save()).unwrap();
        let responses = loaded.get_responses().unwrap();
        let variant = responses.get(&key).unwrap().variant("en").unwrap();
        assert_eq!(variant.sequence.len(), 2);
        assert_eq!(
            crate::response::codec::deserialize(&variant.sequence[0].content).unwrap(),
            ResponseContent::text("hello")
        );

        manager.delete_response(&key, "en", 1).unwrap();
        manager
            .set_sequence(&key, "en", vec![ResponseBlock::new("text: one"), ResponseBlock::new("text: two")])
            .unwrap();
        let responses = manager.get_responses().unwrap();
        assert_eq!(responses.get(&key).unwrap().variant("en").unwrap().sequence.len(), 2);
    }

    #[test]
    fn test_validate_story_counts_branches() {
        let mut manager = manager();
        let branch_id = manager.add_branch("s1", "Broken").unwrap();
        manager
            .insert_line(&branch_id, 0, StoryLine::user(Utterance::new("deny")))
            .unwrap();
        manager
            .insert_line(&branch_id, 1, StoryLine::bot("utter_"))
            .unwrap();

        let tree = manager
            .validate_story("s1", &MarkdownValidator::new())
            .unwrap();
        assert_eq!(tree.own.warnings, 0);
        assert_eq!(tree.total.warnings, 1);
        assert!(manager.validate_story("missing", &MarkdownValidator::new()).is_err());
    }

    #[test]
    fn test_merge_documents() {
        let mut base = manager();
        let bytes = base.save();
        let mut client_a = ProjectManager::from_bytes(&bytes).unwrap();
        let mut client_b = ProjectManager::from_bytes(&bytes).unwrap();

        client_a.create_story(Story::new("a", "From A")).unwrap();
        client_b.create_story(Story::new("b", "From B")).unwrap();

        client_a.merge(&mut client_b).unwrap();
        client_b.merge(&mut client_a).unwrap();

        let state_a = client_a.get_state().unwrap();
        let state_b = client_b.get_state().unwrap();
        assert_eq!(state_a.len(), 3);
        assert_eq!(state_b.len(), 3);
        assert!(state_a.stories.contains_key("b"));
    }

    #[test]
    fn test_sync_messages() {
        let mut source = manager();
        let mut replica = ProjectManager::from_bytes(&source.save()).unwrap();
        let heads = replica.get_heads();

        assert!(source.generate_sync_message(&heads).is_none());

        source
            .insert_line("s1", 2, StoryLine::action("action_bye"))
            .unwrap();
        let msg = source.generate_sync_message(&heads).unwrap();
        replica.apply_sync_message(&msg).unwrap();

        let story = replica.get_story("s1").unwrap().unwrap();
        assert_eq!(story.lines.len(), 3);
    }
}
