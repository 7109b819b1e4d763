//! WASM bindings for the project module.
//!
//! JavaScript-friendly wrapper around `ProjectManager` for use in the browser.
//! Stories, lines and responses cross the boundary as plain JS objects with
//! the same shape as their serde form.

use automerge::ChangeHash;
use js_sys::{Array, Uint8Array};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

use super::manager::ProjectManager;
use crate::config::EditorConfig;
use crate::error::CollabError;
use crate::response::{ResponseBlock, ResponseCatalog, ResponseContent, TemplateKind};
use crate::story::{Story, StoryLine};
use crate::validation::MarkdownValidator;

/// Serialize a value to JsValue with HashMaps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<CollabError> for JsValue {
    fn from(err: CollabError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: CollabError| JsValue::from(e))
    };
}

fn parse_heads(heads: &Array) -> Result<Vec<ChangeHash>, JsValue> {
    heads
        .iter()
        .map(|value| {
            let hex_str = value
                .as_string()
                .ok_or_else(|| JsValue::from_str("head must be a hex string"))?;
            let bytes = hex::decode(&hex_str)
                .map_err(|e| JsValue::from_str(&format!("invalid head {}: {}", hex_str, e)))?;
            ChangeHash::try_from(&bytes[..])
                .map_err(|e| JsValue::from_str(&format!("invalid head {}: {}", hex_str, e)))
        })
        .collect()
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around ProjectManager.
#[wasm_bindgen]
pub struct JsProjectManager {
    inner: ProjectManager,
}

#[wasm_bindgen]
impl JsProjectManager {
    /// Creates a manager for a new, empty project.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const manager = new JsProjectManager('project-1', 'en');
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(project_id: &str, default_language: &str) -> Result<JsProjectManager, JsValue> {
        let inner = js_result!(ProjectManager::new(project_id, default_language))?;
        Ok(JsProjectManager { inner })
    }

    /// Loads from binary bytes (Uint8Array).
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8]) -> Result<JsProjectManager, JsValue> {
        let inner = js_result!(ProjectManager::from_bytes(bytes))?;
        Ok(JsProjectManager { inner })
    }

    /// Saves to binary bytes (returns Uint8Array).
    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&mut self) -> Uint8Array {
        let bytes = self.inner.save();
        Uint8Array::from(&bytes[..])
    }

    /// Gets the full document state as a JavaScript object.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const state = manager.getState();
    /// console.log(state.story_order); // ['story-1', 'story-2']
    /// console.log(state.stories['story-1'].title);
    /// ```
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&mut self) -> Result<JsValue, JsValue> {
        let state = js_result!(self.inner.get_state())?;
        Ok(to_js_value(&state)?)
    }

    /// Gets the actor ID for this document instance.
    #[wasm_bindgen(js_name = actorId)]
    pub fn actor_id(&self) -> String {
        self.inner.actor_id()
    }

    /// Gets the current heads as hex strings.
    #[wasm_bindgen(js_name = getHeads)]
    pub fn get_heads(&mut self) -> Array {
        let heads = self.inner.get_heads();
        let array = Array::new();
        for head in heads {
            array.push(&JsValue::from_str(&head.to_string()));
        }
        array
    }
}

// =============================================================================
// STORY METHODS
// =============================================================================

#[wasm_bindgen]
impl JsProjectManager {
    /// Adds a top-level story.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// manager.createStory({
    ///   id: 'story-1',
    ///   title: 'Greeting',
    ///   lines: [{ type: 'bot', data: { name: 'utter_hi' } }],
    ///   branches: []
    /// });
    /// ```
    #[wasm_bindgen(js_name = createStory)]
    pub fn create_story(&mut self, story: JsValue) -> Result<(), JsValue> {
        let story: Story = from_value(story)?;
        js_result!(self.inner.create_story(story))?;
        Ok(())
    }

    /// Gets a story or branch by id, returns null if not found.
    #[wasm_bindgen(js_name = getStory)]
    pub fn get_story(&mut self, id: &str) -> Result<JsValue, JsValue> {
        let story = js_result!(self.inner.get_story(id))?;
        match story {
            Some(s) => Ok(to_js_value(&s)?),
            None => Ok(JsValue::NULL),
        }
    }

    /// Removes a top-level story and its branches.
    #[wasm_bindgen(js_name = deleteStory)]
    pub fn delete_story(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.delete_story(id))?;
        Ok(())
    }

    /// Gets the top-level story ids in display order.
    #[wasm_bindgen(js_name = getOrder)]
    pub fn get_order(&mut self) -> Result<Vec<String>, JsValue> {
        js_result!(self.inner.get_order())
    }

    #[wasm_bindgen(js_name = moveStory)]
    pub fn move_story(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        js_result!(self.inner.move_story(from, to))?;
        Ok(())
    }

    /// Inserts a line and returns the change record `{ kind, index }`.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// manager.insertLine('story-1', 0, { type: 'user', data: { intent: 'hello', entities: [] } });
    /// ```
    #[wasm_bindgen(js_name = insertLine)]
    pub fn insert_line(&mut self, story_id: &str, index: usize, line: JsValue) -> Result<JsValue, JsValue> {
        let line: StoryLine = from_value(line)?;
        let change = js_result!(self.inner.insert_line(story_id, index, line))?;
        Ok(to_js_value(&change)?)
    }

    #[wasm_bindgen(js_name = replaceLine)]
    pub fn replace_line(&mut self, story_id: &str, index: usize, line: JsValue) -> Result<JsValue, JsValue> {
        let line: StoryLine = from_value(line)?;
        let change = js_result!(self.inner.replace_line(story_id, index, line))?;
        Ok(to_js_value(&change)?)
    }

    #[wasm_bindgen(js_name = deleteLine)]
    pub fn delete_line(&mut self, story_id: &str, index: usize) -> Result<JsValue, JsValue> {
        let change = js_result!(self.inner.delete_line(story_id, index))?;
        Ok(to_js_value(&change)?)
    }

    /// Adds an empty branch and returns its id.
    #[wasm_bindgen(js_name = addBranch)]
    pub fn add_branch(&mut self, parent_id: &str, title: &str) -> Result<String, JsValue> {
        js_result!(self.inner.add_branch(parent_id, title))
    }

    #[wasm_bindgen(js_name = removeBranch)]
    pub fn remove_branch(&mut self, branch_id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.remove_branch(branch_id))?;
        Ok(())
    }

    /// Validates a story and its branches against the project's responses.
    ///
    /// Returns `{ story_id, own, total, diagnostics, branches }`.
    #[wasm_bindgen(js_name = validateStory)]
    pub fn validate_story(&mut self, story_id: &str) -> Result<JsValue, JsValue> {
        let responses = js_result!(self.inner.get_responses())?;
        let validator = MarkdownValidator::new().with_known_responses(responses.keys());
        let tree = js_result!(self.inner.validate_story(story_id, &validator))?;
        Ok(to_js_value(&tree)?)
    }
}

// =============================================================================
// RESPONSE METHODS
// =============================================================================

#[wasm_bindgen]
impl JsProjectManager {
    #[wasm_bindgen(js_name = getResponses)]
    pub fn get_responses(&mut self) -> Result<JsValue, JsValue> {
        let responses = js_result!(self.inner.get_responses())?;
        Ok(to_js_value(&responses)?)
    }

    /// Replaces the response catalog.
    #[wasm_bindgen(js_name = setResponses)]
    pub fn set_responses(&mut self, responses: JsValue) -> Result<(), JsValue> {
        let responses: ResponseCatalog = from_value(responses)?;
        js_result!(self.inner.set_responses(responses))?;
        Ok(())
    }

    /// Replaces the block sequence of one response variant.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// manager.updateSequence('utter_hi', 'en', [{ content: 'text: hello\n' }]);
    /// ```
    #[wasm_bindgen(js_name = updateSequence)]
    pub fn update_sequence(&mut self, key: &str, lang: &str, sequence: JsValue) -> Result<(), JsValue> {
        let sequence: Vec<ResponseBlock> = from_value(sequence)?;
        js_result!(self.inner.set_sequence(key, lang, sequence))?;
        Ok(())
    }

    /// Inserts a block from a template (`text`, `qr`) after block `index`.
    #[wasm_bindgen(js_name = createResponse)]
    pub fn create_response(&mut self, key: &str, lang: &str, index: usize, template: &str) -> Result<(), JsValue> {
        js_result!(self.inner.create_response(key, lang, index, template))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = deleteResponse)]
    pub fn delete_response(&mut self, key: &str, lang: &str, index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.delete_response(key, lang, index))?;
        Ok(())
    }

    /// Replaces block `index` with `{ text, buttons? }` content.
    #[wasm_bindgen(js_name = changeResponse)]
    pub fn change_response(&mut self, key: &str, lang: &str, index: usize, content: JsValue) -> Result<(), JsValue> {
        let content: ResponseContent = from_value(content)?;
        js_result!(self.inner.change_response(key, lang, index, &content))?;
        Ok(())
    }

    /// Appends an auto-named response and returns its key.
    ///
    /// `prefix` defaults to `utter_new`.
    #[wasm_bindgen(js_name = createSequence)]
    pub fn create_sequence(&mut self, lang: &str, template: &str, prefix: Option<String>) -> Result<String, JsValue> {
        let template = TemplateKind::parse(template)
            .ok_or_else(|| JsValue::from_str(&format!("unknown template {}", template)))?;
        let prefix = prefix.unwrap_or_else(|| EditorConfig::default().new_response_prefix);
        js_result!(self.inner.create_sequence(&prefix, lang, template))
    }
}

// =============================================================================
// SYNC PROTOCOL METHODS
// =============================================================================

#[wasm_bindgen]
impl JsProjectManager {
    /// Merges another manager's changes into this one.
    pub fn merge(&mut self, other: &mut JsProjectManager) -> Result<(), JsValue> {
        js_result!(self.inner.merge(&mut other.inner))?;
        Ok(())
    }

    /// Generates a sync message for changes since `their_heads` (hex strings).
    ///
    /// Returns a Uint8Array, or null if there is nothing to send.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const msg = manager.generateSyncMessage(peerHeads);
    /// if (msg) ws.send(msg);
    /// ```
    #[wasm_bindgen(js_name = generateSyncMessage)]
    pub fn generate_sync_message(&mut self, their_heads: Array) -> Result<JsValue, JsValue> {
        let heads = parse_heads(&their_heads)?;
        match self.inner.generate_sync_message(&heads) {
            Some(bytes) => Ok(Uint8Array::from(&bytes[..]).into()),
            None => Ok(JsValue::NULL),
        }
    }

    /// Applies a sync message from a peer.
    #[wasm_bindgen(js_name = applySyncMessage)]
    pub fn apply_sync_message(&mut self, msg: &[u8]) -> Result<(), JsValue> {
        js_result!(self.inner.apply_sync_message(msg))?;
        Ok(())
    }
}
