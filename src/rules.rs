//! Story trigger rules editing.
//!
//! Rule forms carry `<field>__DISPLAYIF` flags next to conditional fields;
//! fields whose flag is off are stripped before saving.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::{CollabError, CollabResult};
use crate::remote::Persistence;

const DISPLAY_IF_SUFFIX: &str = "__DISPLAYIF";

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0 || f.is_nan()).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Returns a copy of `model` without the fields whose `__DISPLAYIF` flag is
/// falsy, at any depth. The flags themselves are kept.
pub fn clear_optional_fields(model: &Value) -> Value {
    match model {
        Value::Object(map) => {
            let hidden: Vec<&str> = map
                .iter()
                .filter(|(_, flag)| is_falsy(flag))
                .filter_map(|(key, _)| key.strip_suffix(DISPLAY_IF_SUFFIX))
                .collect();
            let cleared: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !hidden.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), clear_optional_fields(value)))
                .collect();
            Value::Object(cleared)
        }
        Value::Array(items) => Value::Array(items.iter().map(clear_optional_fields).collect()),
        other => other.clone(),
    }
}

/// Editing state of the triggers dialog of one story.
#[derive(Debug, Clone)]
pub struct RulesEditor {
    project_id: String,
    story_id: String,
    incoming: Vec<Value>,
    draft: Value,
    open: bool,
    is_destination_story: bool,
}

impl RulesEditor {
    /// Creates a closed editor for the saved `rules` of a story.
    ///
    /// Stories that other stories link into cannot have triggers.
    pub fn new(
        project_id: impl Into<String>,
        story_id: impl Into<String>,
        rules: Vec<Value>,
        is_destination_story: bool,
    ) -> Self {
        let draft = json!({ "rules": rules });
        Self {
            project_id: project_id.into(),
            story_id: story_id.into(),
            incoming: rules,
            draft,
            open: false,
            is_destination_story,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The form model being edited, shaped `{"rules": [...]}`.
    pub fn draft(&self) -> &Value {
        &self.draft
    }

    pub fn open(&mut self) -> CollabResult<()> {
        if self.is_destination_story {
            return Err(CollabError::invalid_state(
                "remove the links to this story to add triggers",
            ));
        }
        self.open = true;
        Ok(())
    }

    /// Saved rules changed upstream; the draft follows them.
    pub fn set_incoming(&mut self, rules: Vec<Value>) {
        self.draft = json!({ "rules": rules.clone() });
        self.incoming = rules;
    }

    pub fn change(&mut self, model: Value) {
        self.draft = model;
    }

    /// Sends `model` without its hidden fields. Closes on success; on failure
    /// the dialog stays open with the draft intact.
    pub async fn save<P>(&mut self, model: Value, backend: &P) -> CollabResult<()>
    where
        P: Persistence + ?Sized,
    {
        self.draft = model;
        let cleared = clear_optional_fields(&self.draft);
        match backend
            .update_rules(&self.project_id, &self.story_id, &cleared)
            .await
        {
            Ok(()) => {
                self.open = false;
                Ok(())
            }
            Err(err) => {
                warn!(story_id = %self.story_id, error = %err, "Saving rules failed");
                Err(err.into_collab("update_rules"))
            }
        }
    }

    /// Removes all triggers of the story.
    pub async fn delete_triggers<P>(&mut self, backend: &P) -> CollabResult<()>
    where
        P: Persistence + ?Sized,
    {
        match backend.delete_rules(&self.project_id, &self.story_id).await {
            Ok(()) => {
                self.open = false;
                Ok(())
            }
            Err(err) => {
                warn!(story_id = %self.story_id, error = %err, "Deleting rules failed");
                Err(err.into_collab("delete_rules"))
            }
        }
    }

    /// Drops the draft and closes.
    pub fn cancel(&mut self) {
        self.draft = json!({ "rules": self.incoming.clone() });
        self.open = false;
    }
}
