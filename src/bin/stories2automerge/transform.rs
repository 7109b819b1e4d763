//! Transformation from the export's markdown stories to typed story lines.
//!
//! Recognized lines:
//! - `* intent` / `* intent{"entity": "value"}`: user utterance
//! - `- slot{"name": value}`: slot setting
//! - `- utter_*`: bot response
//! - `- anything_else`: action
//!
//! Headers (`##`), comments and blank lines are skipped.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};

use crate::input::{InputProject, InputStory};
use storycollab::story::{Entity, Story, StoryLine, Utterance};
use storycollab::{ProjectRoot, ResponseCatalog};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Splits `name{json}` into the name and its parsed object payload.
fn split_payload(text: &str) -> Result<(&str, Option<Map<String, Value>>)> {
    let Some(pos) = text.find('{') else {
        return Ok((text.trim(), None));
    };
    let (name, payload) = text.split_at(pos);
    match serde_json::from_str::<Value>(payload).context("invalid JSON payload")? {
        Value::Object(map) => Ok((name.trim(), Some(map))),
        _ => bail!("payload must be a JSON object"),
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_user(rest: &str) -> Result<StoryLine> {
    let (intent, payload) = split_payload(rest)?;
    if intent.is_empty() {
        return Ok(StoryLine::User(None));
    }
    let mut utterance = Utterance::new(intent);
    for (entity, value) in payload.unwrap_or_default() {
        utterance = utterance.with_entity(Entity::new(entity, value_to_string(value)));
    }
    Ok(StoryLine::user(utterance))
}

fn parse_step(rest: &str) -> Result<StoryLine> {
    if rest.starts_with("slot{") {
        let (_, payload) = split_payload(rest)?;
        let (name, value) = payload
            .and_then(|map| map.into_iter().next())
            .ok_or_else(|| anyhow!("slot line names no slot"))?;
        let value = match value {
            Value::Null => None,
            other => Some(value_to_string(other)),
        };
        return Ok(StoryLine::slot(name, value));
    }
    if rest.starts_with("utter_") {
        return Ok(StoryLine::bot(rest));
    }
    if rest.is_empty() {
        bail!("empty step");
    }
    Ok(StoryLine::action(rest))
}

/// Parses a markdown story body into lines.
pub fn parse_lines(body: &str) -> Result<Vec<StoryLine>> {
    let mut lines = Vec::new();
    for (number, raw) in body.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("##") || line.starts_with('>') || line.starts_with("<!--") {
            continue;
        }
        let parsed = if let Some(rest) = line.strip_prefix('*') {
            parse_user(rest.trim())
        } else if let Some(rest) = line.strip_prefix('-') {
            parse_step(rest.trim())
        } else {
            Err(anyhow!("unexpected line"))
        };
        lines.push(parsed.with_context(|| format!("line {}: {:?}", number + 1, line))?);
    }
    Ok(lines)
}

// =============================================================================
// STORIES
// =============================================================================

impl TryFrom<InputStory> for Story {
    type Error = anyhow::Error;

    fn try_from(input: InputStory) -> Result<Self> {
        let lines = parse_lines(&input.story)
            .with_context(|| format!("story {} ({})", input.id, input.title))?;
        let branches = input
            .branches
            .into_iter()
            .map(Story::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Story {
            id: input.id,
            title: input.title,
            lines,
            branches,
        })
    }
}

// =============================================================================
// ROOT PROJECT
// =============================================================================

/// Builds the document root. `fallback_language` applies when the export
/// names none.
pub fn into_root(input: InputProject, fallback_language: &str) -> Result<ProjectRoot> {
    let language = input
        .default_language
        .unwrap_or_else(|| fallback_language.to_string());
    let mut root = ProjectRoot::new(input.id, language);
    for story in input.stories {
        root = root.with_story(Story::try_from(story)?);
    }
    root.responses = input.responses.into_iter().collect::<ResponseCatalog>();
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let lines = parse_lines(
            "## greet\n* hello{\"name\": \"ada\"}\n  - utter_hi\n  - slot{\"mood\": \"happy\"}\n  - action_log",
        )
        .unwrap();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            StoryLine::user(Utterance::new("hello").with_entity(Entity::new("name", "ada")))
        );
        assert_eq!(lines[1], StoryLine::bot("utter_hi"));
        assert_eq!(lines[2], StoryLine::slot("mood", Some("happy".to_string())));
        assert_eq!(lines[3], StoryLine::action("action_log"));
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse_lines("* hi\nhello there").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
        assert!(parse_lines("* hi{not json}").is_err());
    }

    #[test]
    fn test_empty_user_line() {
        assert_eq!(parse_lines("* ").unwrap(), vec![StoryLine::User(None)]);
    }
}
