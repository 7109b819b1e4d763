//! Structured-text rendering of stories.
//!
//! Stories render to the markdown story format the validator parses:
//!
//! ```text
//! ## greeting
//! * hi{"name": "ada"}
//!   - utter_hi
//!   - slot{"mood": "happy"}
//! ```

use serde_json::{Map, Value};

use super::model::{Story, StoryLine};

/// Renders a single line. User lines with no utterance yet render as `* `.
pub fn render_line(line: &StoryLine) -> String {
    match line {
        StoryLine::User(None) => "* ".to_string(),
        StoryLine::User(Some(utterance)) => {
            if utterance.entities.is_empty() {
                format!("* {}", utterance.intent)
            } else {
                let entities: Map<String, Value> = utterance
                    .entities
                    .iter()
                    .map(|e| (e.entity.clone(), Value::String(e.value.clone())))
                    .collect();
                format!("* {}{}", utterance.intent, Value::Object(entities))
            }
        }
        StoryLine::Bot(bot) => format!("  - {}", bot.name),
        StoryLine::Action(action) => format!("  - {}", action.name),
        StoryLine::Slot(slot) => {
            let mut payload = Map::new();
            let value = slot.value.clone().map(Value::String).unwrap_or(Value::Null);
            payload.insert(slot.name.clone(), value);
            format!("  - slot{}", Value::Object(payload))
        }
    }
}

/// Renders the lines of one story, without its branches.
pub fn render_lines(story: &Story) -> String {
    story
        .lines
        .iter()
        .map(render_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders one story with its `##` header, without its branches.
pub fn render_story(story: &Story) -> String {
    let body = render_lines(story);
    if body.is_empty() {
        format!("## {}", story.title)
    } else {
        format!("## {}\n{}", story.title, body)
    }
}
