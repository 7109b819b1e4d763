//! Structured-text codec for response blocks.
//!
//! Block content is stored as YAML so it stays readable in exports and diffs.

use serde::{Deserialize, Serialize};

use crate::error::CollabResult;

/// A quick-reply button.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Button {
    pub title: String,
    pub payload: String,
}

impl Button {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Decoded content of one response block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseContent {
    pub text: String,
    /// Present (possibly empty) for quick replies, absent for plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
}

impl ResponseContent {
    /// Plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: None,
        }
    }

    /// Quick-reply content.
    pub fn quick_reply(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            text: text.into(),
            buttons: Some(buttons),
        }
    }

    /// The template this content was created from.
    pub fn kind(&self) -> TemplateKind {
        if self.buttons.is_some() {
            TemplateKind::QuickReply
        } else {
            TemplateKind::Text
        }
    }
}

/// Template used to seed a new block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateKind {
    Text,
    QuickReply,
}

impl TemplateKind {
    /// Parses a template name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "qr" | "quickReply" | "quick_reply" => Some(Self::QuickReply),
            _ => None,
        }
    }

    /// Empty content for this template.
    pub fn default_content(self) -> ResponseContent {
        match self {
            Self::Text => ResponseContent::text(""),
            Self::QuickReply => ResponseContent::quick_reply("", Vec::new()),
        }
    }
}

/// Encodes content to its stored text form.
pub fn serialize(content: &ResponseContent) -> CollabResult<String> {
    Ok(serde_yaml::to_string(content)?)
}

/// Decodes stored block text.
pub fn deserialize(text: &str) -> CollabResult<ResponseContent> {
    Ok(serde_yaml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_round_trip() {
        let content = ResponseContent::text("Hello: how are you?");
        let text = serialize(&content).unwrap();
        assert!(!text.contains("buttons"));
        assert_eq!(deserialize(&text).unwrap(), content);
    }

    #[test]
    fn test_quick_reply_round_trip() {
        let content = ResponseContent::quick_reply(
            "Pick one",
            vec![Button::new("Yes", "/affirm"), Button::new("No", "/deny")],
        );
        let text = serialize(&content).unwrap();
        assert_eq!(deserialize(&text).unwrap(), content);
        assert_eq!(deserialize(&text).unwrap().kind(), TemplateKind::QuickReply);
    }

    #[test]
    fn test_empty_templates_round_trip() {
        for kind in [TemplateKind::Text, TemplateKind::QuickReply] {
            let content = kind.default_content();
            let decoded = deserialize(&serialize(&content).unwrap()).unwrap();
            assert_eq!(decoded, content);
            assert_eq!(decoded.kind(), kind);
        }
    }

    #[test]
    fn test_template_names() {
        assert_eq!(TemplateKind::parse("text"), Some(TemplateKind::Text));
        assert_eq!(TemplateKind::parse("qr"), Some(TemplateKind::QuickReply));
        assert_eq!(TemplateKind::parse("carousel"), None);
    }

    #[test]
    fn test_invalid_text_is_an_error() {
        assert!(deserialize("text: [unclosed").is_err());
    }
}
