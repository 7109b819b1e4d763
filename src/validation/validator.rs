//! Story validators.
//!
//! A validator turns the structured text of one story into diagnostics. The
//! aggregator only consumes the resulting counts, so any grammar can be
//! plugged in through [`StoryValidator`].

use std::collections::HashSet;
use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// COUNTS
// =============================================================================

/// Error and warning counts for a story or a subtree of stories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCounts {
    pub errors: u32,
    pub warnings: u32,
}

impl ValidationCounts {
    pub fn new(errors: u32, warnings: u32) -> Self {
        Self { errors, warnings }
    }

    /// True when there is nothing to report.
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }

    /// `"1 Error"`, `"2 Errors"`, or `None` when there are no errors.
    pub fn error_label(&self) -> Option<String> {
        label(self.errors, "Error")
    }

    /// `"1 Warning"`, `"3 Warnings"`, or `None` when there are no warnings.
    pub fn warning_label(&self) -> Option<String> {
        label(self.warnings, "Warning")
    }
}

fn label(count: u32, noun: &str) -> Option<String> {
    match count {
        0 => None,
        1 => Some(format!("1 {}", noun)),
        n => Some(format!("{} {}s", n, noun)),
    }
}

impl Add for ValidationCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            errors: self.errors + rhs.errors,
            warnings: self.warnings + rhs.warnings,
        }
    }
}

impl AddAssign for ValidationCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem found on one line (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "line {}: {}: {}", self.line, kind, self.message)
    }
}

/// Everything a validator found in one story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    fn push(&mut self, line: usize, severity: Severity, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            line,
            severity,
            message: message.into(),
        });
    }

    pub fn counts(&self) -> ValidationCounts {
        self.diagnostics
            .iter()
            .fold(ValidationCounts::default(), |mut acc, d| {
                match d.severity {
                    Severity::Error => acc.errors += 1,
                    Severity::Warning => acc.warnings += 1,
                }
                acc
            })
    }
}

/// The validator could not process the story at all.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Failed to parse story: {0}")]
    Parse(String),
}

// =============================================================================
// VALIDATOR TRAIT
// =============================================================================

/// Validates the structured text of a single story.
pub trait StoryValidator {
    fn validate(&self, source: &str) -> Result<ValidationReport, ValidationError>;
}

impl<F> StoryValidator for F
where
    F: Fn(&str) -> Result<ValidationReport, ValidationError>,
{
    fn validate(&self, source: &str) -> Result<ValidationReport, ValidationError> {
        self(source)
    }
}

// =============================================================================
// MARKDOWN VALIDATOR
// =============================================================================

/// Line-oriented checker for the markdown story format.
///
/// Stories need not start with a user intent; action-only or slot-only
/// stories are valid.
#[derive(Debug, Clone)]
pub struct MarkdownValidator {
    response_prefix: String,
    known_responses: Option<HashSet<String>>,
}

impl Default for MarkdownValidator {
    fn default() -> Self {
        Self {
            response_prefix: "utter_".to_string(),
            known_responses: None,
        }
    }
}

impl MarkdownValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: warn on references to responses outside `keys`.
    pub fn with_known_responses<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_responses = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    fn check_user(&self, report: &mut ValidationReport, line: usize, rest: &str) {
        let (intent, payload) = split_payload(rest);
        if intent.is_empty() {
            report.push(line, Severity::Error, "User line has no intent");
            return;
        }
        if intent.contains(char::is_whitespace) {
            report.push(line, Severity::Error, format!("Invalid intent name '{}'", intent));
            return;
        }
        if let Some(payload) = payload {
            if !is_json_object(payload) {
                report.push(
                    line,
                    Severity::Error,
                    format!("Entities of intent '{}' are not a JSON object", intent),
                );
            }
        }
    }

    fn check_event(&self, report: &mut ValidationReport, line: usize, rest: &str) {
        if rest.is_empty() {
            report.push(line, Severity::Error, "Missing action or response name");
            return;
        }
        if let Some(payload) = rest.strip_prefix("slot") {
            if payload.starts_with('{') {
                if !is_json_object(payload) {
                    report.push(line, Severity::Error, "Slot payload is not a JSON object");
                }
                return;
            }
        }
        if rest.contains(char::is_whitespace) {
            report.push(line, Severity::Error, format!("Invalid action name '{}'", rest));
            return;
        }
        if rest.starts_with(&self.response_prefix) {
            if rest == self.response_prefix {
                report.push(line, Severity::Warning, "Response name is incomplete");
            } else if let Some(known) = &self.known_responses {
                if !known.contains(rest) {
                    report.push(
                        line,
                        Severity::Warning,
                        format!("Response '{}' is not defined", rest),
                    );
                }
            }
        }
    }
}

impl StoryValidator for MarkdownValidator {
    fn validate(&self, source: &str) -> Result<ValidationReport, ValidationError> {
        let mut report = ValidationReport::default();
        for (i, raw) in source.lines().enumerate() {
            let line = i + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with("##") || text.starts_with('>') || text.starts_with("<!--") {
                continue;
            }
            if let Some(rest) = text.strip_prefix('*') {
                self.check_user(&mut report, line, rest.trim());
            } else if let Some(rest) = text.strip_prefix('-') {
                self.check_event(&mut report, line, rest.trim());
            } else {
                report.push(line, Severity::Error, format!("Unexpected line '{}'", text));
            }
        }
        Ok(report)
    }
}

/// Splits `name{...}` into the name and the optional JSON payload.
fn split_payload(text: &str) -> (&str, Option<&str>) {
    match text.find('{') {
        Some(pos) => (text[..pos].trim(), Some(&text[pos..])),
        None => (text.trim(), None),
    }
}

fn is_json_object(text: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(text),
        Ok(serde_json::Value::Object(_))
    )
}

// =============================================================================
// TESTS
// =============================================================================
