//! Story validation module.
//!
//! - `validator`: the `StoryValidator` seam and the markdown line checker
//! - `aggregate`: per-branch counts summed up to the root

pub mod aggregate;
pub mod validator;

pub use aggregate::ValidationTree;
pub use validator::{
    Diagnostic, MarkdownValidator, Severity, StoryValidator, ValidationCounts, ValidationError,
    ValidationReport,
};
