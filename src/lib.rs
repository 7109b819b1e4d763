//! StoryCollab - editing core for conversational chatbot projects.
//!
//! Stories are ordered sequences of user utterances, bot responses, actions
//! and slot settings, with nested branches. This crate provides:
//!
//! - **Story editing**: index-based line operations that each yield a
//!   discrete `LineChange`, with a single insertion point per editor
//! - **Response sequences**: copy-on-write updates of response variants
//!   addressed by `(key, language)`
//! - **Validation aggregation**: error and warning counts summed bottom-up
//!   over the branch tree
//! - **Collaborative document**: the whole project in an Automerge document,
//!   updated all-or-nothing
//!
//! # Example
//!
//! ```rust
//! use storycollab::{ProjectManager, Story, StoryLine, Utterance};
//! use storycollab::validation::MarkdownValidator;
//!
//! let mut manager = ProjectManager::new("project-1", "en")?;
//!
//! let story = Story::new("greet", "Greeting")
//!     .with_line(StoryLine::user(Utterance::new("hello")))
//!     .with_line(StoryLine::bot("utter_hi"));
//! manager.create_story(story)?;
//!
//! let branch = manager.add_branch("greet", "Unhappy")?;
//! manager.insert_line(&branch, 0, StoryLine::user(Utterance::new("deny")))?;
//! manager.insert_line(&branch, 1, StoryLine::bot("utter_"))?;
//!
//! let tree = manager.validate_story("greet", &MarkdownValidator::new())?;
//! assert_eq!(tree.total.warning_label().as_deref(), Some("1 Warning"));
//!
//! let bytes = manager.save();
//! # assert!(!bytes.is_empty());
//! # Ok::<(), storycollab::CollabError>(())
//! ```

pub mod config;
pub mod error;

pub mod activity;
pub mod project;
pub mod remote;
pub mod response;
pub mod rules;
pub mod story;
pub mod validation;

// Re-exports for convenience
pub use config::{load_config, ConfigError, EditorConfig};
pub use error::{CollabError, CollabResult};
pub use project::{ProjectManager, ProjectRoot};
pub use response::{Response, ResponseBlock, ResponseCatalog, ResponseVariant, TemplateKind};
pub use story::{LineChange, Story, StoryEditor, StoryLine, Utterance};
pub use validation::{ValidationCounts, ValidationTree};

#[cfg(feature = "wasm")]
pub use project::JsProjectManager;
