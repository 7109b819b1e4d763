//! Story module.
//!
//! - `model`: StoryLine variants, Story trees and LineChange records
//! - `markdown`: structured-text rendering used by validation
//! - `editor`: StoryEditor with the insertion point and eager revalidation

pub mod editor;
pub mod markdown;
pub mod model;

pub use editor::{FocusTarget, InsertionPoint, StoryEditor};
pub use model::{
    ActionLine, BotLine, ChangeKind, Entity, LineChange, SlotLine, Story, StoryLine, Utterance,
};
