//! Data model of the shared project document.

use std::collections::HashMap;

use autosurgeon::{Hydrate, Reconcile};
use serde::{Deserialize, Serialize};

use crate::response::ResponseCatalog;
use crate::story::Story;

// =============================================================================
// PROJECT ROOT
// =============================================================================

/// Root document structure for a collaborative project.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct ProjectRoot {
    pub id: String,

    /// Language used for new response variants.
    pub default_language: String,

    /// Display order of the top-level stories.
    pub story_order: Vec<String>,

    /// Map of story id -> story tree.
    pub stories: HashMap<String, Story>,

    pub responses: ResponseCatalog,
}

impl ProjectRoot {
    pub fn new(id: impl Into<String>, default_language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_language: default_language.into(),
            ..Default::default()
        }
    }

    /// Builder: Add a top-level story at the end of the order.
    pub fn with_story(mut self, story: Story) -> Self {
        self.story_order.push(story.id.clone());
        self.stories.insert(story.id.clone(), story);
        self
    }

    /// Returns the number of top-level stories.
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Top-level stories in display order.
    pub fn ordered_stories(&self) -> impl Iterator<Item = &Story> {
        self.story_order.iter().filter_map(|id| self.stories.get(id))
    }

    /// Finds a story or a branch at any depth.
    pub fn find_story(&self, id: &str) -> Option<&Story> {
        self.stories.values().find_map(|story| story.find(id))
    }

    pub fn find_story_mut(&mut self, id: &str) -> Option<&mut Story> {
        self.stories.values_mut().find_map(|story| story.find_mut(id))
    }

    /// The top-level story whose tree contains `id`.
    pub fn root_of(&self, id: &str) -> Option<&Story> {
        self.stories.values().find(|story| story.find(id).is_some())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::StoryLine;

    fn project() -> ProjectRoot {
        ProjectRoot::new("p1", "en")
            .with_story(
                Story::new("s1", "Greeting")
                    .with_line(StoryLine::bot("utter_hi"))
                    .with_branch(Story::new("s1-b1", "Yes").with_branch(Story::new("s1-b1-x", "Deep"))),
            )
            .with_story(Story::new("s2", "Goodbye"))
    }

    #[test]
    fn test_find_story_at_any_depth() {
        let project = project();
        assert_eq!(project.find_story("s1-b1-x").unwrap().title, "Deep");
        assert_eq!(project.root_of("s1-b1-x").unwrap().id, "s1");
        assert!(project.find_story("missing").is_none());
    }

    #[test]
    fn test_ordered_stories() {
        let project = project();
        let titles: Vec<&str> = project.ordered_stories().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Greeting", "Goodbye"]);
        assert_eq!(project.len(), 2);
    }
}
