//! Incoming utterances waiting for review.
//!
//! The feed shows edits before the backend confirms them and rolls back when
//! a call fails. Reinterpretation tracks the ids in flight so the same item is
//! never sent twice concurrently.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::error::{CollabError, CollabResult};
use crate::remote::{Optimistic, PendingSet, Persistence, RemoteError};
use crate::story::Entity;

// =============================================================================
// ITEMS
// =============================================================================

/// One logged utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub validated: bool,
    #[serde(rename = "ooS", default)]
    pub out_of_scope: bool,
    #[serde(default)]
    pub created_at: i64,
}

impl ActivityItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Builder: Set the parsed intent and its confidence.
    pub fn with_intent(mut self, intent: impl Into<String>, confidence: f64) -> Self {
        self.intent = Some(intent.into());
        self.confidence = Some(confidence);
        self
    }

    /// Builder: Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Builder: Mark as validated.
    pub fn validated(mut self) -> Self {
        self.validated = true;
        self
    }
}

/// Partial update of an item. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPatch {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated: Option<bool>,
    #[serde(rename = "ooS", default, skip_serializing_if = "Option::is_none")]
    pub out_of_scope: Option<bool>,
}

impl ActivityPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_validated(mut self, validated: bool) -> Self {
        self.validated = Some(validated);
        self
    }

    pub fn with_out_of_scope(mut self, out_of_scope: bool) -> Self {
        self.out_of_scope = Some(out_of_scope);
        self
    }

    /// A hand-set intent has no model confidence.
    pub fn apply_to(&self, item: &mut ActivityItem) {
        if let Some(intent) = &self.intent {
            item.intent = Some(intent.clone());
            item.confidence = None;
        }
        if let Some(entities) = &self.entities {
            item.entities = entities.clone();
        }
        if let Some(validated) = self.validated {
            item.validated = validated;
        }
        if let Some(out_of_scope) = self.out_of_scope {
            item.out_of_scope = out_of_scope;
        }
    }
}

/// Percentage shown next to an item, e.g. `87%`.
///
/// Nothing is shown for outdated items, items without an intent, or without a
/// positive confidence.
pub fn confidence_label(item: &ActivityItem, outdated: bool) -> Option<String> {
    if outdated || item.intent.is_none() {
        return None;
    }
    match item.confidence {
        Some(confidence) if confidence > 0.0 => {
            Some(format!("{}%", (confidence * 100.0).floor() as i64))
        }
        _ => None,
    }
}

// =============================================================================
// SORTING
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    ConfidenceAscending,
    ConfidenceDescending,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::ConfidenceAscending,
        SortOrder::ConfidenceDescending,
    ];

    /// Label shown in the sort dropdown.
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Newest => "Newest",
            SortOrder::Oldest => "Oldest",
            SortOrder::ConfidenceAscending => "% ascending",
            SortOrder::ConfidenceDescending => "% decending",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.label() == label)
    }

    fn compare(self, a: &ActivityItem, b: &ActivityItem) -> Ordering {
        let confidence = |item: &ActivityItem| item.confidence.unwrap_or(f64::NEG_INFINITY);
        match self {
            SortOrder::Newest => b.created_at.cmp(&a.created_at),
            SortOrder::Oldest => a.created_at.cmp(&b.created_at),
            SortOrder::ConfidenceAscending => confidence(a).total_cmp(&confidence(b)),
            SortOrder::ConfidenceDescending => confidence(b).total_cmp(&confidence(a)),
        }
    }
}

// =============================================================================
// FEED
// =============================================================================

/// Activity of one NLU model in one language.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    model_id: String,
    lang: String,
    items: Optimistic<Vec<ActivityItem>>,
    reinterpreting: PendingSet<String>,
    max_pending: usize,
    sort: SortOrder,
}

impl ActivityFeed {
    pub fn new(model_id: impl Into<String>, lang: impl Into<String>, items: Vec<ActivityItem>) -> Self {
        Self {
            model_id: model_id.into(),
            lang: lang.into(),
            items: Optimistic::new(items),
            reinterpreting: PendingSet::new(),
            max_pending: EditorConfig::default().max_pending_reinterpretations,
            sort: SortOrder::default(),
        }
    }

    /// Builder: Apply editor settings.
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.max_pending = config.max_pending_reinterpretations;
        self
    }

    /// Items as currently displayed, including unconfirmed edits.
    pub fn items(&self) -> &[ActivityItem] {
        self.items.current()
    }

    pub fn get(&self, id: &str) -> Option<&ActivityItem> {
        self.items.current().iter().find(|item| item.id == id)
    }

    /// Fresh data from the backend replaces everything shown.
    pub fn set_items(&mut self, items: Vec<ActivityItem>) {
        self.items.reset(items);
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort_order(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    pub fn sorted(&self) -> Vec<&ActivityItem> {
        let mut items: Vec<&ActivityItem> = self.items.current().iter().collect();
        items.sort_by(|a, b| self.sort.compare(a, b));
        items
    }

    pub fn is_reinterpreting(&self, id: &str) -> bool {
        self.reinterpreting.contains(&id.to_string())
    }

    pub fn pending_reinterpretations(&self) -> usize {
        self.reinterpreting.len()
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Applies `patches` locally, then persists them.
    pub async fn upsert<P>(&mut self, patches: Vec<ActivityPatch>, backend: &P) -> CollabResult<()>
    where
        P: Persistence + ?Sized,
    {
        if patches.is_empty() {
            return Ok(());
        }
        self.items.apply(|items| {
            for patch in &patches {
                if let Some(item) = items.iter_mut().find(|item| item.id == patch.id) {
                    patch.apply_to(item);
                }
            }
        });
        let result = backend.upsert_activity(&self.model_id, &patches).await;
        self.settle("upsert_activity", result)
    }

    /// Sets the intent of one item. Its confidence is cleared.
    pub async fn set_intent<P>(&mut self, id: &str, intent: &str, backend: &P) -> CollabResult<()>
    where
        P: Persistence + ?Sized,
    {
        self.upsert(vec![ActivityPatch::new(id).with_intent(intent)], backend)
            .await
    }

    /// Marks `ids` as validated or not.
    pub async fn set_validated<P>(&mut self, ids: &[String], validated: bool, backend: &P) -> CollabResult<()>
    where
        P: Persistence + ?Sized,
    {
        let patches = ids
            .iter()
            .map(|id| ActivityPatch::new(id.as_str()).with_validated(validated))
            .collect();
        self.upsert(patches, backend).await
    }

    /// Removes `ids` locally, then from the backend.
    pub async fn delete<P>(&mut self, ids: Vec<String>, backend: &P) -> CollabResult<()>
    where
        P: Persistence + ?Sized,
    {
        if ids.is_empty() {
            return Ok(());
        }
        self.items.apply(|items| items.retain(|item| !ids.contains(&item.id)));
        let result = backend.delete_activity(&self.model_id, &ids).await;
        self.settle("delete_activity", result)
    }

    /// Moves all validated items into the training data.
    ///
    /// Returns the number of items moved. Nothing changes locally when the
    /// insert fails.
    pub async fn add_to_training<P>(&mut self, backend: &P) -> CollabResult<usize>
    where
        P: Persistence + ?Sized,
    {
        let examples: Vec<ActivityItem> = self
            .items
            .current()
            .iter()
            .filter(|item| item.validated)
            .cloned()
            .collect();
        if examples.is_empty() {
            debug!(model_id = %self.model_id, "No validated items to add to training");
            return Ok(0);
        }

        if let Err(err) = backend.insert_examples(&self.model_id, &examples).await {
            warn!(model_id = %self.model_id, error = %err, "Adding examples to training failed");
            return Err(err.into_collab("insert_examples"));
        }

        let ids: Vec<String> = examples.into_iter().map(|item| item.id).collect();
        let moved = ids.len();
        self.delete(ids, backend).await?;
        Ok(moved)
    }

    fn settle(&mut self, operation: &'static str, result: Result<(), RemoteError>) -> CollabResult<()> {
        match result {
            Ok(()) => {
                self.items.confirm();
                Ok(())
            }
            Err(err) => {
                warn!(model_id = %self.model_id, operation, error = %err, "Rolling back activity");
                self.items.rollback();
                Err(err.into_collab(operation))
            }
        }
    }

    // =========================================================================
    // Reinterpretation
    // =========================================================================

    /// Marks the existing, not yet pending `ids` as in flight and returns the
    /// items to send.
    pub fn begin_reinterpret<I>(&mut self, ids: I) -> Vec<ActivityItem>
    where
        I: IntoIterator<Item = String>,
    {
        let existing: Vec<String> = ids
            .into_iter()
            .filter(|id| self.get(id).is_some())
            .collect();
        let started = self.reinterpreting.begin(existing);
        started
            .iter()
            .filter_map(|id| self.get(id).cloned())
            .collect()
    }

    /// Clears `batch` from the pending set and applies the parse results.
    ///
    /// Results for items removed in the meantime are dropped. Returns the
    /// number of items updated.
    pub fn complete_reinterpret(
        &mut self,
        batch: &[ActivityItem],
        result: Result<Vec<ActivityItem>, RemoteError>,
    ) -> CollabResult<usize> {
        self.reinterpreting.finish(batch.iter().map(|item| &item.id));

        let parsed = match result {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(model_id = %self.model_id, count = batch.len(), error = %err, "Reinterpretation failed");
                return Err(err.into_collab("reinterpret"));
            }
        };

        let updated = parsed
            .iter()
            .filter(|fresh| self.get(&fresh.id).is_some())
            .count();
        if updated < parsed.len() {
            debug!(
                dropped = parsed.len() - updated,
                "Ignoring reinterpretations of removed items"
            );
        }

        self.items.apply_confirmed(|items| {
            for fresh in &parsed {
                if let Some(item) = items.iter_mut().find(|item| item.id == fresh.id) {
                    item.intent = fresh.intent.clone();
                    item.entities = fresh.entities.clone();
                    item.confidence = fresh.confidence;
                }
            }
        });
        Ok(updated)
    }

    /// Sends `ids` to be parsed again by the current model.
    pub async fn reinterpret<P>(&mut self, ids: Vec<String>, backend: &P) -> CollabResult<usize>
    where
        P: Persistence + ?Sized,
    {
        let batch = self.begin_reinterpret(ids);
        if batch.is_empty() {
            return Ok(0);
        }
        let result = backend.reinterpret(&self.model_id, &self.lang, &batch).await;
        self.complete_reinterpret(&batch, result)
    }

    /// Reinterprets the outdated items among `visible`.
    ///
    /// Does nothing while the model is training or once the pending limit
    /// is reached.
    pub async fn reinterpret_visible<P, F>(
        &mut self,
        visible: &[String],
        training: bool,
        is_outdated: F,
        backend: &P,
    ) -> CollabResult<usize>
    where
        P: Persistence + ?Sized,
        F: Fn(&ActivityItem) -> bool,
    {
        if training {
            debug!(model_id = %self.model_id, "Model training, not reinterpreting");
            return Ok(0);
        }
        if self.reinterpreting.len() >= self.max_pending {
            debug!(
                pending = self.reinterpreting.len(),
                "Too many reinterpretations in flight"
            );
            return Ok(0);
        }

        let ids: Vec<String> = visible
            .iter()
            .filter(|id| !self.is_reinterpreting(id))
            .filter(|id| self.get(id).map(&is_outdated).unwrap_or(false))
            .cloned()
            .collect();
        self.reinterpret(ids, backend).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::MemoryBackend;

    fn feed() -> ActivityFeed {
        ActivityFeed::new(
            "model-1",
            "en",
            vec![
                ActivityItem::new("a", "hello").with_intent("greet", 0.42).with_created_at(1),
                ActivityItem::new("b", "bye").with_intent("goodbye", 0.91).with_created_at(3),
                ActivityItem::new("c", "what").with_created_at(2),
            ],
        )
    }

    fn ids(items: &[&ActivityItem]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    #[test]
    fn test_sort_orders() {
        let mut feed = feed();
        assert_eq!(ids(&feed.sorted()), vec!["b", "c", "a"]);

        feed.set_sort_order(SortOrder::Oldest);
        assert_eq!(ids(&feed.sorted()), vec!["a", "c", "b"]);

        feed.set_sort_order(SortOrder::ConfidenceAscending);
        assert_eq!(ids(&feed.sorted()), vec!["c", "a", "b"]);

        feed.set_sort_order(SortOrder::ConfidenceDescending);
        assert_eq!(ids(&feed.sorted()), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_labels() {
        assert_eq!(SortOrder::from_label("% decending"), Some(SortOrder::ConfidenceDescending));
        assert_eq!(SortOrder::from_label("Newest"), Some(SortOrder::Newest));
        assert_eq!(SortOrder::from_label("Random"), None);
    }

    #[test]
    fn test_confidence_label() {
        let item = ActivityItem::new("a", "hi").with_intent("greet", 0.876);
        assert_eq!(confidence_label(&item, false).as_deref(), Some("87%"));
        assert_eq!(confidence_label(&item, true), None);

        let unparsed = ActivityItem::new("b", "hi");
        assert_eq!(confidence_label(&unparsed, false), None);

        let zero = ActivityItem::new("c", "hi").with_intent("greet", 0.0);
        assert_eq!(confidence_label(&zero, false), None);
    }

    #[test]
    fn test_item_wire_names() {
        let item = ActivityItem::new("a", "hi").with_created_at(5);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["_id"], "a");
        assert_eq!(json["ooS"], false);
        assert_eq!(json["createdAt"], 5);
    }

    #[tokio::test]
    async fn test_set_intent_clears_confidence() {
        let backend = MemoryBackend::new();
        let mut feed = feed();
        feed.set_intent("a", "chitchat", &backend).await.unwrap();

        let item = feed.get("a").unwrap();
        assert_eq!(item.intent.as_deref(), Some("chitchat"));
        assert_eq!(item.confidence, None);
        assert_eq!(backend.calls(), vec!["upsert_activity"]);
    }

    #[tokio::test]
    async fn test_failed_upsert_rolls_back() {
        let backend = MemoryBackend::new().failing("upsert_activity");
        let mut feed = feed();
        let before = feed.items().to_vec();

        let err = feed
            .set_validated(&["a".to_string()], true, &backend)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CollabError::RemoteOperationFailed { operation: "upsert_activity", .. }
        ));
        assert_eq!(feed.items(), before.as_slice());
    }

    #[tokio::test]
    async fn test_failed_delete_restores_items() {
        let backend = MemoryBackend::new().failing("delete_activity");
        let mut feed = feed();
        assert!(feed.delete(vec!["b".to_string()], &backend).await.is_err());
        assert!(feed.get("b").is_some());
        assert_eq!(feed.items().len(), 3);
    }

    #[tokio::test]
    async fn test_add_to_training_moves_validated() {
        let backend = MemoryBackend::new();
        let mut feed = feed();
        feed.set_validated(&["a".to_string(), "c".to_string()], true, &backend)
            .await
            .unwrap();

        let moved = feed.add_to_training(&backend).await.unwrap();

        assert_eq!(moved, 2);
        assert_eq!(ids(&feed.sorted()), vec!["b"]);
        assert_eq!(
            backend.calls(),
            vec!["upsert_activity", "insert_examples", "delete_activity"]
        );
    }

    #[tokio::test]
    async fn test_add_to_training_insert_failure_keeps_items() {
        let backend = MemoryBackend::new().failing("insert_examples");
        let mut feed = ActivityFeed::new("m", "en", vec![ActivityItem::new("a", "hi").validated()]);

        assert!(feed.add_to_training(&backend).await.is_err());
        assert!(feed.get("a").is_some());
        assert_eq!(backend.calls(), vec!["insert_examples"]);
    }

    #[test]
    fn test_pending_ids_not_sent_twice() {
        let mut feed = feed();
        let first = feed.begin_reinterpret(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(first.len(), 2);

        let second = feed.begin_reinterpret(vec!["b".to_string(), "c".to_string()]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "c");
        assert_eq!(feed.pending_reinterpretations(), 3);
    }

    #[tokio::test]
    async fn test_late_result_for_removed_item_is_ignored() {
        let backend = MemoryBackend::new();
        let mut feed = feed();
        let batch = feed.begin_reinterpret(vec!["a".to_string(), "b".to_string()]);

        feed.delete(vec!["a".to_string()], &backend).await.unwrap();

        let parsed = batch
            .iter()
            .cloned()
            .map(|item| item.with_intent("thanks", 0.9))
            .collect();
        let updated = feed.complete_reinterpret(&batch, Ok(parsed)).unwrap();

        assert_eq!(updated, 1);
        assert!(feed.get("a").is_none());
        assert_eq!(feed.get("b").unwrap().intent.as_deref(), Some("thanks"));
        assert_eq!(feed.pending_reinterpretations(), 0);
    }

    #[test]
    fn test_failed_reinterpret_clears_pending() {
        let mut feed = feed();
        let batch = feed.begin_reinterpret(vec!["a".to_string()]);
        let result = feed.complete_reinterpret(
            &batch,
            Err(RemoteError::Transport("connection reset".to_string())),
        );
        assert!(result.is_err());
        assert!(!feed.is_reinterpreting("a"));
        assert_eq!(feed.get("a").unwrap().intent.as_deref(), Some("greet"));
    }

    #[tokio::test]
    async fn test_reinterpret_visible_outdated_only() {
        let backend = MemoryBackend::new().with_reinterpreted_intent("greet");
        let mut feed = feed();
        let visible = vec!["a".to_string(), "c".to_string()];

        let updated = feed
            .reinterpret_visible(&visible, false, |item| item.intent.is_none(), &backend)
            .await
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(feed.get("c").unwrap().confidence, Some(0.9));
        assert_eq!(feed.get("a").unwrap().confidence, Some(0.42));
    }

    #[tokio::test]
    async fn test_reinterpret_visible_refused_while_training_or_saturated() {
        let backend = MemoryBackend::new();
        let mut feed = feed();
        let visible = vec!["c".to_string()];

        let updated = feed
            .reinterpret_visible(&visible, true, |_| true, &backend)
            .await
            .unwrap();
        assert_eq!(updated, 0);

        let config = EditorConfig {
            max_pending_reinterpretations: 1,
            ..EditorConfig::default()
        };
        let mut feed = feed.with_config(&config);
        feed.begin_reinterpret(vec!["a".to_string()]);
        let updated = feed
            .reinterpret_visible(&visible, false, |_| true, &backend)
            .await
            .unwrap();
        assert_eq!(updated, 0);
        assert!(backend.calls().is_empty());
    }
}
