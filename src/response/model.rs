//! Data models for bot responses.
//!
//! The catalog keeps each response behind an `Arc` so a sequence update only
//! allocates the response it touches; every other entry is shared with the
//! previous snapshot.

use std::ops::Deref;
use std::sync::Arc;

use autosurgeon::reconcile::NoKey;
use autosurgeon::{Hydrate, HydrateError, ReadDoc, Reconcile, Reconciler};
use serde::{Deserialize, Serialize};

// =============================================================================
// BLOCKS AND VARIANTS
// =============================================================================

/// One content block, stored in its structured-text form.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct ResponseBlock {
    pub content: String,
}

impl ResponseBlock {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// The blocks of a response for one language, in display order.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct ResponseVariant {
    pub lang: String,
    pub sequence: Vec<ResponseBlock>,
}

// =============================================================================
// RESPONSE
// =============================================================================

/// A named bot response with at most one variant per language.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[key]
    pub key: String,
    pub values: Vec<ResponseVariant>,
}

impl Response {
    /// Creates a response with no variants.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: Vec::new(),
        }
    }

    /// Builder: Set the variant for `lang`, replacing any existing one.
    pub fn with_variant(mut self, lang: impl Into<String>, sequence: Vec<ResponseBlock>) -> Self {
        self.set_variant(lang, sequence);
        self
    }

    /// Sets the variant for `lang`, keeping the one-variant-per-language rule.
    pub fn set_variant(&mut self, lang: impl Into<String>, sequence: Vec<ResponseBlock>) {
        let lang = lang.into();
        match self.values.iter_mut().find(|v| v.lang == lang) {
            Some(variant) => variant.sequence = sequence,
            None => self.values.push(ResponseVariant { lang, sequence }),
        }
    }

    /// Gets the variant for `lang`.
    pub fn variant(&self, lang: &str) -> Option<&ResponseVariant> {
        self.values.iter().find(|v| v.lang == lang)
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// The project-wide, copy-on-write list of responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ResponseCatalog(Vec<Arc<Response>>);

impl ResponseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Append a response.
    pub fn with_response(mut self, response: Response) -> Self {
        self.0.push(Arc::new(response));
        self
    }

    /// Returns a new catalog with `response` appended.
    pub fn appended(&self, response: Response) -> Self {
        let mut responses = self.0.clone();
        responses.push(Arc::new(response));
        Self(responses)
    }

    /// Returns a new catalog with entry `index` swapped for `response`.
    pub(crate) fn replaced(&self, index: usize, response: Response) -> Self {
        let mut responses = self.0.clone();
        responses[index] = Arc::new(response);
        Self(responses)
    }

    /// Gets a response by key.
    pub fn get(&self, key: &str) -> Option<&Response> {
        self.0.iter().map(Arc::as_ref).find(|r| r.key == key)
    }

    /// Iterates over response keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|r| r.key.as_str())
    }

    /// True when both catalogs hold the same allocation for entry `index`.
    pub fn shares_entry(&self, other: &Self, index: usize) -> bool {
        match (self.0.get(index), other.0.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Deref for ResponseCatalog {
    type Target = [Arc<Response>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<Response> for ResponseCatalog {
    fn from_iter<I: IntoIterator<Item = Response>>(iter: I) -> Self {
        Self(iter.into_iter().map(Arc::new).collect())
    }
}

/// Reconciles as a plain list of responses, keyed by response key.
impl Reconcile for ResponseCatalog {
    type Key<'a> = NoKey;

    fn reconcile<R: Reconciler>(&self, reconciler: R) -> Result<(), R::Error> {
        let responses: Vec<Response> = self.0.iter().map(|r| Response::clone(r)).collect();
        responses.reconcile(reconciler)
    }
}

impl Hydrate for ResponseCatalog {
    fn hydrate_seq<D: ReadDoc>(doc: &D, obj: &automerge::ObjId) -> Result<Self, HydrateError> {
        let responses: Vec<Response> = Vec::hydrate_seq(doc, obj)?;
        Ok(responses.into_iter().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_variant_per_language() {
        let response = Response::new("utter_hi")
            .with_variant("en", vec![ResponseBlock::new("text: hi\n")])
            .with_variant("fr", vec![ResponseBlock::new("text: salut\n")])
            .with_variant("en", vec![ResponseBlock::new("text: hello\n")]);

        assert_eq!(response.values.len(), 2);
        assert_eq!(response.variant("en").unwrap().sequence[0].content, "text: hello\n");
    }

    #[test]
    fn test_appended_shares_existing_entries() {
        let catalog = ResponseCatalog::new().with_response(Response::new("utter_a"));
        let next = catalog.appended(Response::new("utter_b"));

        assert_eq!(catalog.len(), 1);
        assert_eq!(next.len(), 2);
        assert!(catalog.shares_entry(&next, 0));
        assert_eq!(next.keys().collect::<Vec<_>>(), vec!["utter_a", "utter_b"]);
    }

    #[test]
    fn test_catalog_json_is_a_plain_list() {
        let catalog: ResponseCatalog = vec![Response::new("utter_a")].into_iter().collect();
        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["key"], "utter_a");

        let back: ResponseCatalog = serde_json::from_value(json).unwrap();
        assert_eq!(back, catalog);
    }
}
