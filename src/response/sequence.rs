//! Response sequence engine.
//!
//! Every operation takes the catalog, key and language explicitly and returns
//! a new catalog. The input catalog is never modified, and on error no new
//! catalog is produced.

use tracing::debug;

use super::codec::{self, ResponseContent, TemplateKind};
use super::model::{Response, ResponseBlock, ResponseCatalog};
use crate::error::{CollabError, CollabResult};

/// Locates `(response index, variant index)` for `key` and `lang`.
pub fn find_variant(catalog: &ResponseCatalog, key: &str, lang: &str) -> CollabResult<(usize, usize)> {
    let i = catalog
        .iter()
        .position(|r| r.key == key)
        .ok_or_else(|| CollabError::not_found(key, lang))?;
    let j = catalog[i]
        .values
        .iter()
        .position(|v| v.lang == lang)
        .ok_or_else(|| CollabError::not_found(key, lang))?;
    Ok((i, j))
}

/// Rewrites the sequence of one variant.
///
/// Only the targeted response is copied; all other entries are shared with
/// `catalog`.
pub fn update_sequence<F>(
    catalog: &ResponseCatalog,
    key: &str,
    lang: &str,
    updater: F,
) -> CollabResult<ResponseCatalog>
where
    F: FnOnce(&[ResponseBlock]) -> CollabResult<Vec<ResponseBlock>>,
{
    let (i, j) = find_variant(catalog, key, lang)?;
    let sequence = updater(&catalog[i].values[j].sequence)?;
    let mut response = Response::clone(&catalog[i]);
    response.values[j].sequence = sequence;
    Ok(catalog.replaced(i, response))
}

/// Like [`update_sequence`], but a missing `(key, lang)` or a rejected update
/// leaves the catalog as it was.
///
/// Used for results that arrive after the response was removed locally.
pub fn update_sequence_or_keep<F>(
    catalog: &ResponseCatalog,
    key: &str,
    lang: &str,
    updater: F,
) -> ResponseCatalog
where
    F: FnOnce(&[ResponseBlock]) -> CollabResult<Vec<ResponseBlock>>,
{
    match update_sequence(catalog, key, lang, updater) {
        Ok(updated) => updated,
        Err(err) => {
            debug!(key, lang, error = %err, "Dropping sequence update for stale response");
            catalog.clone()
        }
    }
}

/// Inserts a block seeded from `template` right after block `index`.
///
/// Unknown template names leave the catalog unchanged.
pub fn create_response(
    catalog: &ResponseCatalog,
    key: &str,
    lang: &str,
    index: usize,
    template: &str,
) -> CollabResult<ResponseCatalog> {
    let Some(kind) = TemplateKind::parse(template) else {
        debug!(key, template, "Unknown response template, no block created");
        return Ok(catalog.clone());
    };
    let block = ResponseBlock::new(codec::serialize(&kind.default_content())?);
    update_sequence(catalog, key, lang, |sequence| {
        if index >= sequence.len() {
            return Err(CollabError::index_out_of_range(index, sequence.len()));
        }
        let mut next = sequence.to_vec();
        next.insert(index + 1, block);
        Ok(next)
    })
}

/// Removes block `index`.
pub fn delete_response(
    catalog: &ResponseCatalog,
    key: &str,
    lang: &str,
    index: usize,
) -> CollabResult<ResponseCatalog> {
    update_sequence(catalog, key, lang, |sequence| {
        if index >= sequence.len() {
            return Err(CollabError::index_out_of_range(index, sequence.len()));
        }
        let mut next = sequence.to_vec();
        next.remove(index);
        Ok(next)
    })
}

/// Replaces block `index` with freshly serialized `content`.
pub fn change_response(
    catalog: &ResponseCatalog,
    key: &str,
    lang: &str,
    index: usize,
    content: &ResponseContent,
) -> CollabResult<ResponseCatalog> {
    let block = ResponseBlock::new(codec::serialize(content)?);
    update_sequence(catalog, key, lang, |sequence| {
        if index >= sequence.len() {
            return Err(CollabError::index_out_of_range(index, sequence.len()));
        }
        let mut next = sequence.to_vec();
        next[index] = block;
        Ok(next)
    })
}

/// Next auto-generated key: `prefix_<count + 1>`, where count is the number
/// of keys starting with `prefix`.
///
/// Keys renamed by hand can collide with the generated one; that is accepted.
pub fn next_response_key(catalog: &ResponseCatalog, prefix: &str) -> String {
    let taken = catalog.keys().filter(|k| k.starts_with(prefix)).count();
    format!("{}_{}", prefix, taken + 1)
}

/// Appends a new auto-named response holding one block from `template`.
///
/// Returns the new catalog and the generated key.
pub fn create_sequence(
    catalog: &ResponseCatalog,
    prefix: &str,
    lang: &str,
    template: TemplateKind,
) -> CollabResult<(ResponseCatalog, String)> {
    let key = next_response_key(catalog, prefix);
    let block = ResponseBlock::new(codec::serialize(&template.default_content())?);
    let response = Response::new(key.clone()).with_variant(lang, vec![block]);
    Ok((catalog.appended(response), key))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::codec::{deserialize, Button};

    fn catalog() -> ResponseCatalog {
        ResponseCatalog::new()
            .with_response(
                Response::new("utter_hi")
                    .with_variant("en", vec![ResponseBlock::new("text: hi\n")])
                    .with_variant("fr", vec![ResponseBlock::new("text: salut\n")]),
            )
            .with_response(
                Response::new("utter_bye").with_variant(
                    "en",
                    vec![
                        ResponseBlock::new("text: bye\n"),
                        ResponseBlock::new("text: see you\n"),
                    ],
                ),
            )
    }

    #[test]
    fn test_find_variant() {
        let catalog = catalog();
        assert_eq!(find_variant(&catalog, "utter_hi", "fr").unwrap(), (0, 1));
        assert_eq!(find_variant(&catalog, "utter_bye", "en").unwrap(), (1, 0));
        assert!(matches!(
            find_variant(&catalog, "utter_bye", "fr"),
            Err(CollabError::NotFound { .. })
        ));
        assert!(find_variant(&catalog, "utter_nope", "en").is_err());
    }

    #[test]
    fn test_update_only_touches_target() {
        let before = catalog();
        let after = delete_response(&before, "utter_bye", "en", 0).unwrap();

        assert_eq!(after.get("utter_bye").unwrap().values[0].sequence.len(), 1);
        assert_eq!(before.get("utter_bye").unwrap().values[0].sequence.len(), 2);
        assert!(before.shares_entry(&after, 0));
        assert!(!before.shares_entry(&after, 1));
    }

    #[test]
    fn test_unmatched_update_is_an_error_and_changes_nothing() {
        let before = catalog();
        let snapshot = before.clone();
        let result = update_sequence(&before, "utter_bye", "de", |_| Ok(Vec::new()));
        assert!(result.is_err());
        assert_eq!(before, snapshot);

        let kept = update_sequence_or_keep(&before, "utter_gone", "en", |_| Ok(Vec::new()));
        assert_eq!(kept, before);
        assert!(kept.shares_entry(&before, 1));
    }

    #[test]
    fn test_create_response_inserts_after_index() {
        let after = create_response(&catalog(), "utter_bye", "en", 0, "qr").unwrap();
        let sequence = &after.get("utter_bye").unwrap().values[0].sequence;
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence[0].content, "text: bye\n");
        assert_eq!(deserialize(&sequence[1].content).unwrap(), TemplateKind::QuickReply.default_content());
        assert_eq!(sequence[2].content, "text: see you\n");
    }

    #[test]
    fn test_create_response_unknown_template_is_skipped() {
        let before = catalog();
        let after = create_response(&before, "utter_bye", "en", 0, "carousel").unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn test_block_index_out_of_range() {
        let before = catalog();
        assert!(matches!(
            delete_response(&before, "utter_hi", "en", 1),
            Err(CollabError::IndexOutOfRange { index: 1, length: 1 })
        ));
        assert!(change_response(&before, "utter_hi", "en", 3, &ResponseContent::text("x")).is_err());
    }

    #[test]
    fn test_change_response_serializes_content() {
        let content = ResponseContent::quick_reply("Sure?", vec![Button::new("Yes", "/affirm")]);
        let after = change_response(&catalog(), "utter_hi", "fr", 0, &content).unwrap();
        let block = &after.get("utter_hi").unwrap().variant("fr").unwrap().sequence[0];
        assert_eq!(deserialize(&block.content).unwrap(), content);
        assert_eq!(after.get("utter_hi").unwrap().variant("en").unwrap().sequence[0].content, "text: hi\n");
    }

    #[test]
    fn test_next_response_key() {
        let catalog = ResponseCatalog::new()
            .with_response(Response::new("utter_new_1"))
            .with_response(Response::new("utter_greet"))
            .with_response(Response::new("utter_new_2"));
        assert_eq!(next_response_key(&catalog, "utter_new"), "utter_new_3");
        assert_eq!(next_response_key(&ResponseCatalog::new(), "utter_new"), "utter_new_1");
    }

    #[test]
    fn test_create_sequence_appends_response() {
        let (after, key) = create_sequence(&catalog(), "utter_new", "en", TemplateKind::Text).unwrap();
        assert_eq!(key, "utter_new_1");
        assert_eq!(after.len(), 3);
        let variant = after.get("utter_new_1").unwrap().variant("en").unwrap();
        assert_eq!(deserialize(&variant.sequence[0].content).unwrap(), ResponseContent::text(""));
    }
}
