//! Field-specific text cleanup.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::models::labels;

use super::patterns::{
    BIRTH_CERTIFICATE_MARKERS, CANONICAL_DOCUMENT_TYPE, DATE_LABEL_MARKERS, NAME_SEPARATORS,
    WHITESPACE_RUN,
};

/// Category of a field label, deciding which cleanup rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Child, mother or father full name.
    PersonName,
    /// Printed caption preceding a name.
    Caption,
    /// Document title.
    DocumentType,
    /// Any label mentioning a date.
    Date,
    /// Everything else.
    Other,
}

impl FieldKind {
    /// Classify a label. Earlier categories win.
    pub fn of(label: &str) -> Self {
        if labels::NAME_FIELDS.contains(&label) {
            FieldKind::PersonName
        } else if labels::CAPTION_FIELDS.contains(&label) {
            FieldKind::Caption
        } else if label == labels::DOCUMENT_TYPE {
            FieldKind::DocumentType
        } else {
            let lower = label.to_lowercase();
            if DATE_LABEL_MARKERS.iter().any(|m| lower.contains(m)) {
                FieldKind::Date
            } else {
                FieldKind::Other
            }
        }
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase a name and turn `_`/`-` into word breaks.
pub fn normalize_name(text: &str) -> String {
    let name = collapse_whitespace(text).to_uppercase();
    let name = NAME_SEPARATORS.replace_all(&name, " ");
    let name = WHITESPACE_RUN.replace_all(&name, " ");
    name.trim().to_string()
}

/// Drop all whitespace and write dates with slashes.
pub fn normalize_date(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, "").replace('-', "/")
}

/// Replace any birth certificate title with the canonical phrase.
pub fn canonical_document_type(text: &str) -> String {
    let lower = text.to_lowercase();
    if BIRTH_CERTIFICATE_MARKERS.iter().any(|m| lower.contains(m)) {
        CANONICAL_DOCUMENT_TYPE.to_string()
    } else {
        text.to_string()
    }
}

/// Applies the cleanup rule for each field category.
///
/// Name normalization is memoized in a small LRU table; results are the
/// same with or without it.
pub struct FieldNormalizer {
    name_cache: Option<Mutex<LruCache<String, String>>>,
}

impl FieldNormalizer {
    /// Create a normalizer with a 128-entry name cache.
    pub fn new() -> Self {
        Self::with_cache_size(128)
    }

    /// Create a normalizer with the given name cache size; 0 disables it.
    pub fn with_cache_size(size: usize) -> Self {
        Self {
            name_cache: NonZeroUsize::new(size).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Normalize raw recognizer text for `label`. Empty in, empty out.
    pub fn normalize(&self, label: &str, raw: &str) -> String {
        let text = raw.trim();
        if text.is_empty() {
            return String::new();
        }

        match FieldKind::of(label) {
            FieldKind::PersonName => self.name(text),
            FieldKind::Caption => collapse_whitespace(text),
            FieldKind::DocumentType => canonical_document_type(text),
            FieldKind::Date => normalize_date(text),
            FieldKind::Other => text.to_string(),
        }
    }

    fn name(&self, text: &str) -> String {
        let Some(cache) = &self.name_cache else {
            return normalize_name(text);
        };

        if let Ok(mut cache) = cache.lock() {
            if let Some(hit) = cache.get(text) {
                return hit.clone();
            }
            let value = normalize_name(text);
            cache.put(text.to_string(), value.clone());
            value
        } else {
            normalize_name(text)
        }
    }
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
