//! Repair for swapped mother/father name regions.

use tracing::{debug, info};

use crate::models::{labels, FieldMap};

use super::patterns::MOTHER_KEYWORDS;

/// Token count of a father caption that is taken as a sign of mislabeling.
///
/// Fitted to observed documents rather than derived from their layout;
/// expect false positives on long captions.
const SUSPECT_CAPTION_TOKENS: usize = 4;

/// Detects when the father caption actually introduces the mother and
/// exchanges the two full-name records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentFieldCorrector;

impl ParentFieldCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Whether the father caption looks mislabeled.
    ///
    /// Fires when the lowercased caption contains a mother keyword or has
    /// exactly four whitespace-separated tokens. False when there is no
    /// father caption.
    pub fn should_swap(&self, fields: &FieldMap) -> bool {
        let Some(caption) = fields.value(labels::FATHER_CAPTION) else {
            return false;
        };

        let caption = caption.to_lowercase();
        let mentions_mother = MOTHER_KEYWORDS.iter().any(|k| caption.contains(k));
        let suspect_length = caption.split_whitespace().count() == SUSPECT_CAPTION_TOKENS;

        debug!(
            "Father caption check: mother keyword={}, {} tokens={}",
            mentions_mother, SUSPECT_CAPTION_TOKENS, suspect_length
        );

        mentions_mother || suspect_length
    }

    /// Swap the mother and father full-name records when triggered.
    ///
    /// Does nothing unless both records are present.
    pub fn correct(&self, mut fields: FieldMap) -> FieldMap {
        if self.should_swap(&fields) && fields.swap(labels::MOTHER_NAME, labels::FATHER_NAME) {
            info!("Swapped mother and father name fields");
        }
        fields
    }
}
