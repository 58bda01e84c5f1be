// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identity matcher — locate an expected national-ID number in OCR output.
//
// Both sides are reduced to digits. A verbatim occurrence is an exact match;
// otherwise, for numbers of the national-ID length only, a window of that
// length slides over the extracted digits and the first window within the
// edit-distance tolerance is a fuzzy match.
//
// The tolerance (4 edits out of 13 digits) absorbs the common OCR digit
// confusions 0/8, 1/7 and 5/6. It is the most consequential constant in the
// whole pipeline; changing it changes who gets approved.

use std::sync::Arc;

use idverify_core::config::MatcherConfig;
use idverify_core::error::Result;
use idverify_core::types::{ExtractionResult, IdentityMatchResult, MatchMethod};
use idverify_document::{DocumentSource, TextExtractor};
use tracing::{debug, info, instrument};

const MATCHED: &str = "Identity number matched";
const NOT_FOUND: &str = "Identity number not found or the image is unclear";

/// Keep only the ASCII digits of `text`.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Slide a `clean_id`-sized window over `clean_text` and return the edit
/// distance of the first window within `max_distance`.
///
/// Both inputs must be ASCII digits.
pub fn find_fuzzy(clean_text: &str, clean_id: &str, max_distance: usize) -> Option<usize> {
    let width = clean_id.len();
    if width == 0 || clean_text.len() < width {
        return None;
    }
    (0..=clean_text.len() - width)
        .map(|start| strsim::levenshtein(&clean_text[start..start + width], clean_id))
        .find(|distance| *distance <= max_distance)
}

/// Matches extracted text against an expected identity number.
pub struct IdentityMatcher {
    extractor: Arc<TextExtractor>,
    language_hint: String,
    id_length: usize,
    max_edit_distance: usize,
    snippet_chars: usize,
}

impl IdentityMatcher {
    pub fn new(
        extractor: Arc<TextExtractor>,
        config: &MatcherConfig,
        language_hint: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            language_hint: language_hint.into(),
            id_length: config.id_length,
            max_edit_distance: config.max_edit_distance,
            snippet_chars: config.snippet_chars,
        }
    }

    /// Match already-extracted text. Pure; never fails.
    ///
    /// An expected number without any digits never matches, since the empty
    /// string would otherwise be "contained" in every document.
    pub fn match_text(&self, extraction: &ExtractionResult, expected: &str) -> IdentityMatchResult {
        let clean_text = digits_only(&extraction.text);
        let clean_id = digits_only(expected);

        let method = if clean_id.is_empty() {
            MatchMethod::NotFound
        } else if clean_text.contains(&clean_id) {
            MatchMethod::Exact
        } else if clean_id.len() == self.id_length {
            find_fuzzy(&clean_text, &clean_id, self.max_edit_distance)
                .map_or(MatchMethod::NotFound, |distance| MatchMethod::Fuzzy { distance })
        } else {
            MatchMethod::NotFound
        };

        let message = match method {
            MatchMethod::Exact => MATCHED.to_owned(),
            MatchMethod::Fuzzy { distance } => {
                format!("{MATCHED} approximately ({distance} character edits)")
            }
            MatchMethod::NotFound => NOT_FOUND.to_owned(),
        };
        debug!(
            expected_len = clean_id.len(),
            text_digits = clean_text.len(),
            ?method,
            "identity match evaluated"
        );

        IdentityMatchResult {
            is_match: method != MatchMethod::NotFound,
            message,
            method,
            confidence: extraction.confidence,
            extracted_text_snippet: extraction.text.chars().take(self.snippet_chars).collect(),
        }
    }

    /// Extract `source` and match it against `expected`.
    ///
    /// # Errors
    ///
    /// Extraction failures and timeouts; a readable document that simply
    /// lacks the number is `Ok` with `is_match == false`.
    #[instrument(skip_all, fields(document = source.name(), expected_len = expected.len()))]
    pub async fn verify_identity(
        &self,
        source: DocumentSource,
        expected: &str,
    ) -> Result<IdentityMatchResult> {
        let extraction = self.extractor.extract(source, &self.language_hint).await?;
        let result = self.match_text(&extraction, expected);
        info!(
            matched = result.is_match,
            method = ?result.method,
            confidence = result.confidence,
            "identity verification finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedOcr, png};

    const ID: &str = "1-1037-02071-81-1";

    fn matcher() -> IdentityMatcher {
        IdentityMatcher::new(
            Arc::new(TextExtractor::with_backend(Arc::new(ScriptedOcr::new("")))),
            &MatcherConfig::default(),
            "tha+eng",
        )
    }

    fn extraction(text: &str) -> ExtractionResult {
        ExtractionResult {
            text: text.to_owned(),
            confidence: 81.0,
            is_digital_source: false,
            words: None,
        }
    }

    #[test]
    fn digits_only_strips_everything_else() {
        assert_eq!(digits_only("1-1037 02071/81.1"), "1103702071811");
        assert_eq!(digits_only("เลขประจำตัว"), "");
    }

    #[test]
    fn verbatim_number_is_exact() {
        let result =
            matcher().match_text(&extraction("ID: 1 1037 02071 81 1 exp 11/01/2570"), ID);
        assert!(result.is_match);
        assert_eq!(result.method, MatchMethod::Exact);
        assert_eq!(result.confidence, 81.0);
    }

    // The tolerance is the single most consequential constant in the
    // pipeline: 4 edits in a 13-digit window match, 5 do not.
    #[test]
    fn four_substitutions_match() {
        let result = matcher().match_text(&extraction("55 1903802571011 7"), ID);
        assert!(result.is_match);
        assert_eq!(result.method, MatchMethod::Fuzzy { distance: 4 });
    }

    #[test]
    fn five_substitutions_do_not_match() {
        let result = matcher().match_text(&extraction("99 2104703072812 99"), ID);
        assert!(!result.is_match);
        assert_eq!(result.method, MatchMethod::NotFound);
        assert_eq!(result.message, NOT_FOUND);
    }

    #[test]
    fn fuzzy_only_applies_to_full_length_ids() {
        // 12 digits: containment only, no fuzzy pass.
        let result = matcher().match_text(&extraction("110370207180"), "110370207181");
        assert!(!result.is_match);
        let result = matcher().match_text(&extraction("xx 110370207181 xx"), "110370207181");
        assert_eq!(result.method, MatchMethod::Exact);
    }

    #[test]
    fn first_window_within_tolerance_wins() {
        // Window at offset 0 is 2 edits away, the exact copy comes later but
        // containment is checked first.
        let result = matcher().match_text(&extraction("1103702071899 1103702071811"), ID);
        assert_eq!(result.method, MatchMethod::Exact);
        assert_eq!(find_fuzzy("11037020718991103", "1103702071811", 4), Some(2));
    }

    #[test]
    fn expected_without_digits_never_matches() {
        let result = matcher().match_text(&extraction("1103702071811"), "n/a");
        assert!(!result.is_match);
        let result = matcher().match_text(&extraction(""), "");
        assert!(!result.is_match);
    }

    #[test]
    fn short_text_has_no_windows() {
        assert_eq!(find_fuzzy("11037", "1103702071811", 4), None);
        assert_eq!(find_fuzzy("", "", 4), None);
    }

    #[test]
    fn snippet_is_bounded() {
        let long = "ก".repeat(500);
        let result = matcher().match_text(&extraction(&long), ID);
        assert_eq!(result.extracted_text_snippet.chars().count(), 100);
    }

    #[tokio::test]
    async fn verify_identity_runs_extraction() {
        let backend = Arc::new(ScriptedOcr::new("เลขประจำตัวประชาชน 1 1037 02071 81 1"));
        let matcher = IdentityMatcher::new(
            Arc::new(TextExtractor::with_backend(backend.clone())),
            &MatcherConfig::default(),
            "tha+eng",
        );
        let source = DocumentSource::from_bytes("card.png", png(40, 20));
        let result = matcher.verify_identity(source, ID).await.unwrap();
        assert!(result.is_match);
        assert_eq!(backend.calls(), 1);
    }
}
