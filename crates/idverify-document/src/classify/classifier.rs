// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Point-based document classifier.
//
// Scores extracted text against one catalog definition:
//
// - 30 points per required pattern (missing patterns still count towards the
//   maximum and are reported as issues),
// - up to 50 points for keywords (5 per keyword, scaled by the share found),
// - 20 points for plausible text length.
//
// The weights are fixed; each type's `min_confidence` was tuned against them.

use std::sync::Arc;

use idverify_core::error::IdVerifyError;
use idverify_core::types::{ClassificationResult, DocumentTypeId};
use tracing::{debug, error, instrument};

use crate::classify::catalog::{DocumentCatalog, DocumentTypeDefinition};

const PATTERN_POINTS: f64 = 30.0;
const POINTS_PER_KEYWORD: usize = 5;
const MAX_KEYWORD_POINTS: usize = 50;
const LENGTH_POINTS: f64 = 20.0;
const PLAUSIBLE_LENGTH: usize = 50;
const SHORT_LENGTH: usize = 20;

/// Scores text against the definitions in a shared [`DocumentCatalog`].
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    catalog: Arc<DocumentCatalog>,
}

impl DocumentClassifier {
    pub fn new(catalog: Arc<DocumentCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    /// Classify `text` as `expected`.
    ///
    /// Never fails: a type missing from the catalog yields an invalid result
    /// whose only issue names the unknown type.
    #[instrument(skip(self, text), fields(expected = %expected, chars = text.chars().count()))]
    pub fn classify(&self, text: &str, expected: DocumentTypeId) -> ClassificationResult {
        match self.catalog.get(expected) {
            Some(definition) => score(text, definition),
            None => unknown_type(expected.as_str()),
        }
    }

    /// Classify against a type given by wire name, e.g. `"LAND_TITLE"`.
    pub fn classify_named(&self, text: &str, expected: &str) -> ClassificationResult {
        match expected.parse::<DocumentTypeId>() {
            Ok(type_id) => self.classify(text, type_id),
            Err(_) => unknown_type(expected),
        }
    }

    /// Score `text` against every catalog entry, best match first.
    ///
    /// Equal confidence is broken by the larger maximum score, so a type with
    /// more evidence behind it (an ID card) outranks one with almost none (a
    /// photo). Remaining ties keep catalog order.
    pub fn identify(&self, text: &str) -> Vec<ClassificationResult> {
        let mut ranked: Vec<ClassificationResult> =
            self.catalog.iter().map(|definition| score(text, definition)).collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(b.max_score.total_cmp(&a.max_score))
        });
        ranked
    }
}

fn unknown_type(name: &str) -> ClassificationResult {
    let err = IdVerifyError::UnknownDocumentType(name.to_owned());
    error!(%err, "classification requested for a type outside the catalog");
    ClassificationResult {
        valid: false,
        expected_type: name.to_owned(),
        confidence: 0.0,
        score: 0.0,
        max_score: 0.0,
        issues: vec![err.to_string()],
        keywords_found: 0,
        total_keywords: 0,
    }
}

fn score(text: &str, definition: &DocumentTypeDefinition) -> ClassificationResult {
    let mut score = 0.0;
    let mut max_score = 0.0;
    let mut issues = Vec::new();

    for pattern in &definition.required_patterns {
        max_score += PATTERN_POINTS;
        if pattern.is_match(text) {
            score += PATTERN_POINTS;
        } else {
            issues.push(format!("Required pattern not found: {}", pattern.as_str()));
        }
    }

    let total_keywords = definition.keywords.len();
    let lowered = text.to_lowercase();
    let keywords_found = definition
        .keywords
        .iter()
        .filter(|keyword| lowered.contains(&keyword.to_lowercase()))
        .count();
    let keyword_points = (total_keywords * POINTS_PER_KEYWORD).min(MAX_KEYWORD_POINTS) as f64;
    max_score += keyword_points;
    if total_keywords > 0 {
        score += keywords_found as f64 / total_keywords as f64 * keyword_points;
        if keywords_found * 2 < total_keywords {
            issues.push(format!(
                "Only {keywords_found}/{total_keywords} expected keywords found"
            ));
        }
    }

    let length = text.chars().count();
    max_score += LENGTH_POINTS;
    if length > PLAUSIBLE_LENGTH {
        score += LENGTH_POINTS;
    } else if length > SHORT_LENGTH {
        score += LENGTH_POINTS / 2.0;
        issues.push(format!("Text is shorter than expected ({length} characters)"));
    } else {
        issues.push(format!(
            "Text is too short, the document is probably unreadable ({length} characters)"
        ));
    }

    let confidence = normalised(score, max_score);
    let valid = confidence >= definition.min_confidence;
    debug!(
        score,
        max_score,
        confidence,
        valid,
        keywords_found,
        total_keywords,
        "document scored"
    );

    ClassificationResult {
        valid,
        expected_type: definition.type_id.as_str().to_owned(),
        confidence,
        score,
        max_score,
        issues,
        keywords_found,
        total_keywords,
    }
}

/// `score / max_score`, or 0 when there is nothing to score against.
fn normalised(score: f64, max_score: f64) -> f64 {
    if max_score > 0.0 { score / max_score } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_CARD_TEXT: &str = "บัตรประจำตัวประชาชน Thai National ID Card \
        เลขประจำตัวประชาชน Identification Number 1 1037 02071 81 1 \
        ชื่อตัวและชื่อสกุล นาย สมชาย ใจดี เกิดวันที่ 12 ม.ค. 2530 Date of Birth 12 Jan. 1987";

    fn builtin() -> DocumentClassifier {
        DocumentClassifier::new(Arc::new(DocumentCatalog::builtin().unwrap()))
    }

    fn custom(patterns: &[&str], keywords: &[&str], min: f64) -> DocumentClassifier {
        let definition = DocumentTypeDefinition::new(
            DocumentTypeId::BankStatement,
            "ทดสอบ",
            "Test",
            patterns,
            keywords,
            min,
        )
        .unwrap();
        DocumentClassifier::new(Arc::new(
            DocumentCatalog::with_definitions(vec![definition]).unwrap(),
        ))
    }

    #[test]
    fn full_id_card_scores_perfectly() {
        let result = builtin().classify(ID_CARD_TEXT, DocumentTypeId::IdCard);
        assert!(result.valid, "{result:?}");
        assert_eq!(result.expected_type, "ID_CARD");
        assert_eq!(result.max_score, 30.0 + 35.0 + 20.0);
        assert_eq!(result.score, result.max_score);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.keywords_found, 7);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn weights_are_exact() {
        // 1 pattern hit (30), 2 of 4 keywords (10 of 20), 14 chars (0 of 20).
        let classifier = custom(&[r"\d{3}"], &["alpha", "beta", "gamma", "delta"], 0.5);
        let result = classifier.classify("alpha BETA 123", DocumentTypeId::BankStatement);
        assert_eq!(result.max_score, 70.0);
        assert_eq!(result.score, 40.0);
        assert!((result.confidence - 40.0 / 70.0).abs() < 1e-12);
        assert!(result.valid);
        assert_eq!(result.keywords_found, 2);
        // Exactly half is not "fewer than half".
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].contains("probably unreadable"));
    }

    #[test]
    fn keyword_points_are_capped_at_fifty() {
        let keywords = [
            "k01", "k02", "k03", "k04", "k05", "k06", "k07", "k08", "k09", "k10", "k11", "k12",
        ];
        let classifier = custom(&[], &keywords, 0.5);
        let result = classifier.classify("k01 k02 k03", DocumentTypeId::BankStatement);
        assert_eq!(result.max_score, 50.0 + 20.0);
        assert_eq!(result.score, 3.0 / 12.0 * 50.0);
        assert!(result.issues.iter().any(|i| i == "Only 3/12 expected keywords found"));
    }

    #[test]
    fn length_bands() {
        let classifier = custom(&[], &[], 0.0);
        let short = classifier.classify(&"x".repeat(20), DocumentTypeId::BankStatement);
        let medium = classifier.classify(&"x".repeat(21), DocumentTypeId::BankStatement);
        let long = classifier.classify(&"x".repeat(51), DocumentTypeId::BankStatement);
        assert_eq!(short.score, 0.0);
        assert_eq!(medium.score, 10.0);
        assert!(medium.issues[0].starts_with("Text is shorter than expected"));
        assert_eq!(long.score, 20.0);
        assert!(long.issues.is_empty());
    }

    #[test]
    fn keyword_shortfall_is_informational() {
        // Pattern, 1 of 7 keywords, long text: 55 / 85 clears ID_CARD's 0.6.
        let text = "Identification Number 1 1037 02071 81 1 issued at the district office";
        let result = builtin().classify(text, DocumentTypeId::IdCard);
        assert!((result.score - 55.0).abs() < 1e-9);
        assert!(result.valid);
        assert!(result.issues.iter().any(|i| i.contains("1/7")));
    }

    #[test]
    fn missing_pattern_is_reported_and_can_invalidate() {
        let text = "บัตรประจำตัวประชาชน เกิดวันที่ Date of Birth with no number at all here";
        let result = builtin().classify(text, DocumentTypeId::IdCard);
        assert!(!result.valid);
        assert!(result.issues.iter().any(|i| i.starts_with("Required pattern not found")));
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = builtin();
        let first = classifier.classify(ID_CARD_TEXT, DocumentTypeId::LandTitle);
        let second = classifier.classify(ID_CARD_TEXT, DocumentTypeId::LandTitle);
        assert_eq!(first, second);
    }

    #[test]
    fn adding_a_pattern_match_never_lowers_the_score() {
        let classifier = builtin();
        let base = "โฉนดที่ดิน เลขที่ดิน ระวาง ออกให้ ณ สำนักงานที่ดินจังหวัดเชียงใหม่ เนื้อที่";
        let with_area = format!("{base} 5-2-40.5");
        let before = classifier.classify(base, DocumentTypeId::LandTitle);
        let after = classifier.classify(&with_area, DocumentTypeId::LandTitle);
        assert!(after.score >= before.score);
        assert!(after.confidence >= before.confidence);
    }

    #[test]
    fn unknown_type_is_an_invalid_result() {
        let result = builtin().classify_named("anything", "PASSPORT");
        assert!(!result.valid);
        assert_eq!(result.expected_type, "PASSPORT");
        assert_eq!(result.issues, vec!["unknown document type: PASSPORT".to_owned()]);

        let narrow = custom(&[], &[], 0.0);
        let result = narrow.classify("anything", DocumentTypeId::IdCard);
        assert!(!result.valid);
        assert_eq!(result.max_score, 0.0);
    }

    #[test]
    fn named_lookup_accepts_lowercase() {
        let result = builtin().classify_named(ID_CARD_TEXT, "id-card");
        assert_eq!(result.expected_type, "ID_CARD");
        assert!(result.valid);
    }

    #[test]
    fn photo_has_only_the_length_check() {
        let classifier = builtin();
        let empty = classifier.classify("", DocumentTypeId::Photo);
        assert_eq!(empty.max_score, 20.0);
        assert_eq!(empty.confidence, 0.0);
        assert!(empty.valid, "PHOTO accepts anything");
        assert_eq!(empty.total_keywords, 0);
    }

    #[test]
    fn zero_max_score_gives_zero_confidence() {
        assert_eq!(normalised(0.0, 0.0), 0.0);
        assert_eq!(normalised(10.0, 20.0), 0.5);
    }

    #[test]
    fn identify_ranks_the_id_card_first() {
        let ranked = builtin().identify(ID_CARD_TEXT);
        assert_eq!(ranked.len(), DocumentTypeId::ALL.len());
        assert_eq!(ranked[0].expected_type, "ID_CARD");
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
