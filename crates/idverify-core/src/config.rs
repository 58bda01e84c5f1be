// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verifier configuration. Defaults reproduce the tuned pipeline constants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IdVerifyError, Result};

/// Settings for the whole verification pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub normalizer: NormalizerConfig,
    pub extraction: ExtractionConfig,
    pub matcher: MatcherConfig,
    pub attempts: AttemptConfig,
}

/// Image pre-processing ahead of OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Binary threshold on the 0–255 luma scale.
    pub threshold: u8,
    /// Cap on the longer image side, in pixels.
    pub max_dimension: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            threshold: 128,
            max_dimension: 1000,
        }
    }
}

/// Text extraction (OCR and PDF).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Language hint handed to the OCR backend.
    pub language_hint: String,
    pub timeout_secs: u64,
    /// Confidence assigned to text read from a PDF text layer.
    pub pdf_confidence: f32,
    /// Directory holding the OCR model files; backend default when unset.
    pub model_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            language_hint: "tha+eng".into(),
            timeout_secs: 30,
            pdf_confidence: 95.0,
            model_dir: None,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Identity-number matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Digit count of the national-ID format; fuzzy matching only runs at
    /// exactly this length.
    pub id_length: usize,
    /// Largest Levenshtein distance accepted for a fuzzy window.
    pub max_edit_distance: usize,
    /// Characters of extracted text kept in results.
    pub snippet_chars: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            id_length: 13,
            max_edit_distance: 4,
            snippet_chars: 100,
        }
    }
}

/// Failed-attempt escalation and lockout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptConfig {
    /// Failed attempts that trigger a lockout.
    pub lockout_threshold: u32,
    pub lockout_minutes: i64,
    /// Failed attempts after which manual review is offered.
    pub manual_review_threshold: u32,
    /// Re-reads allowed when a concurrent write wins the race.
    pub max_write_retries: u32,
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            lockout_threshold: 6,
            lockout_minutes: 10,
            manual_review_threshold: 3,
            max_write_retries: 5,
        }
    }
}

impl VerifierConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the attempt state machine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.normalizer.max_dimension == 0 {
            return Err(IdVerifyError::Config("normalizer.max_dimension must be > 0".into()));
        }
        if self.extraction.timeout_secs == 0 {
            return Err(IdVerifyError::Config("extraction.timeout_secs must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.extraction.pdf_confidence) {
            return Err(IdVerifyError::Config(
                "extraction.pdf_confidence must be within 0..=100".into(),
            ));
        }
        if self.matcher.id_length == 0 {
            return Err(IdVerifyError::Config("matcher.id_length must be > 0".into()));
        }
        if self.attempts.lockout_threshold == 0 || self.attempts.lockout_minutes <= 0 {
            return Err(IdVerifyError::Config(
                "attempts.lockout_threshold and attempts.lockout_minutes must be > 0".into(),
            ));
        }
        if self.attempts.manual_review_threshold >= self.attempts.lockout_threshold {
            return Err(IdVerifyError::Config(format!(
                "attempts.manual_review_threshold ({}) must be below lockout_threshold ({})",
                self.attempts.manual_review_threshold, self.attempts.lockout_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = VerifierConfig::default();
        config.validate().unwrap();
        assert_eq!(config.normalizer.threshold, 128);
        assert_eq!(config.normalizer.max_dimension, 1000);
        assert_eq!(config.matcher.max_edit_distance, 4);
        assert_eq!(config.attempts.lockout_threshold, 6);
        assert_eq!(config.attempts.lockout_minutes, 10);
        assert_eq!(config.attempts.manual_review_threshold, 3);
        assert_eq!(config.extraction.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"attempts": {{"lockout_minutes": 15}}}}"#).unwrap();

        let config = VerifierConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.attempts.lockout_minutes, 15);
        assert_eq!(config.attempts.lockout_threshold, 6);
        assert_eq!(config.extraction.language_hint, "tha+eng");
    }

    #[test]
    fn manual_threshold_must_precede_lockout() {
        let mut config = VerifierConfig::default();
        config.attempts.manual_review_threshold = 6;
        assert!(matches!(config.validate(), Err(IdVerifyError::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = VerifierConfig::from_json_file("/nonexistent/idverify.json").unwrap_err();
        assert!(matches!(err, IdVerifyError::Io(_)));
    }
}
