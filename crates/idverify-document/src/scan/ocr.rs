// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR backend built on the `ocrs` crate, a pure-Rust OCR engine backed by
// neural network models executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// idverify-document = { path = "crates/idverify-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates text regions.
// - **Recognition model** (`text-recognition.rten`): decodes characters.
//
// The default cache directory is `$XDG_CACHE_HOME/ocrs` (typically
// `~/.cache/ocrs`), which is where `ocrs-cli` stores them on first run.
// Recognition quality on Thai script depends entirely on the recognition
// model supplied.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::WordDetail;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::scan::backend::{OcrBackend, OcrOutput, OcrParams};
use crate::scan::charset::THAI_LATIN_ALLOWED_CHARS;

/// Default directory for cached OCR model files.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Configuration for constructing an [`OcrsBackend`].
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
    /// Characters the engine may emit. Fixed for the lifetime of the engine.
    pub allowed_chars: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `dir` to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
            allowed_chars: Some(THAI_LATIN_ALLOWED_CHARS.to_owned()),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (label, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(IdVerifyError::Ocr(format!(
                    "{label} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// `ocrs`-backed [`OcrBackend`].
///
/// Model loading is the expensive step; construct once and share behind an
/// `Arc` for every request.
pub struct OcrsBackend {
    engine: OcrsEngine,
    allowed_chars: Option<String>,
}

impl OcrsBackend {
    /// # Errors
    ///
    /// Returns [`IdVerifyError::Ocr`] if model files are missing or corrupt.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        let load = |path: &Path, label: &str| {
            info!("Loading OCR {label} model");
            Model::load_file(path).map_err(|err| {
                IdVerifyError::Ocr(format!(
                    "failed to load {label} model from {}: {}",
                    path.display(),
                    err
                ))
            })
        };
        let detection_model = load(&config.detection_model_path, "detection")?;
        let recognition_model = load(&config.recognition_model_path, "recognition")?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            allowed_chars: config.allowed_chars.clone(),
            ..Default::default()
        })
        .map_err(|err| IdVerifyError::Ocr(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self {
            engine,
            allowed_chars: config.allowed_chars,
        })
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(OcrConfig::from_dir(dir))
    }
}

impl OcrBackend for OcrsBackend {
    fn name(&self) -> &str {
        "ocrs"
    }

    /// Detect words, group them into lines, and recognise each line.
    ///
    /// `ocrs` reports no per-character scores; the confidence returned is the
    /// percentage of detected lines that produced any text.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage, params: &OcrParams) -> Result<OcrOutput> {
        if params.allowed_chars != self.allowed_chars {
            debug!("per-call allow-list differs from the engine's; engine allow-list applies");
        }

        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            IdVerifyError::Ocr(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| IdVerifyError::Ocr(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| IdVerifyError::Ocr(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| IdVerifyError::Ocr(format!("line recognition failed: {}", err)))?;

        let total_lines = line_texts.len();
        let mut lines = Vec::with_capacity(total_lines);
        let mut words = Vec::new();
        for line in line_texts.iter().flatten() {
            let text = line.to_string();
            if text.trim().is_empty() {
                continue;
            }
            words.extend(line.words().map(|word| WordDetail {
                text: word.to_string(),
                confidence: None,
            }));
            lines.push(text);
        }

        let confidence = if total_lines == 0 {
            0.0
        } else {
            lines.len() as f32 * 100.0 / total_lines as f32
        };
        debug!(
            detected_lines = total_lines,
            recognized_lines = lines.len(),
            confidence,
            "OCR recognition complete"
        );

        Ok(OcrOutput {
            text: lines.join("\n"),
            confidence: Some(confidence),
            words: Some(words),
        })
    }
}
