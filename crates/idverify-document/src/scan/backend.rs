// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR backend trait. The text extractor only talks to this seam, so engines
// can be swapped (or scripted in tests) without touching the pipeline.

use image::DynamicImage;
use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::WordDetail;

use crate::scan::charset::THAI_LATIN_ALLOWED_CHARS;

/// Per-call recognition parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrParams {
    /// Tesseract-style language hint, e.g. `tha+eng`.
    pub language_hint: String,
    /// Restricts the characters the engine may emit. `None` means unrestricted.
    pub allowed_chars: Option<String>,
}

impl OcrParams {
    /// Parameters for Thai identity documents: the given language hint and the
    /// Thai+Latin allow-list.
    pub fn thai_latin(language_hint: impl Into<String>) -> Self {
        Self {
            language_hint: language_hint.into(),
            allowed_chars: Some(THAI_LATIN_ALLOWED_CHARS.to_owned()),
        }
    }
}

/// Raw recognition output, before whitespace collapsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// 0–100 when the engine reports one.
    pub confidence: Option<f32>,
    pub words: Option<Vec<WordDetail>>,
}

/// A text recognition engine.
///
/// Implementations are blocking; the extractor runs them on a blocking
/// thread under a timeout. They must be `Send + Sync` so one engine can serve
/// concurrent requests.
pub trait OcrBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Recognise all text in `image`.
    fn recognize(&self, image: &DynamicImage, params: &OcrParams) -> Result<OcrOutput>;
}

/// Placeholder used when the crate is built without an OCR engine.
///
/// Every call fails with [`IdVerifyError::Ocr`], so PDF documents still work
/// while photographed documents are reported as unreadable by the engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableOcrBackend;

impl OcrBackend for UnavailableOcrBackend {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn recognize(&self, _image: &DynamicImage, _params: &OcrParams) -> Result<OcrOutput> {
        Err(IdVerifyError::Ocr(
            "no OCR engine compiled in; rebuild with the `ocr` feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thai_latin_params_carry_allow_list() {
        let params = OcrParams::thai_latin("tha+eng");
        assert_eq!(params.language_hint, "tha+eng");
        assert!(params.allowed_chars.as_deref().unwrap().contains('ก'));
    }

    #[test]
    fn unavailable_backend_always_fails() {
        let image = DynamicImage::new_luma8(4, 4);
        let err = UnavailableOcrBackend
            .recognize(&image, &OcrParams::thai_latin("tha"))
            .unwrap_err();
        assert!(matches!(err, IdVerifyError::Ocr(_)));
    }
}
