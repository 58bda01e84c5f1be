// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Optical character recognition — the backend seam, the Thai+Latin
// character allow-list, and the `ocrs`-based engine.

pub mod backend;
pub mod charset;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use backend::{OcrBackend, OcrOutput, OcrParams, UnavailableOcrBackend};
pub use charset::THAI_LATIN_ALLOWED_CHARS;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrsBackend};
