// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idverify-document — everything that turns a submitted document into text
// and structured facts.
//
// Provides image normalisation for OCR (grayscale, binarise, sharpen,
// bounded resize), text extraction from photographs (OCR) and digital PDFs
// (text layer), point-based document classification against a static
// catalog, and type-specific field extraction.

pub mod classify;
pub mod extract;
pub mod fields;
pub mod image;
pub mod pdf;
pub mod scan;

// Re-export the primary types so callers can use `idverify_document::TextExtractor` etc.
pub use classify::{DocumentCatalog, DocumentClassifier, DocumentTypeDefinition};
pub use extract::{DocumentSource, TextExtractor};
pub use fields::{FieldValue, LandArea, extract_fields};
pub use self::image::{ImageNormalizer, Normalized};
pub use pdf::PdfReader;
pub use scan::{OcrBackend, OcrOutput, OcrParams, UnavailableOcrBackend};

#[cfg(feature = "ocr")]
pub use scan::{OcrConfig, OcrsBackend};
