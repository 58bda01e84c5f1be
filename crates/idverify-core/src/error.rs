// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for idverify.

use std::time::Duration;

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all idverify operations.
#[derive(Debug, Error)]
pub enum IdVerifyError {
    // -- Pre-processing (recoverable) --
    #[error("image pre-processing failed: {0}")]
    Preprocessing(String),

    // -- Extraction errors --
    #[error("image decoding failed: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("text extraction timed out after {0:?}")]
    ExtractionTimeout(Duration),

    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    // -- Caller / configuration errors --
    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("invalid document reference: {0}")]
    InvalidDocumentReference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("verification for {0} is not awaiting manual review")]
    NotAwaitingReview(String),

    // -- Verification record store --
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("verification record for {user_id} changed concurrently (expected version {expected})")]
    VersionConflict { user_id: String, expected: u64 },

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IdVerifyError {
    /// Coarse grouping used to pick a verdict and a log level.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Preprocessing(_) => ErrorClass::Degraded,
            Self::Image(_)
            | Self::Ocr(_)
            | Self::Pdf(_)
            | Self::Extraction(_)
            | Self::ExtractionTimeout(_)
            | Self::UnsupportedDocument(_) => ErrorClass::Extraction,
            Self::UnknownDocumentType(_)
            | Self::InvalidDocumentReference(_)
            | Self::NotAwaitingReview(_)
            | Self::Config(_) => ErrorClass::Caller,
            Self::UserNotFound(_) => ErrorClass::Session,
            Self::VersionConflict { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorClass::Infrastructure,
        }
    }

    /// True for failures raised by the OCR engine or PDF reader.
    pub fn is_extraction_failure(&self) -> bool {
        self.class() == ErrorClass::Extraction
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IdVerifyError>;
