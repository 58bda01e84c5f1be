// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for applicants.
//
// Internal error text never crosses the service boundary: every technical
// error is mapped to a plain message with a suggestion. The severity drives
// how the verdict is presented.

use crate::error::IdVerifyError;

/// Severity of an error from the applicant's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary service problem; submitting again may work.
    Transient,
    /// The applicant must do something (retake the photo, sign in again).
    ActionRequired,
    /// Cannot be fixed by resubmitting the same thing.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    /// Whether resubmitting unchanged might succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert an `IdVerifyError` into a `HumanError` safe to show an applicant.
pub fn humanize_error(err: &IdVerifyError) -> HumanError {
    match err {
        IdVerifyError::Preprocessing(_) => HumanError {
            message: "We had trouble preparing your photo.".into(),
            suggestion: "We'll still try to read it. If verification fails, retake the photo in good light.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IdVerifyError::Image(_) => HumanError {
            message: "We couldn't open this image.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try a JPEG or PNG photo of the card.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IdVerifyError::Ocr(_) | IdVerifyError::Extraction(_) => HumanError {
            message: "We couldn't read the text on your document.".into(),
            suggestion: "Please try again. Make sure the whole card is in frame, flat, and in focus.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IdVerifyError::Pdf(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try exporting it again, or upload a photo of the document instead.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IdVerifyError::ExtractionTimeout(_) => HumanError {
            message: "Reading your document took too long.".into(),
            suggestion: "Please try again in a moment. A smaller, sharper photo is processed faster.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IdVerifyError::UnsupportedDocument(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!("Upload a JPEG, PNG or PDF file instead. (File: {detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IdVerifyError::InvalidDocumentReference(_) => HumanError {
            message: "We couldn't find the file you uploaded.".into(),
            suggestion: "Please upload the document again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IdVerifyError::UnknownDocumentType(_) | IdVerifyError::Config(_) => HumanError {
            message: "Verification isn't available right now.".into(),
            suggestion: "This is a problem on our side. Please try again later or contact support.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        IdVerifyError::NotAwaitingReview(_) => HumanError {
            message: "This verification isn't waiting for a review.".into(),
            suggestion: "Refresh the status; it may already have been decided.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IdVerifyError::UserNotFound(_) => HumanError {
            message: "Your session is no longer valid.".into(),
            suggestion: "Please sign in again, then resubmit your document.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IdVerifyError::VersionConflict { .. } => HumanError {
            message: "Another submission for your account is being processed.".into(),
            suggestion: "Please wait for it to finish, then check your verification status.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IdVerifyError::Database(_) | IdVerifyError::Serialization(_) => HumanError {
            message: "We couldn't save your verification.".into(),
            suggestion: "Please try again in a few minutes.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IdVerifyError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "We couldn't find the file you uploaded.".into(),
                    suggestion: "Please upload the document again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading your file.".into(),
                    suggestion: "Please try again in a few minutes.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_is_transient() {
        let human = humanize_error(&IdVerifyError::ExtractionTimeout(Duration::from_secs(30)));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_user_asks_to_sign_in() {
        let human = humanize_error(&IdVerifyError::UserNotFound("u-9".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("sign in"));
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = IdVerifyError::Database("disk I/O error at page 4412".into());
        let human = humanize_error(&err);
        assert!(!human.message.contains("4412"));
        assert!(!human.suggestion.contains("4412"));
    }

    #[test]
    fn unknown_type_is_permanent() {
        let human = humanize_error(&IdVerifyError::UnknownDocumentType("PASSPORT".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }

    #[test]
    fn review_of_decided_case_is_not_retriable() {
        let human = humanize_error(&IdVerifyError::NotAwaitingReview("u-3".into()));
        assert!(!human.retriable);
        assert!(!human.message.contains("u-3"));
    }
}
