// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the identity verification pipeline.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdVerifyError;

/// Identifier of the account whose verification state is being mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlates one verification submission across logs and the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationId(pub Uuid);

impl VerificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document archetypes known to the classifier catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentTypeId {
    IdCard,
    HouseRegistration,
    LandTitle,
    FarmLicense,
    MedicalCertificate,
    BankStatement,
    Photo,
}

impl DocumentTypeId {
    pub const ALL: [DocumentTypeId; 7] = [
        Self::IdCard,
        Self::HouseRegistration,
        Self::LandTitle,
        Self::FarmLicense,
        Self::MedicalCertificate,
        Self::BankStatement,
        Self::Photo,
    ];

    /// Wire name, e.g. `ID_CARD`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdCard => "ID_CARD",
            Self::HouseRegistration => "HOUSE_REGISTRATION",
            Self::LandTitle => "LAND_TITLE",
            Self::FarmLicense => "FARM_LICENSE",
            Self::MedicalCertificate => "MEDICAL_CERTIFICATE",
            Self::BankStatement => "BANK_STATEMENT",
            Self::Photo => "PHOTO",
        }
    }
}

impl std::fmt::Display for DocumentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentTypeId {
    type Err = IdVerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| IdVerifyError::UnknownDocumentType(s.to_owned()))
    }
}

/// Lifecycle of an account's identity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Nothing approved yet; automated attempts may be in progress.
    #[default]
    New,
    /// Waiting for a human reviewer.
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = IdVerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(IdVerifyError::Database(format!(
                "unknown verification status {other:?}"
            ))),
        }
    }
}

/// Reference to an uploaded document, resolved to bytes by a blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(pub String);

impl DocumentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-account verification state, persisted by a record store.
///
/// `version` is bumped by every successful write and is what the store
/// compares against to reject concurrent read-modify-write races.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationAttemptState {
    pub attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub status: VerificationStatus,
    pub note: Option<String>,
    /// Opaque record of the submitted document references.
    pub documents: serde_json::Value,
    pub submitted_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Default for VerificationAttemptState {
    fn default() -> Self {
        Self {
            attempts: 0,
            locked_until: None,
            status: VerificationStatus::New,
            note: None,
            documents: serde_json::Value::Null,
            submitted_at: None,
            version: 0,
        }
    }
}

impl VerificationAttemptState {
    /// Whether automated verification is suspended at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Per-word OCR detail, when the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDetail {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Text pulled out of a document, before any interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Whitespace-collapsed text.
    pub text: String,
    /// 0–100, OCR-native scale.
    pub confidence: f32,
    /// True for PDFs with a text layer.
    pub is_digital_source: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordDetail>>,
}

/// Outcome of scoring text against one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub valid: bool,
    pub expected_type: String,
    /// Normalised to 0–1.
    pub confidence: f64,
    pub score: f64,
    pub max_score: f64,
    pub issues: Vec<String>,
    pub keywords_found: usize,
    pub total_keywords: usize,
}

/// How an identity number was located in the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Fuzzy { distance: usize },
    NotFound,
}

/// Outcome of matching a document against an expected identity number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMatchResult {
    #[serde(rename = "match")]
    pub is_match: bool,
    pub message: String,
    pub method: MatchMethod,
    /// Carried over from the extraction step (0–100).
    pub confidence: f32,
    /// Bounded prefix of the extracted text, for audit and debugging.
    pub extracted_text_snippet: String,
}

/// Classification of errors for verdict selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Pre-processing fell back to the raw input; work continues.
    Degraded,
    /// The OCR engine or PDF reader failed, or timed out.
    Extraction,
    /// Caller or catalog mismatch; should not happen in normal operation.
    Caller,
    /// The account behind the request does not exist.
    Session,
    /// Store unavailable or contended.
    Infrastructure,
}
