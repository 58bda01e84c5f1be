// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification attempt controller.
//
// Orchestrates one submission end to end: lock check, manual escalation or
// identity matching, and the optimistic write of the resulting state. Every
// call produces a well-formed `VerifyResponse`; internal errors are logged
// and mapped to plain messages, never returned to the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use idverify_core::config::VerifierConfig;
use idverify_core::error::{IdVerifyError, Result};
use idverify_core::human_errors::humanize_error;
use idverify_core::types::{
    DocumentRef, ErrorClass, IdentityMatchResult, UserId, VerificationAttemptState,
    VerificationId, VerificationStatus,
};
use idverify_document::{DocumentSource, TextExtractor};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::audit::{AuditRecord, AuditedDocument, VerificationAudit, hash_bytes};
use crate::blob::DocumentBlobStore;
use crate::matcher::IdentityMatcher;
use crate::policy::{ActiveLock, AttemptPolicy, Transition};
use crate::store::VerificationRecordStore;

/// A verification submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub user_id: UserId,
    pub documents: Vec<DocumentRef>,
    pub expected_id_number: String,
    #[serde(default)]
    pub force_manual: bool,
}

/// The verdict class of a [`VerifyResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyOutcome {
    Approved,
    PendingReview,
    RetryAllowed,
    Locked,
    /// The account behind the request no longer exists.
    SessionInvalid,
    /// Infrastructure or extraction failure; no attempt was consumed.
    Failed,
}

impl VerifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::PendingReview => "PENDING_REVIEW",
            Self::RetryAllowed => "RETRY_ALLOWED",
            Self::Locked => "LOCKED",
            Self::SessionInvalid => "SESSION_INVALID",
            Self::Failed => "FAILED",
        }
    }
}

/// Answer to a verification submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verification_id: VerificationId,
    pub outcome: VerifyOutcome,
    /// Record status after this submission, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VerificationStatus>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub can_manual: bool,
    pub is_locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_snippet: Option<String>,
}

impl VerifyResponse {
    fn new(verification_id: VerificationId, outcome: VerifyOutcome, message: String) -> Self {
        Self {
            verification_id,
            outcome,
            status: None,
            message,
            attempts: None,
            can_manual: false,
            is_locked: false,
            wait_minutes: None,
            confidence: None,
            extracted_snippet: None,
        }
    }

    fn locked(verification_id: VerificationId, lock: ActiveLock) -> Self {
        Self {
            is_locked: true,
            wait_minutes: Some(lock.wait_minutes),
            ..Self::new(
                verification_id,
                VerifyOutcome::Locked,
                format!(
                    "Too many failed attempts. Please try again in {} minute(s).",
                    lock.wait_minutes
                ),
            )
        }
    }

    fn from_error(verification_id: VerificationId, err: &IdVerifyError) -> Self {
        let outcome = match err.class() {
            ErrorClass::Session => VerifyOutcome::SessionInvalid,
            _ => VerifyOutcome::Failed,
        };
        let human = humanize_error(err);
        Self::new(
            verification_id,
            outcome,
            format!("{} {}", human.message, human.suggestion),
        )
    }
}

/// Account verification state as shown to the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: VerificationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub documents: serde_json::Value,
    pub attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl From<VerificationAttemptState> for StatusView {
    fn from(state: VerificationAttemptState) -> Self {
        Self {
            status: state.status,
            submitted_at: state.submitted_at,
            note: state.note,
            documents: state.documents,
            attempts: state.attempts,
            locked_until: state.locked_until,
        }
    }
}

/// A reviewer's decision on a PENDING verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// Runs verification submissions against a record store.
pub struct VerificationController {
    matcher: Arc<IdentityMatcher>,
    policy: AttemptPolicy,
    records: Arc<dyn VerificationRecordStore>,
    blobs: Arc<dyn DocumentBlobStore>,
    audit: Option<Arc<VerificationAudit>>,
    max_write_retries: u32,
}

impl VerificationController {
    pub fn new(
        config: &VerifierConfig,
        extractor: Arc<TextExtractor>,
        records: Arc<dyn VerificationRecordStore>,
        blobs: Arc<dyn DocumentBlobStore>,
    ) -> Self {
        Self {
            matcher: Arc::new(IdentityMatcher::new(
                extractor,
                &config.matcher,
                config.extraction.language_hint.clone(),
            )),
            policy: AttemptPolicy::new(&config.attempts),
            records,
            blobs,
            audit: None,
            max_write_retries: config.attempts.max_write_retries,
        }
    }

    /// Record every verdict in `audit`.
    pub fn with_audit(mut self, audit: Arc<VerificationAudit>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Process one submission. Never fails; see [`VerifyOutcome`].
    #[instrument(skip_all, fields(
        user_id = %request.user_id,
        documents = request.documents.len(),
        force_manual = request.force_manual,
        verification_id = tracing::field::Empty,
    ))]
    pub async fn verify(&self, request: VerifyRequest) -> VerifyResponse {
        let verification_id = VerificationId::new();
        tracing::Span::current().record("verification_id", tracing::field::display(verification_id));

        let mut audited: Vec<AuditedDocument> = request
            .documents
            .iter()
            .map(|reference| AuditedDocument {
                reference: reference.clone(),
                sha256: None,
            })
            .collect();

        let response = match self.run(verification_id, &request, &mut audited).await {
            Ok(response) => response,
            Err(err) => {
                log_failure(&err);
                VerifyResponse::from_error(verification_id, &err)
            }
        };

        info!(
            outcome = response.outcome.as_str(),
            attempts = ?response.attempts,
            "verification finished"
        );
        self.record_audit(&request.user_id, &response, &audited).await;
        response
    }

    async fn run(
        &self,
        verification_id: VerificationId,
        request: &VerifyRequest,
        audited: &mut [AuditedDocument],
    ) -> Result<VerifyResponse> {
        let state = self.read(&request.user_id).await?;
        if let Some(lock) = self.policy.evaluate_lock(&state, Utc::now()) {
            debug!(wait_minutes = lock.wait_minutes, "submission rejected by active lock");
            return Ok(VerifyResponse::locked(verification_id, lock));
        }

        if request.force_manual {
            return self
                .escalate(verification_id, &request.user_id, &request.documents, state)
                .await;
        }

        if request.documents.is_empty() {
            return Err(IdVerifyError::InvalidDocumentReference(
                "no documents submitted".into(),
            ));
        }

        let best = self
            .match_documents(&request.documents, &request.expected_id_number, audited)
            .await?;
        self.apply_outcome(verification_id, &request.user_id, state, best)
            .await
    }

    /// Match each document in order until one matches. Returns the matching
    /// result, or the last non-matching one.
    ///
    /// A document that cannot be loaded or read is skipped. The submission
    /// fails without consuming an attempt only when no document could be
    /// evaluated at all.
    async fn match_documents(
        &self,
        documents: &[DocumentRef],
        expected: &str,
        audited: &mut [AuditedDocument],
    ) -> Result<IdentityMatchResult> {
        let mut last = None;
        let mut first_error = None;
        for (index, reference) in documents.iter().enumerate() {
            match self.match_document(index, reference, expected, audited).await {
                Ok(result) if result.is_match => return Ok(result),
                Ok(result) => last = Some(result),
                Err(err) => {
                    warn!(document = %reference, error = %err, "document skipped");
                    first_error.get_or_insert(err);
                }
            }
        }
        match (last, first_error) {
            (Some(result), _) => Ok(result),
            (None, Some(err)) => Err(err),
            (None, None) => Err(IdVerifyError::InvalidDocumentReference(
                "no documents submitted".into(),
            )),
        }
    }

    async fn match_document(
        &self,
        index: usize,
        reference: &DocumentRef,
        expected: &str,
        audited: &mut [AuditedDocument],
    ) -> Result<IdentityMatchResult> {
        let source = self.load(reference).await?;
        if let Some(entry) = audited.get_mut(index) {
            entry.sha256 = Some(hash_bytes(source.bytes()));
        }
        self.matcher.verify_identity(source, expected).await
    }

    async fn escalate(
        &self,
        verification_id: VerificationId,
        user_id: &UserId,
        documents: &[DocumentRef],
        mut state: VerificationAttemptState,
    ) -> Result<VerifyResponse> {
        let documents = serde_json::to_value(documents)?;
        let mut retries = 0;
        loop {
            let now = Utc::now();
            if let Some(lock) = self.policy.evaluate_lock(&state, now) {
                return Ok(VerifyResponse::locked(verification_id, lock));
            }
            let next = self.policy.apply_manual(&state, documents.clone(), now);
            match self.write(user_id, next).await {
                Ok(written) => {
                    info!("escalated to manual review");
                    return Ok(VerifyResponse {
                        status: Some(written.status),
                        attempts: Some(written.attempts),
                        ..VerifyResponse::new(
                            verification_id,
                            VerifyOutcome::PendingReview,
                            "Your documents were sent for manual review.".into(),
                        )
                    });
                }
                Err(IdVerifyError::VersionConflict { .. }) if retries < self.max_write_retries => {
                    retries += 1;
                    debug!(retries, "record changed concurrently; re-reading");
                    state = self.read(user_id).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn apply_outcome(
        &self,
        verification_id: VerificationId,
        user_id: &UserId,
        mut state: VerificationAttemptState,
        matched: IdentityMatchResult,
    ) -> Result<VerifyResponse> {
        let mut retries = 0;
        loop {
            let now = Utc::now();
            // A concurrent submission may have imposed a lock since we read.
            if let Some(lock) = self.policy.evaluate_lock(&state, now) {
                return Ok(VerifyResponse::locked(verification_id, lock));
            }
            let (next, transition) = self.policy.apply_outcome(&state, matched.is_match, now);
            match self.write(user_id, next).await {
                Ok(written) => {
                    return Ok(self.transition_response(
                        verification_id,
                        &written,
                        transition,
                        &matched,
                    ));
                }
                Err(IdVerifyError::VersionConflict { .. }) if retries < self.max_write_retries => {
                    retries += 1;
                    debug!(retries, "record changed concurrently; re-reading");
                    state = self.read(user_id).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn transition_response(
        &self,
        verification_id: VerificationId,
        written: &VerificationAttemptState,
        transition: Transition,
        matched: &IdentityMatchResult,
    ) -> VerifyResponse {
        let (outcome, message, can_manual, wait_minutes) = match transition {
            Transition::Approved => (
                VerifyOutcome::Approved,
                "Identity verified.".to_owned(),
                false,
                None,
            ),
            Transition::Retry { attempts, can_manual } => {
                let mut message = format!(
                    "{}. Attempt {attempts} of {}.",
                    matched.message,
                    self.policy.lockout_threshold()
                );
                if can_manual {
                    message.push_str(" You can request a manual review instead.");
                }
                (VerifyOutcome::RetryAllowed, message, can_manual, None)
            }
            Transition::Locked { wait_minutes, .. } => (
                VerifyOutcome::Locked,
                format!(
                    "Too many failed attempts. Please try again in {wait_minutes} minute(s)."
                ),
                false,
                Some(wait_minutes),
            ),
        };

        VerifyResponse {
            verification_id,
            outcome,
            status: Some(written.status),
            message,
            attempts: Some(written.attempts),
            can_manual,
            is_locked: wait_minutes.is_some(),
            wait_minutes,
            confidence: Some(matched.confidence),
            extracted_snippet: Some(matched.extracted_text_snippet.clone()),
        }
    }

    /// Current verification state of an account.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn status(&self, user_id: &UserId) -> Result<StatusView> {
        Ok(self.read(user_id).await?.into())
    }

    /// Decide a PENDING verification. Approval resets attempts and clears
    /// any lock; rejection leaves the counters alone.
    ///
    /// # Errors
    ///
    /// [`IdVerifyError::NotAwaitingReview`] unless the record is PENDING.
    #[instrument(skip(self, note), fields(user_id = %user_id, ?decision))]
    pub async fn resolve_review(
        &self,
        user_id: &UserId,
        decision: ReviewDecision,
        note: Option<String>,
    ) -> Result<StatusView> {
        let mut retries = 0;
        loop {
            let state = self.read(user_id).await?;
            if state.status != VerificationStatus::Pending {
                return Err(IdVerifyError::NotAwaitingReview(user_id.to_string()));
            }
            let next = match decision {
                ReviewDecision::Approve => VerificationAttemptState {
                    status: VerificationStatus::Approved,
                    attempts: 0,
                    locked_until: None,
                    note: note.clone(),
                    ..state
                },
                ReviewDecision::Reject => VerificationAttemptState {
                    status: VerificationStatus::Rejected,
                    note: note.clone(),
                    ..state
                },
            };
            match self.write(user_id, next).await {
                Ok(written) => {
                    info!(status = written.status.as_str(), "manual review resolved");
                    return Ok(written.into());
                }
                Err(IdVerifyError::VersionConflict { .. }) if retries < self.max_write_retries => {
                    retries += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    // -- Blocking collaborators ------------------------------------------------

    async fn read(&self, user_id: &UserId) -> Result<VerificationAttemptState> {
        let records = Arc::clone(&self.records);
        let user_id = user_id.clone();
        blocking(move || records.read(&user_id)).await
    }

    async fn write(
        &self,
        user_id: &UserId,
        state: VerificationAttemptState,
    ) -> Result<VerificationAttemptState> {
        let records = Arc::clone(&self.records);
        let user_id = user_id.clone();
        blocking(move || records.write(&user_id, &state)).await
    }

    async fn load(&self, reference: &DocumentRef) -> Result<DocumentSource> {
        let blobs = Arc::clone(&self.blobs);
        let reference = reference.clone();
        blocking(move || blobs.load(&reference)).await
    }

    async fn record_audit(
        &self,
        user_id: &UserId,
        response: &VerifyResponse,
        documents: &[AuditedDocument],
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        let audit = Arc::clone(audit);
        let user_id = user_id.clone();
        let outcome = response.outcome.as_str();
        let confidence = response.confidence;
        let snippet = response.extracted_snippet.clone();
        let documents = documents.to_vec();
        let result = blocking(move || {
            audit.record(&AuditRecord {
                user_id: &user_id,
                outcome,
                documents: &documents,
                confidence,
                snippet: snippet.as_deref(),
            })
        })
        .await;
        if let Err(err) = result {
            warn!(error = %err, "failed to record verification audit entry");
        }
    }
}

/// Run synchronous store work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| IdVerifyError::Database(format!("blocking task failed: {e}")))?
}

fn log_failure(err: &IdVerifyError) {
    match err.class() {
        ErrorClass::Extraction => warn!(error = %err, "document could not be read; no attempt consumed"),
        ErrorClass::Session => warn!(error = %err, "verification for unknown account"),
        ErrorClass::Caller => warn!(error = %err, "verification request rejected"),
        ErrorClass::Degraded | ErrorClass::Infrastructure => {
            error!(error = %err, "verification failed")
        }
    }
}
