// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idverify-identity — Identity-number matching, the attempt/lockout state
// machine, verification record stores, and the audit trail.

pub mod audit;
pub mod blob;
pub mod controller;
pub mod matcher;
pub mod policy;
pub mod store;

#[cfg(test)]
mod testing;

pub use audit::{AuditEntry, AuditRecord, AuditedDocument, VerificationAudit, hash_bytes};
pub use blob::{DocumentBlobStore, FsBlobStore, MemoryBlobStore};
pub use controller::{
    ReviewDecision, StatusView, VerificationController, VerifyOutcome, VerifyRequest,
    VerifyResponse,
};
pub use matcher::{IdentityMatcher, digits_only, find_fuzzy};
pub use policy::{ActiveLock, AttemptPolicy, Transition};
pub use store::{MemoryRecordStore, SqliteRecordStore, VerificationRecordStore};
