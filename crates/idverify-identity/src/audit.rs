// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification audit trail — append-only SQLite log of every verdict.
//
// Schema:
//   verification_audit(
//     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp     TEXT    NOT NULL,   -- RFC 3339
//     user_id       TEXT    NOT NULL,
//     outcome       TEXT    NOT NULL,   -- e.g. "APPROVED", "LOCKED"
//     documents     TEXT    NOT NULL,   -- JSON array of {reference, sha256}
//     confidence    REAL,               -- OCR confidence, when matching ran
//     snippet       TEXT                -- bounded extracted text
//   )
//
// Documents are fingerprinted with SHA-256 so a decision can later be tied
// to the exact bytes that were judged without keeping the bytes here.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::{DocumentRef, UserId};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS verification_audit (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT    NOT NULL,
    user_id     TEXT    NOT NULL,
    outcome     TEXT    NOT NULL,
    documents   TEXT    NOT NULL,
    confidence  REAL,
    snippet     TEXT
);";

/// Convert a `rusqlite::Error` into an `IdVerifyError::Database`.
fn db_err(e: rusqlite::Error) -> IdVerifyError {
    IdVerifyError::Database(e.to_string())
}

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A submitted document as recorded in the trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedDocument {
    pub reference: DocumentRef,
    /// `None` when the verdict was reached without loading the document.
    pub sha256: Option<String>,
}

/// One verdict to append.
#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub user_id: &'a UserId,
    pub outcome: &'a str,
    pub documents: &'a [AuditedDocument],
    pub confidence: Option<f32>,
    pub snippet: Option<&'a str>,
}

/// A stored entry, as returned by queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_id: String,
    pub outcome: String,
    pub documents: Vec<AuditedDocument>,
    pub confidence: Option<f64>,
    pub snippet: Option<String>,
}

/// Append-only verdict log.
pub struct VerificationAudit {
    conn: Mutex<Connection>,
}

impl VerificationAudit {
    /// Open (or create) the audit database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;").map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("verification audit opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory verification audit opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IdVerifyError::Database("audit mutex poisoned".into()))
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id, outcome = record.outcome))]
    pub fn record(&self, record: &AuditRecord<'_>) -> Result<()> {
        let documents = serde_json::to_string(record.documents)?;
        self.conn()?
            .execute(
                "INSERT INTO verification_audit
                 (timestamp, user_id, outcome, documents, confidence, snippet)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Utc::now().to_rfc3339(),
                    record.user_id.as_str(),
                    record.outcome,
                    documents,
                    record.confidence.map(f64::from),
                    record.snippet,
                ],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Entries for one user, oldest first.
    pub fn entries_for_user(&self, user_id: &UserId) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, user_id, outcome, documents, confidence, snippet
                 FROM verification_audit
                 WHERE user_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![user_id.as_str()], |row| {
                Ok((
                    AuditEntry {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        user_id: row.get(2)?,
                        outcome: row.get(3)?,
                        documents: Vec::new(),
                        confidence: row.get(5)?,
                        snippet: row.get(6)?,
                    },
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (mut entry, documents) = row.map_err(db_err)?;
            entry.documents = serde_json::from_str(&documents)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Return the total number of entries in the trail.
    pub fn count(&self) -> Result<u64> {
        self.conn()?
            .query_row("SELECT COUNT(*) FROM verification_audit", [], |row| row.get(0))
            .map_err(db_err)
    }
}
