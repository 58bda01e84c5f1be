// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification record stores.
//
// Writes are optimistic: the caller hands back the state it read, and the
// store only accepts it if the stored version is unchanged. A successful
// write bumps the version. Concurrent submissions from one user therefore
// cannot under-count failures or slip past a lockout.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use idverify_core::error::{IdVerifyError, Result};
use idverify_core::types::{UserId, VerificationAttemptState, VerificationStatus};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

/// Persistence for per-user [`VerificationAttemptState`].
///
/// Implementations are synchronous; async callers run them on
/// `tokio::task::spawn_blocking`.
pub trait VerificationRecordStore: Send + Sync {
    /// # Errors
    ///
    /// [`IdVerifyError::UserNotFound`] when no record exists.
    fn read(&self, user_id: &UserId) -> Result<VerificationAttemptState>;

    /// Replace the record if its stored version still equals
    /// `state.version`; returns the stored state with the bumped version.
    ///
    /// # Errors
    ///
    /// [`IdVerifyError::UserNotFound`] or [`IdVerifyError::VersionConflict`].
    fn write(
        &self,
        user_id: &UserId,
        state: &VerificationAttemptState,
    ) -> Result<VerificationAttemptState>;

    /// Provision a fresh NEW/0 record for an account.
    fn create(&self, user_id: &UserId) -> Result<VerificationAttemptState>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Mutex-guarded map, for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<UserId, VerificationAttemptState>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<UserId, VerificationAttemptState>>> {
        self.records
            .lock()
            .map_err(|_| IdVerifyError::Database("record store mutex poisoned".into()))
    }
}

impl VerificationRecordStore for MemoryRecordStore {
    fn read(&self, user_id: &UserId) -> Result<VerificationAttemptState> {
        self.records()?
            .get(user_id)
            .cloned()
            .ok_or_else(|| IdVerifyError::UserNotFound(user_id.to_string()))
    }

    fn write(
        &self,
        user_id: &UserId,
        state: &VerificationAttemptState,
    ) -> Result<VerificationAttemptState> {
        let mut records = self.records()?;
        let stored = records
            .get_mut(user_id)
            .ok_or_else(|| IdVerifyError::UserNotFound(user_id.to_string()))?;
        if stored.version != state.version {
            return Err(IdVerifyError::VersionConflict {
                user_id: user_id.to_string(),
                expected: state.version,
            });
        }
        *stored = VerificationAttemptState {
            version: state.version + 1,
            ..state.clone()
        };
        Ok(stored.clone())
    }

    fn create(&self, user_id: &UserId) -> Result<VerificationAttemptState> {
        let mut records = self.records()?;
        if records.contains_key(user_id) {
            return Err(IdVerifyError::Database(format!("record for {user_id} already exists")));
        }
        let state = VerificationAttemptState::default();
        records.insert(user_id.clone(), state.clone());
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// SQLite store
// ---------------------------------------------------------------------------

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS verification_records (
        user_id TEXT PRIMARY KEY,
        attempts INTEGER NOT NULL DEFAULT 0,
        locked_until TEXT,
        status TEXT NOT NULL DEFAULT 'NEW',
        note TEXT,
        documents TEXT NOT NULL DEFAULT 'null',
        submitted_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    )
"#;

/// Record store backed by a SQLite database.
///
/// The compare-and-swap is a single `UPDATE ... WHERE version = ?`, so it
/// also holds across processes sharing the database file.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the record database at the given path, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| IdVerifyError::Database(format!("open: {e}")))?;

        // WAL lets status reads proceed while a verification is being written.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| IdVerifyError::Database(format!("WAL pragma: {e}")))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| IdVerifyError::Database(format!("busy timeout: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| IdVerifyError::Database(format!("create table: {e}")))?;

        info!("verification record database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IdVerifyError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| IdVerifyError::Database(format!("create table: {e}")))?;

        debug!("in-memory verification record database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IdVerifyError::Database("connection mutex poisoned".into()))
    }

    fn stored_version(conn: &Connection, user_id: &UserId) -> Result<Option<u64>> {
        conn.query_row(
            "SELECT version FROM verification_records WHERE user_id = ?1",
            params![user_id.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map(|version| version.map(|v| v as u64))
        .map_err(|e| IdVerifyError::Database(format!("read version: {e}")))
    }
}

impl VerificationRecordStore for SqliteRecordStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    fn read(&self, user_id: &UserId) -> Result<VerificationAttemptState> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT attempts, locked_until, status, note, documents, submitted_at, version
                 FROM verification_records WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| {
                    Ok(RawRecord {
                        attempts: row.get(0)?,
                        locked_until: row.get(1)?,
                        status: row.get(2)?,
                        note: row.get(3)?,
                        documents: row.get(4)?,
                        submitted_at: row.get(5)?,
                        version: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(|e| IdVerifyError::Database(format!("read record: {e}")))?;

        match row {
            Some(raw) => raw.into_state(),
            None => Err(IdVerifyError::UserNotFound(user_id.to_string())),
        }
    }

    #[instrument(skip(self, state), fields(user_id = %user_id, version = state.version))]
    fn write(
        &self,
        user_id: &UserId,
        state: &VerificationAttemptState,
    ) -> Result<VerificationAttemptState> {
        let documents = serde_json::to_string(&state.documents)
            .map_err(|e| IdVerifyError::Database(format!("serialize documents: {e}")))?;
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE verification_records
                 SET attempts = ?1, locked_until = ?2, status = ?3, note = ?4,
                     documents = ?5, submitted_at = ?6, version = version + 1
                 WHERE user_id = ?7 AND version = ?8",
                params![
                    state.attempts,
                    state.locked_until.map(|t| t.to_rfc3339()),
                    state.status.as_str(),
                    state.note,
                    documents,
                    state.submitted_at.map(|t| t.to_rfc3339()),
                    user_id.as_str(),
                    state.version as i64,
                ],
            )
            .map_err(|e| IdVerifyError::Database(format!("update record: {e}")))?;

        if rows == 0 {
            return match Self::stored_version(&conn, user_id)? {
                None => Err(IdVerifyError::UserNotFound(user_id.to_string())),
                Some(_) => Err(IdVerifyError::VersionConflict {
                    user_id: user_id.to_string(),
                    expected: state.version,
                }),
            };
        }

        debug!(attempts = state.attempts, status = %state.status.as_str(), "record written");
        Ok(VerificationAttemptState {
            version: state.version + 1,
            ..state.clone()
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    fn create(&self, user_id: &UserId) -> Result<VerificationAttemptState> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO verification_records (user_id) VALUES (?1)",
            params![user_id.as_str()],
        )
        .map_err(|e| IdVerifyError::Database(format!("insert record: {e}")))?;

        info!("verification record created");
        Ok(VerificationAttemptState::default())
    }
}

/// Column values as stored, before parsing.
struct RawRecord {
    attempts: u32,
    locked_until: Option<String>,
    status: String,
    note: Option<String>,
    documents: String,
    submitted_at: Option<String>,
    version: i64,
}

impl RawRecord {
    fn into_state(self) -> Result<VerificationAttemptState> {
        Ok(VerificationAttemptState {
            attempts: self.attempts,
            locked_until: parse_timestamp(self.locked_until)?,
            status: self.status.parse::<VerificationStatus>()?,
            note: self.note,
            documents: serde_json::from_str(&self.documents)
                .map_err(|e| IdVerifyError::Database(format!("parse documents: {e}")))?,
            submitted_at: parse_timestamp(self.submitted_at)?,
            version: self.version as u64,
        })
    }
}

fn parse_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| IdVerifyError::Database(format!("parse timestamp {s:?}: {e}")))
    })
    .transpose()
}
