//! `SQLite` backend: one database file shared by every shell process.
//!
//! Cross-process safety comes from `SQLite`'s own file locking. WAL mode lets
//! readers run while a writer commits, every write transaction starts
//! `IMMEDIATE` so it never has to upgrade a read lock, and
//! [`with_retry`](crate::store::retry::with_retry) absorbs `SQLITE_BUSY` within the
//! configured timeout.

mod queries;
mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OpenFlags};

use super::retry::{RetryPolicy, with_retry};
use super::{CommandStore, PurgeScope, prepare_record};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::history::CommandRecord;
use crate::normalize::normalize_directory;

pub use schema::SCHEMA_VERSION;

pub const BACKEND_NAME: &str = "sqlite";

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

const fn busy(operation: &'static str) -> StoreError {
    StoreError::Contention {
        operation,
        attempts: 1,
        waited: Duration::ZERO,
    }
}

/// Map an engine error during initialization: busy stays retryable,
/// everything else is an initialization failure.
pub(super) fn init_error(err: rusqlite::Error) -> StoreError {
    if is_busy(&err) {
        busy("initialize store")
    } else {
        StoreError::initialization("create schema", err)
    }
}

fn classify(operation: &'static str, err: rusqlite::Error) -> StoreError {
    if is_busy(&err) {
        busy(operation)
    } else {
        StoreError::storage(operation, err)
    }
}

/// Handle on one history database file.
pub struct SqliteStore {
    path: PathBuf,
    policy: RetryPolicy,
    conn: Option<Connection>,
}

impl SqliteStore {
    /// Resolve the storage path. Touches nothing on disk beyond a metadata lookup;
    /// the file is created by [`CommandStore::initialize`].
    ///
    /// # Errors
    /// Returns [`StoreError::Construction`] if the path is empty, cannot be made
    /// absolute, or names an existing directory.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.db_path.as_os_str().is_empty() {
            return Err(StoreError::Construction("storage path is empty".into()));
        }
        let path = std::path::absolute(&config.db_path).map_err(|e| {
            StoreError::Construction(format!(
                "cannot resolve storage path {}: {e}",
                config.db_path.display()
            ))
        })?;
        if path.is_dir() {
            return Err(StoreError::Construction(format!(
                "storage path {} is a directory",
                path.display()
            )));
        }
        Ok(Self {
            path,
            policy: RetryPolicy::new(config.timeout),
            conn: None,
        })
    }

    /// Registry constructor.
    ///
    /// # Errors
    /// Same as [`SqliteStore::open`].
    pub fn boxed(config: &StoreConfig) -> Result<Box<dyn CommandStore>, StoreError> {
        Ok(Box::new(Self::open(config)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::NotInitialized)
    }

    fn check_location(&self) -> Result<(), StoreError> {
        if self.path.to_string_lossy().contains('\0') {
            return Err(StoreError::Initialization(format!(
                "storage path {} contains a NUL byte",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent()
            && !parent.is_dir()
        {
            return Err(StoreError::Initialization(format!(
                "parent directory {} does not exist",
                parent.display()
            )));
        }
        if let Ok(meta) = std::fs::metadata(&self.path)
            && meta.permissions().readonly()
        {
            return Err(StoreError::Initialization(format!(
                "storage file {} is read-only",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            StoreError::initialization(&format!("open {}", self.path.display()), e)
        })?;
        conn.busy_timeout(self.policy.per_attempt_wait())
            .map_err(|e| StoreError::initialization("set busy timeout", e))?;
        Ok(conn)
    }
}

impl CommandStore for SqliteStore {
    fn backend(&self) -> &'static str {
        BACKEND_NAME
    }

    fn initialize(&mut self) -> Result<(), StoreError> {
        if self.conn.is_some() {
            return Ok(());
        }
        self.check_location()?;
        let conn = self.connect()?;
        with_retry("initialize store", &self.policy, || {
            conn.execute_batch(schema::CONNECTION_PRAGMAS)
                .map_err(init_error)
        })?;
        with_retry("initialize store", &self.policy, || schema::ensure(&conn))?;
        tracing::debug!(path = %self.path.display(), "store initialized");
        self.conn = Some(conn);
        Ok(())
    }

    fn save_command(&self, record: &CommandRecord) -> Result<String, StoreError> {
        let prepared = prepare_record(record)?;
        let timestamp_ns = prepared
            .timestamp
            .timestamp_nanos_opt()
            .ok_or_else(|| StoreError::Validation("timestamp out of range".into()))?;
        let duration_ns = i64::try_from(prepared.duration.as_nanos())
            .map_err(|_| StoreError::Validation("duration out of range".into()))?;
        let conn = self.conn()?;
        let row = queries::Row {
            record: &prepared,
            timestamp_ns,
            duration_ns,
        };

        with_retry("save command", &self.policy, || {
            queries::insert_record(conn, &row).map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Validation(format!("record id {:?} already exists", prepared.id))
                } else {
                    classify("save command", e)
                }
            })
        })?;
        tracing::debug!(id = %prepared.id, directory = %prepared.directory, "saved command");
        Ok(prepared.id)
    }

    fn get_commands_by_directory(&self, directory: &str) -> Result<Vec<CommandRecord>, StoreError> {
        let directory = normalize_directory(directory);
        let conn = self.conn()?;
        with_retry("list commands", &self.policy, || {
            queries::select_records(conn, &directory, None).map_err(|e| classify("list commands", e))
        })
    }

    fn get_directories_with_history(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        with_retry("list directories", &self.policy, || {
            queries::select_directories(conn).map_err(|e| classify("list directories", e))
        })
    }

    fn search_commands(&self, pattern: &str, directory: &str) -> Result<Vec<CommandRecord>, StoreError> {
        let directory = normalize_directory(directory);
        let pattern = (!pattern.is_empty()).then_some(pattern);
        let conn = self.conn()?;
        with_retry("search commands", &self.policy, || {
            queries::select_records(conn, &directory, pattern)
                .map_err(|e| classify("search commands", e))
        })
    }

    fn cleanup_old_commands(&self, retention_days: i64) -> Result<usize, StoreError> {
        let scope = PurgeScope::for_retention(retention_days, Utc::now())?;
        let cutoff_ns = match scope {
            PurgeScope::All => None,
            // Cutoffs before 1677 cannot match any stored row.
            PurgeScope::AtOrBefore(cutoff) => Some(cutoff.timestamp_nanos_opt().unwrap_or(i64::MIN)),
        };
        let conn = self.conn()?;
        let deleted = with_retry("cleanup", &self.policy, || {
            queries::delete_records(conn, cutoff_ns).map_err(|e| classify("cleanup", e))
        })?;
        tracing::debug!(retention_days, deleted, "purged old commands");
        Ok(deleted)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| StoreError::storage("close store", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests_cleanup;
#[cfg(test)]
mod tests_search;
