use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::init_error;
use crate::error::StoreError;

/// Stored in `PRAGMA user_version` once the schema below exists.
pub const SCHEMA_VERSION: i64 = 1;

/// Per-connection settings. `journal_mode` persists in the file; the rest
/// must be applied on every open.
pub const CONNECTION_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
";

pub const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS commands (
        seq           INTEGER PRIMARY KEY AUTOINCREMENT,
        id            TEXT    NOT NULL UNIQUE,
        command       TEXT    NOT NULL CHECK (length(command) > 0),
        directory     TEXT    NOT NULL,
        timestamp_ns  INTEGER NOT NULL,
        shell         TEXT    NOT NULL,
        exit_code     INTEGER NOT NULL,
        duration_ns   INTEGER NOT NULL CHECK (duration_ns >= 0)
    );
    CREATE INDEX IF NOT EXISTS idx_commands_directory_time
        ON commands(directory, timestamp_ns DESC, seq DESC);
    CREATE INDEX IF NOT EXISTS idx_commands_time
        ON commands(timestamp_ns);

    CREATE TABLE IF NOT EXISTS command_tags (
        command_seq   INTEGER NOT NULL REFERENCES commands(seq) ON DELETE CASCADE,
        position      INTEGER NOT NULL,
        tag           TEXT    NOT NULL,
        PRIMARY KEY (command_seq, position),
        UNIQUE (command_seq, tag)
    );
";

fn user_version(conn: &Connection) -> Result<i64, StoreError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(init_error)
}

fn tables_present(conn: &Connection) -> Result<bool, StoreError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type = 'table' AND name IN ('commands', 'command_tags')",
            [],
            |row| row.get(0),
        )
        .map_err(init_error)?;
    Ok(count == 2)
}

fn check_version(version: i64) -> Result<(), StoreError> {
    if version > SCHEMA_VERSION {
        return Err(StoreError::Initialization(format!(
            "database schema version {version} is newer than this build supports ({SCHEMA_VERSION})"
        )));
    }
    Ok(())
}

/// Create the schema if it is missing and verify its version.
///
/// The fast path only reads, so concurrent hook processes opening an
/// existing database never contend for the write lock here.
pub(super) fn ensure(conn: &Connection) -> Result<(), StoreError> {
    let version = user_version(conn)?;
    check_version(version)?;
    if version == SCHEMA_VERSION && tables_present(conn)? {
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(init_error)?;
    // Another process may have finished creation while we waited for the lock.
    check_version(user_version(&tx)?)?;
    tx.execute_batch(CREATE_SCHEMA).map_err(init_error)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))
        .map_err(init_error)?;
    tx.commit().map_err(init_error)?;
    tracing::debug!(version = SCHEMA_VERSION, "history schema ready");
    Ok(())
}
