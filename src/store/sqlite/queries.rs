use std::collections::HashMap;
use std::time::Duration;

use chrono::DateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::history::{CommandRecord, Shell, TagSet};

/// A prepared record with its time fields already in storage units.
pub(super) struct Row<'a> {
    pub record: &'a CommandRecord,
    pub timestamp_ns: i64,
    pub duration_ns: i64,
}

/// Insert one record and its tags inside a single `IMMEDIATE` transaction.
pub(super) fn insert_record(conn: &Connection, row: &Row<'_>) -> rusqlite::Result<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO commands
            (id, command, directory, timestamp_ns, shell, exit_code, duration_ns)
         VALUES
            (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.record.id,
            row.record.command,
            row.record.directory,
            row.timestamp_ns,
            row.record.shell.as_str(),
            row.record.exit_code,
            row.duration_ns,
        ],
    )?;
    let seq = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO command_tags (command_seq, position, tag) VALUES (?1, ?2, ?3)",
        )?;
        for (position, tag) in (0_i64..).zip(row.record.tags.iter()) {
            stmt.execute(rusqlite::params![seq, position, tag])?;
        }
    }
    tx.commit()
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, CommandRecord)> {
    let seq: i64 = row.get(0)?;
    let timestamp_ns: i64 = row.get(4)?;
    let shell: String = row.get(5)?;
    let duration_ns: i64 = row.get(7)?;
    Ok((
        seq,
        CommandRecord {
            id: row.get(1)?,
            command: row.get(2)?,
            directory: row.get(3)?,
            timestamp: DateTime::from_timestamp_nanos(timestamp_ns),
            shell: Shell::parse(&shell),
            exit_code: row.get(6)?,
            duration: Duration::from_nanos(u64::try_from(duration_ns).unwrap_or(0)),
            tags: TagSet::new(),
        },
    ))
}

/// Records in `directory` (already normalized), newest first, optionally
/// restricted to commands containing `pattern`.
///
/// Rows and tags are read in one transaction so a concurrent purge cannot
/// leave a record without its tags.
pub(super) fn select_records(
    conn: &Connection,
    directory: &str,
    pattern: Option<&str>,
) -> rusqlite::Result<Vec<CommandRecord>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)?;

    let mut records = {
        let mut stmt = tx.prepare_cached(
            "SELECT seq, id, command, directory, timestamp_ns, shell, exit_code, duration_ns
             FROM commands
             WHERE directory = ?1
               AND (?2 IS NULL OR instr(command, ?2) > 0)
             ORDER BY timestamp_ns DESC, seq DESC",
        )?;
        let rows = stmt.query_map(rusqlite::params![directory, pattern], map_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut tags: HashMap<i64, TagSet> = HashMap::new();
    {
        let mut stmt = tx.prepare_cached(
            "SELECT t.command_seq, t.tag
             FROM command_tags t
             JOIN commands c ON c.seq = t.command_seq
             WHERE c.directory = ?1
               AND (?2 IS NULL OR instr(c.command, ?2) > 0)
             ORDER BY t.command_seq, t.position",
        )?;
        let rows = stmt.query_map(rusqlite::params![directory, pattern], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (seq, tag) = row?;
            tags.entry(seq).or_default().insert(tag);
        }
    }
    tx.commit()?;

    for (seq, record) in &mut records {
        if let Some(set) = tags.remove(seq) {
            record.tags = set;
        }
    }
    Ok(records.into_iter().map(|(_, r)| r).collect())
}

/// Distinct directories in ascending byte order.
pub(super) fn select_directories(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT DISTINCT directory FROM commands ORDER BY directory")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

pub(super) const DELETE_ALL: &str = "DELETE FROM commands";

/// Seeks `idx_commands_time`; tags go with their record via `ON DELETE CASCADE`.
pub(super) const DELETE_AT_OR_BEFORE: &str = "DELETE FROM commands WHERE timestamp_ns <= ?1";

/// Delete records with `timestamp_ns <= cutoff_ns` (every record when
/// `cutoff_ns` is `None`) together with their tags, in one transaction.
/// Returns the number of deleted records.
pub(super) fn delete_records(conn: &Connection, cutoff_ns: Option<i64>) -> rusqlite::Result<usize> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let deleted = match cutoff_ns {
        Some(cutoff) => tx.execute(DELETE_AT_OR_BEFORE, [cutoff])?,
        None => tx.execute(DELETE_ALL, [])?,
    };
    tx.commit()?;
    Ok(deleted)
}
