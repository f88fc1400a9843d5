use std::collections::BTreeSet;
use std::sync::Mutex;

use chrono::Utc;

use super::{CommandStore, PurgeScope, prepare_record};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::history::CommandRecord;
use crate::normalize::normalize_directory;

pub const BACKEND_NAME: &str = "memory";

/// Process-local store with the same semantics as the `SQLite` backend.
///
/// Nothing survives the process; useful for tests and dry runs of the CLI.
pub struct MemoryStore {
    rows: Mutex<Vec<(u64, CommandRecord)>>,
    next_seq: Mutex<u64>,
    open: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub const fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_seq: Mutex::new(0),
            open: false,
        }
    }

    /// Registry constructor. The configuration carries nothing this backend needs.
    ///
    /// # Errors
    /// Never fails; the signature matches [`super::BackendCtor`].
    #[allow(clippy::unnecessary_wraps)]
    pub fn boxed(_config: &StoreConfig) -> Result<Box<dyn CommandStore>, StoreError> {
        Ok(Box::new(Self::new()))
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<(u64, CommandRecord)>>, StoreError> {
        if !self.open {
            return Err(StoreError::NotInitialized);
        }
        self.rows
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".into()))
    }

    fn sorted_newest_first(mut rows: Vec<(u64, CommandRecord)>) -> Vec<CommandRecord> {
        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.timestamp.cmp(&a.timestamp).then(seq_b.cmp(seq_a))
        });
        rows.into_iter().map(|(_, r)| r).collect()
    }
}

impl CommandStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND_NAME
    }

    fn initialize(&mut self) -> Result<(), StoreError> {
        self.open = true;
        Ok(())
    }

    fn save_command(&self, record: &CommandRecord) -> Result<String, StoreError> {
        let prepared = prepare_record(record)?;
        let mut rows = self.rows()?;
        if rows.iter().any(|(_, r)| r.id == prepared.id) {
            return Err(StoreError::Validation(format!(
                "record id {:?} already exists",
                prepared.id
            )));
        }
        let mut next = self
            .next_seq
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".into()))?;
        *next += 1;
        let id = prepared.id.clone();
        rows.push((*next, prepared));
        Ok(id)
    }

    fn get_commands_by_directory(&self, directory: &str) -> Result<Vec<CommandRecord>, StoreError> {
        let directory = normalize_directory(directory);
        let matching = self
            .rows()?
            .iter()
            .filter(|(_, r)| r.directory == directory)
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(matching))
    }

    fn get_directories_with_history(&self) -> Result<Vec<String>, StoreError> {
        let dirs: BTreeSet<String> = self
            .rows()?
            .iter()
            .map(|(_, r)| r.directory.clone())
            .collect();
        Ok(dirs.into_iter().collect())
    }

    fn search_commands(&self, pattern: &str, directory: &str) -> Result<Vec<CommandRecord>, StoreError> {
        let mut records = self.get_commands_by_directory(directory)?;
        records.retain(|r| r.command.contains(pattern));
        Ok(records)
    }

    fn cleanup_old_commands(&self, retention_days: i64) -> Result<usize, StoreError> {
        let scope = PurgeScope::for_retention(retention_days, Utc::now())?;
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|(_, r)| !scope.includes(r));
        Ok(before - rows.len())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }
}
