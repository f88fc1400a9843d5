//! The persistent record store.
//!
//! [`CommandStore`] is the one interface every backend implements;
//! [`BackendRegistry`] maps backend names from configuration to constructor
//! functions so callers never name a concrete backend type.
//!
//! Lifecycle of a handle: `open` → `initialize` → operations → `close`.
//! Every shell hook process runs that sequence once, so handles are cheap and
//! hold no cached state beyond the connection itself.

pub mod memory;
pub mod retry;
pub mod sqlite;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::history::CommandRecord;
use crate::normalize::normalize_directory;

/// Operations shared by all store backends.
pub trait CommandStore: Send {
    /// Registry name of this backend.
    fn backend(&self) -> &'static str;

    /// Create the schema if absent. Calling it again is a no-op.
    ///
    /// # Errors
    /// Returns [`StoreError::Initialization`] if the storage location is
    /// inaccessible or the schema cannot be created.
    fn initialize(&mut self) -> Result<(), StoreError>;

    /// Persist one record atomically, assigning an ID when `record.id` is
    /// empty. Returns the stored ID.
    ///
    /// # Errors
    /// `Validation` for a malformed record, `Contention` when the store stays
    /// locked past the retry budget, `Storage` for other failures.
    fn save_command(&self, record: &CommandRecord) -> Result<String, StoreError>;

    /// All records for `directory` (normalized first), most recent first.
    ///
    /// # Errors
    /// Returns an error if the query fails. An unknown directory is `Ok(vec![])`.
    fn get_commands_by_directory(&self, directory: &str) -> Result<Vec<CommandRecord>, StoreError>;

    /// Distinct normalized directories with at least one record, in ascending order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    fn get_directories_with_history(&self) -> Result<Vec<String>, StoreError>;

    /// Records in `directory` whose command contains `pattern`
    /// (case-sensitive). An empty pattern matches every record.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    fn search_commands(&self, pattern: &str, directory: &str) -> Result<Vec<CommandRecord>, StoreError>;

    /// Delete records at least `retention_days` days old; `0` deletes
    /// everything. Returns the number of deleted records.
    ///
    /// # Errors
    /// `Validation` for a negative `retention_days` (nothing is deleted),
    /// otherwise `Contention`/`Storage` if the purge fails.
    fn cleanup_old_commands(&self, retention_days: i64) -> Result<usize, StoreError>;

    /// Release the handle. Repeated calls succeed and do nothing.
    ///
    /// # Errors
    /// Returns an error if the engine fails to close cleanly.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Constructor stored in the registry.
pub type BackendCtor = fn(&StoreConfig) -> Result<Box<dyn CommandStore>, StoreError>;

/// Name → constructor table for store backends.
#[derive(Clone)]
pub struct BackendRegistry {
    backends: BTreeMap<String, BackendCtor>,
}

impl BackendRegistry {
    /// An empty registry.
    pub const fn empty() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register(&mut self, name: &str, ctor: BackendCtor) {
        self.backends.insert(name.to_ascii_lowercase(), ctor);
    }

    /// Registered backend names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// Construct the backend named `kind` (case-insensitive).
    ///
    /// # Errors
    /// Returns [`StoreError::Construction`] for an unknown `kind` or when the
    /// backend rejects the configuration.
    pub fn open(&self, kind: &str, config: &StoreConfig) -> Result<Box<dyn CommandStore>, StoreError> {
        let ctor = self
            .backends
            .get(&kind.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                StoreError::Construction(format!(
                    "unsupported backend {kind:?} (available: {})",
                    self.names().join(", ")
                ))
            })?;
        ctor(config)
    }
}

impl Default for BackendRegistry {
    /// The built-in backends: `sqlite` and `memory`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(sqlite::BACKEND_NAME, sqlite::SqliteStore::boxed);
        registry.register(memory::BACKEND_NAME, memory::MemoryStore::boxed);
        registry
    }
}

/// Open the backend named by `config.backend` from the default registry.
///
/// The returned handle still needs [`CommandStore::initialize`].
///
/// # Errors
/// Same as [`BackendRegistry::open`].
pub fn open(config: &StoreConfig) -> Result<Box<dyn CommandStore>, StoreError> {
    BackendRegistry::default().open(&config.backend, config)
}

/// Open and initialize in one step: the common path for one-shot processes.
///
/// # Errors
/// Construction or initialization errors from the backend.
pub fn open_initialized(config: &StoreConfig) -> Result<Box<dyn CommandStore>, StoreError> {
    let mut store = open(config)?;
    store.initialize()?;
    Ok(store)
}

/// Fresh globally unique record ID (random UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validate `record` and return the exact row the write path will persist:
/// directory re-normalized, ID assigned if it was empty.
///
/// # Errors
/// Returns [`StoreError::Validation`] if the record breaks an invariant.
pub fn prepare_record(record: &CommandRecord) -> Result<CommandRecord, StoreError> {
    record.validate()?;
    let mut prepared = record.clone();
    prepared.directory = normalize_directory(&record.directory);
    if prepared.id.trim().is_empty() {
        prepared.id = generate_id();
    }
    Ok(prepared)
}

/// Which records a cleanup call removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeScope {
    /// `retention_days == 0`: every record, whatever its timestamp.
    All,
    /// Records with `timestamp <= cutoff` (the boundary is inclusive).
    AtOrBefore(DateTime<Utc>),
}

impl PurgeScope {
    /// Translate a retention period into a purge scope relative to `now`.
    ///
    /// # Errors
    /// Returns [`StoreError::Validation`] for a negative `retention_days`.
    pub fn for_retention(retention_days: i64, now: DateTime<Utc>) -> Result<Self, StoreError> {
        if retention_days < 0 {
            return Err(StoreError::Validation(format!(
                "retention_days must not be negative (got {retention_days})"
            )));
        }
        if retention_days == 0 {
            return Ok(Self::All);
        }
        let cutoff = chrono::Duration::try_days(retention_days)
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(Self::AtOrBefore(cutoff))
    }

    pub fn includes(self, record: &CommandRecord) -> bool {
        match self {
            Self::All => true,
            Self::AtOrBefore(cutoff) => record.timestamp <= cutoff,
        }
    }
}
