use std::time::Duration;

/// Errors surfaced at the record-store boundary.
///
/// Callers match on the variant to decide severity: `Construction` and
/// `Initialization` are fatal, `Contention` is transient and scoped to one
/// operation, `Validation` means the input never reached storage.
#[derive(Debug)]
pub enum StoreError {
    /// Unsupported backend or an unusable storage path at open time.
    Construction(String),
    /// Schema setup failed or the storage file is inaccessible.
    Initialization(String),
    /// Malformed input rejected before any mutation.
    Validation(String),
    /// The store stayed locked after the retry budget was spent.
    Contention {
        operation: &'static str,
        attempts: u32,
        waited: Duration,
    },
    /// An operation was attempted before `initialize` or after `close`.
    NotInitialized,
    /// Any other failure reported by the underlying storage engine.
    Storage(String),
}

impl StoreError {
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }

    pub fn initialization(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Initialization(format!("{context}: {err}"))
    }

    /// `true` for errors worth retrying on a later, independent invocation.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Construction(msg) => write!(f, "cannot open store: {msg}"),
            Self::Initialization(msg) => write!(f, "cannot initialize store: {msg}"),
            Self::Validation(msg) => write!(f, "invalid input: {msg}"),
            Self::Contention {
                operation,
                attempts,
                waited,
            } => write!(
                f,
                "{operation}: store is locked by another process \
                 (gave up after {attempts} attempts, {}ms)",
                waited.as_millis()
            ),
            Self::NotInitialized => write!(f, "store is not initialized"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
