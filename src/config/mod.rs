//! Store configuration.
//!
//! One explicit [`StoreConfig`] value is built at startup and handed to the
//! store constructor and every collaborator; nothing reads configuration
//! from global state afterwards.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `[store]` section of `{user_dir}/config.toml`
//! 3. environment: `DIRHIST_BACKEND`, `DIRHIST_DB_PATH`,
//!    `DIRHIST_RETENTION_DAYS`, `DIRHIST_TIMEOUT_MS`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::paths;

pub const DEFAULT_BACKEND: &str = "sqlite";
pub const DEFAULT_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Everything the store and its callers need to know about persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Registry name of the backend (`sqlite`, `memory`).
    pub backend: String,
    /// Location of the database file.
    pub db_path: PathBuf,
    /// Age in days after which `cleanup` purges records. `0` purges everything.
    pub retention_days: u32,
    /// Upper bound on how long one operation waits for a lock.
    pub timeout: Duration,
}

impl StoreConfig {
    /// Defaults for everything except the database path.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            db_path: db_path.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Load configuration from the user config file and the process environment.
    ///
    /// # Errors
    /// Returns an error if the config file is malformed, a value is out of
    /// range, or no database path can be determined.
    pub fn load() -> anyhow::Result<Self> {
        let global = paths::config_file();
        Self::load_from(global.as_deref(), paths::default_db_path(), |key| {
            std::env::var(key).ok()
        })
    }

    /// Load configuration from explicit sources. Useful for testing.
    ///
    /// A missing `global_config` file is not an error.
    ///
    /// # Errors
    /// Same as [`StoreConfig::load`].
    pub fn load_from(
        global_config: Option<&Path>,
        default_db: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut backend = DEFAULT_BACKEND.to_string();
        let mut db_path = default_db;
        let mut retention_days = i64::from(DEFAULT_RETENTION_DAYS);
        let mut timeout_ms = duration_to_ms(DEFAULT_TIMEOUT);

        if let Some(path) = global_config
            && let Some(section) = read_store_section(path)?
        {
            if let Some(b) = section.backend {
                backend = b;
            }
            if let Some(p) = section.path {
                db_path = Some(resolve_relative_to(path, p));
            }
            if let Some(days) = section.retention_days {
                retention_days = days;
            }
            if let Some(ms) = section.timeout_ms {
                timeout_ms = ms;
            }
        }

        if let Some(b) = env("DIRHIST_BACKEND").filter(|v| !v.is_empty()) {
            backend = b;
        }
        if let Some(p) = env("DIRHIST_DB_PATH").filter(|v| !v.is_empty()) {
            db_path = Some(PathBuf::from(p));
        }
        if let Some(v) = env("DIRHIST_RETENTION_DAYS") {
            retention_days = v
                .trim()
                .parse()
                .with_context(|| format!("DIRHIST_RETENTION_DAYS is not an integer: {v:?}"))?;
        }
        if let Some(v) = env("DIRHIST_TIMEOUT_MS") {
            timeout_ms = v
                .trim()
                .parse()
                .with_context(|| format!("DIRHIST_TIMEOUT_MS is not an integer: {v:?}"))?;
        }

        let db_path =
            db_path.ok_or_else(|| anyhow::anyhow!("cannot determine history DB path"))?;
        Ok(Self {
            backend,
            db_path,
            retention_days: validate_retention(retention_days)?,
            timeout: validate_timeout(timeout_ms)?,
        })
    }
}

/// Reject retention values the store must never see.
///
/// # Errors
/// Returns an error for negative values or values above `u32::MAX`.
pub fn validate_retention(days: i64) -> anyhow::Result<u32> {
    if days < 0 {
        anyhow::bail!("retention_days must not be negative (got {days})");
    }
    u32::try_from(days).with_context(|| format!("retention_days is too large: {days}"))
}

fn validate_timeout(ms: i64) -> anyhow::Result<Duration> {
    if ms <= 0 {
        anyhow::bail!("timeout_ms must be positive (got {ms})");
    }
    Ok(Duration::from_millis(ms.unsigned_abs()))
}

fn duration_to_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Private: parsed representation of the config file.
#[derive(serde::Deserialize, Default)]
struct FileConfig {
    store: Option<StoreSection>,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSection {
    backend: Option<String>,
    path: Option<PathBuf>,
    retention_days: Option<i64>,
    timeout_ms: Option<i64>,
}

fn read_store_section(path: &Path) -> anyhow::Result<Option<StoreSection>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read config file: {}", path.display())));
        }
    };
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg.store)
}

/// Relative `path` entries in the config file are relative to the file itself.
fn resolve_relative_to(config_file: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    config_file
        .parent()
        .map_or_else(|| path.clone(), |dir| dir.join(&path))
}
