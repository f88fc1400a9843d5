//! User-directory resolution.
//!
//! When `DIRHIST_HOME` is set, it replaces **all** platform-native user
//! directories (config and data).
//!
//! Priority for the history database:
//!   1. `DIRHIST_DB_PATH` env var (applied by [`crate::config::StoreConfig`])
//!   2. `DIRHIST_HOME/history.db`
//!   3. `dirs::data_local_dir()/dirhist/history.db`

use std::path::PathBuf;

pub const DB_FILE_NAME: &str = "history.db";

fn resolve_user_path(dirs_fallback: Option<PathBuf>) -> Option<PathBuf> {
    if let Ok(home) = std::env::var("DIRHIST_HOME")
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }
    dirs_fallback
}

/// Base directory for `config.toml`.
pub fn user_dir() -> Option<PathBuf> {
    resolve_user_path(dirs::config_dir().map(|d| d.join("dirhist")))
}

/// Base directory for the history database.
pub fn user_data_dir() -> Option<PathBuf> {
    resolve_user_path(dirs::data_local_dir().map(|d| d.join("dirhist")))
}

/// Default database location, before config-file and env overrides.
pub fn default_db_path() -> Option<PathBuf> {
    user_data_dir().map(|d| d.join(DB_FILE_NAME))
}

/// Location of the global config file.
pub fn config_file() -> Option<PathBuf> {
    user_dir().map(|d| d.join("config.toml"))
}
