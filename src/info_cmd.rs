use std::path::Path;

use serde::Serialize;

use dirhist::config::StoreConfig;
use dirhist::paths;
use dirhist::store::{self, CommandStore};

use crate::output;

/// Whether `dirhist record` will be able to write the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum DbAccess {
    Writable,
    ReadOnly,
    /// Missing, but the nearest existing directory accepts new files.
    WillCreate,
    /// Missing, and no existing ancestor accepts new files.
    Blocked,
}

impl DbAccess {
    const fn label(self) -> &'static str {
        match self {
            Self::Writable => "writable",
            Self::ReadOnly => "read-only!",
            Self::WillCreate => "will be created",
            Self::Blocked => "cannot be created!",
        }
    }
}

/// Create and remove a scratch file. `create_new` never follows an existing symlink.
fn dir_accepts_files(dir: &Path) -> bool {
    let scratch = dir.join(format!(".dirhist-access-{}", std::process::id()));
    let created = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&scratch)
        .is_ok();
    if created {
        let _ = std::fs::remove_file(&scratch);
    }
    created
}

fn db_access(path: &Path) -> DbAccess {
    if path.is_file() {
        return if std::fs::OpenOptions::new().append(true).open(path).is_ok() {
            DbAccess::Writable
        } else {
            DbAccess::ReadOnly
        };
    }
    match path.ancestors().skip(1).find(|a| a.is_dir()) {
        Some(dir) if dir_accepts_files(dir) => DbAccess::WillCreate,
        _ => DbAccess::Blocked,
    }
}

#[derive(Serialize)]
struct ConfigFileInfo {
    path: Option<String>,
    exists: bool,
}

#[derive(Serialize)]
struct StoreInfo {
    backend: String,
    env_override: Option<String>,
    path: String,
    exists: bool,
    access: DbAccess,
    retention_days: u32,
    timeout_ms: u128,
}

#[derive(Serialize)]
struct HistoryCounts {
    directories: usize,
    records: usize,
}

#[derive(Serialize)]
struct InfoOutput {
    version: String,
    /// `DIRHIST_HOME` value when set; affects all user-level paths.
    home_override: Option<String>,
    config_file: ConfigFileInfo,
    store: StoreInfo,
    /// `None` when the database does not exist yet or could not be read.
    history: Option<HistoryCounts>,
}

fn count_history(store: &dyn CommandStore) -> anyhow::Result<HistoryCounts> {
    let dirs = store.get_directories_with_history()?;
    let mut records = 0;
    for dir in &dirs {
        records += store.get_commands_by_directory(dir)?.len();
    }
    Ok(HistoryCounts {
        directories: dirs.len(),
        records,
    })
}

/// Counts are read only from an existing database; `info` never creates one.
fn collect_counts(config: &StoreConfig) -> Option<HistoryCounts> {
    if !config.db_path.exists() {
        return None;
    }
    let counts = store::open_initialized(config)
        .map_err(anyhow::Error::from)
        .and_then(|mut s| {
            let counts = count_history(&*s)?;
            s.close()?;
            Ok(counts)
        });
    match counts {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("[dirhist] error reading history: {e:#}");
            None
        }
    }
}

fn collect_info(config: &StoreConfig) -> InfoOutput {
    let config_path = paths::config_file();
    InfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        home_override: std::env::var("DIRHIST_HOME").ok(),
        config_file: ConfigFileInfo {
            exists: config_path.as_ref().is_some_and(|p| p.exists()),
            path: config_path.map(|p| p.display().to_string()),
        },
        store: StoreInfo {
            backend: config.backend.clone(),
            env_override: std::env::var("DIRHIST_DB_PATH").ok(),
            path: config.db_path.display().to_string(),
            exists: config.db_path.exists(),
            access: db_access(&config.db_path),
            retention_days: config.retention_days,
            timeout_ms: config.timeout.as_millis(),
        },
        history: collect_counts(config),
    }
}

pub fn cmd_info(json: bool) -> anyhow::Result<i32> {
    let config = StoreConfig::load()?;
    let info = collect_info(&config);
    if json {
        output::print_json(&info);
    } else {
        print_human(&info);
    }
    Ok(0)
}

fn print_human(info: &InfoOutput) {
    println!("dirhist {}", info.version);
    match &info.home_override {
        Some(p) => println!("DIRHIST_HOME: {p}"),
        None => println!("DIRHIST_HOME: (not set)"),
    }

    println!("\nconfig file:");
    match &info.config_file.path {
        Some(p) => {
            let status = if info.config_file.exists { "exists" } else { "not found" };
            println!("  path: {p} ({status})");
        }
        None => println!("  path: (could not determine)"),
    }

    println!("\nhistory store:");
    println!("  backend: {}", info.store.backend);
    match &info.store.env_override {
        Some(p) => println!("  DIRHIST_DB_PATH: {p}"),
        None => println!("  DIRHIST_DB_PATH: (not set)"),
    }
    println!("  path: {} ({})", info.store.path, info.store.access.label());
    println!("  retention: {} day(s)", info.store.retention_days);
    println!("  lock timeout: {}ms", info.store.timeout_ms);

    if let Some(h) = &info.history {
        println!("\nhistory:");
        println!("  directories: {}", h.directories);
        println!("  records:     {}", h.records);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use dirhist::history::CommandRecord;

    #[test]
    fn existing_file_is_writable() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("history.db");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(db_access(&file), DbAccess::Writable);
    }

    #[test]
    fn missing_db_under_writable_dir_will_be_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/history.db");
        assert_eq!(db_access(&path), DbAccess::WillCreate);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none(), "scratch left behind");
    }

    #[test]
    fn counts_are_absent_without_a_database() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path().join("history.db"));
        assert!(collect_counts(&config).is_none());
        assert!(!config.db_path.exists());
    }

    #[test]
    fn counts_cover_every_directory() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path().join("history.db"));
        {
            let mut s = store::open_initialized(&config).unwrap();
            for (cmd, d) in [("ls", "/a"), ("pwd", "/a"), ("make", "/b")] {
                s.save_command(&CommandRecord::new(cmd, d)).unwrap();
            }
            s.close().unwrap();
        }
        let counts = collect_counts(&config).unwrap();
        assert_eq!(counts.directories, 2);
        assert_eq!(counts.records, 3);
    }
}
