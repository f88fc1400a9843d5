use std::path::Path;

use anyhow::Context as _;

use dirhist::capture::{self, CaptureRequest};
use dirhist::config::StoreConfig;
use dirhist::history::{CommandRecord, TagSet};
use dirhist::normalize::normalize_directory;
use dirhist::store::{self, CommandStore};

use crate::output;

/// Create the database's parent directory for file-backed stores.
/// The store itself never creates directories.
fn ensure_db_dir(config: &StoreConfig) -> anyhow::Result<()> {
    if !config
        .backend
        .trim()
        .eq_ignore_ascii_case(store::sqlite::BACKEND_NAME)
    {
        return Ok(());
    }
    if let Some(parent) = config.db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    Ok(())
}

pub fn open_store(config: &StoreConfig) -> anyhow::Result<Box<dyn CommandStore>> {
    ensure_db_dir(config)?;
    store::open_initialized(config)
        .with_context(|| format!("cannot open history at {}", config.db_path.display()))
}

fn resolve_dir(dir: Option<&str>) -> String {
    normalize_directory(dir.unwrap_or(""))
}

/// Capture path for shell hooks. Always exits 0.
pub fn cmd_record(request: &CaptureRequest) -> i32 {
    let config = match StoreConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "config unavailable, not recording");
            return 0;
        }
    };
    if let Err(e) = ensure_db_dir(&config) {
        tracing::debug!(error = %format!("{e:#}"), "not recording");
        return 0;
    }
    if let Some(id) = capture::try_record(&config, request) {
        tracing::debug!(%id, "recorded");
    }
    0
}

pub fn cmd_list(dir: Option<&str>, limit: usize, json: bool) -> anyhow::Result<i32> {
    let config = StoreConfig::load()?;
    let mut store = open_store(&config)?;
    let directory = resolve_dir(dir);
    let mut records = store.get_commands_by_directory(&directory)?;
    store.close()?;
    records.truncate(limit);

    if json {
        output::print_json(&records);
        return Ok(0);
    }
    if records.is_empty() {
        eprintln!("[dirhist] no history for {directory}");
        return Ok(0);
    }
    for record in &records {
        print_record_line(record, false);
    }
    Ok(0)
}

pub fn cmd_dirs(json: bool) -> anyhow::Result<i32> {
    let config = StoreConfig::load()?;
    let mut store = open_store(&config)?;
    let dirs = store.get_directories_with_history()?;
    store.close()?;

    if json {
        output::print_json(&dirs);
        return Ok(0);
    }
    if dirs.is_empty() {
        eprintln!("[dirhist] no history recorded yet");
        return Ok(0);
    }
    for dir in dirs {
        println!("{dir}");
    }
    Ok(0)
}

/// Search one directory, or every directory with `all`, newest first.
fn search(
    store: &dyn CommandStore,
    pattern: &str,
    dir: Option<&str>,
    all: bool,
) -> anyhow::Result<Vec<CommandRecord>> {
    if !all {
        return Ok(store.search_commands(pattern, &resolve_dir(dir))?);
    }
    let mut found = Vec::new();
    for directory in store.get_directories_with_history()? {
        found.extend(store.search_commands(pattern, &directory)?);
    }
    found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(found)
}

pub fn cmd_search(
    pattern: &str,
    dir: Option<&str>,
    all: bool,
    limit: usize,
    json: bool,
) -> anyhow::Result<i32> {
    let config = StoreConfig::load()?;
    let mut store = open_store(&config)?;
    let mut records = search(&*store, pattern, dir, all)?;
    store.close()?;
    records.truncate(limit);

    if json {
        output::print_json(&records);
        return Ok(0);
    }
    if records.is_empty() {
        eprintln!("[dirhist] no matching commands found");
        return Ok(0);
    }
    for record in &records {
        print_record_line(record, all);
    }
    Ok(0)
}

pub fn cmd_cleanup(days: Option<i64>) -> anyhow::Result<i32> {
    let config = StoreConfig::load()?;
    let days = days.unwrap_or_else(|| i64::from(config.retention_days));
    let mut store = open_store(&config)?;
    let deleted = store.cleanup_old_commands(days)?;
    store.close()?;

    println!("{deleted}");
    if days == 0 {
        eprintln!("[dirhist] deleted {deleted} record(s) (all history)");
    } else {
        eprintln!("[dirhist] deleted {deleted} record(s) older than {days} day(s)");
    }
    Ok(0)
}

fn print_record_line(record: &CommandRecord, show_directory: bool) {
    let exit_status = if record.exit_code == 0 {
        "\u{2713}".to_string()
    } else {
        format!("\u{2717}({})", record.exit_code)
    };
    let dir_suffix = if show_directory {
        let basename = Path::new(&record.directory)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&record.directory);
        format!(" ({basename})")
    } else {
        String::new()
    };
    println!(
        "{} {} {}{}{}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        exit_status,
        record.command,
        dir_suffix,
        tag_suffix(&record.tags)
    );
}

fn tag_suffix(tags: &TagSet) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", tags.as_slice().join(", "))
    }
}
