//! Turning raw shell-hook input into stored records.
//!
//! The hook runs after every prompt, so [`try_record`] never reports
//! failure to the caller: a locked or broken store costs one missing history
//! line, never a noisy prompt.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::history::{CommandRecord, MAX_TAG_LEN, Shell, TagSet};
use crate::normalize::normalize_directory;
use crate::store;

/// Tag added to every record whose command exited non-zero.
pub const FAILED_TAG: &str = "failed";

/// Prefix words skipped when looking for the program name.
const WRAPPERS: &[&str] = &["sudo", "env", "command", "exec", "time", "nohup"];

/// What a shell hook knows about the command that just finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureRequest {
    pub command: String,
    /// Working directory; the process cwd when `None`.
    pub directory: Option<String>,
    /// Shell name; detected from the environment when `None`.
    pub shell: Option<String>,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl CaptureRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    #[must_use]
    pub const fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Commands typed with a leading space are kept out of history
/// (`HISTCONTROL=ignorespace`).
pub fn is_ignored(command: &str) -> bool {
    command.starts_with(' ')
}

fn is_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The program a command line runs: the first word after any wrapper
/// (`sudo`, `env`, ...), its flags and leading `VAR=value` assignments,
/// reduced to its basename.
pub fn program_name(command: &str) -> Option<&str> {
    let mut after_wrapper = false;
    let word = command.split_whitespace().find(|word| {
        if WRAPPERS.contains(word) {
            after_wrapper = true;
            return false;
        }
        if is_assignment(word) || (after_wrapper && word.starts_with('-')) {
            return false;
        }
        true
    })?;
    let base = word.rsplit(['/', '\\']).next().unwrap_or(word);
    let base = base
        .strip_suffix(".exe")
        .or_else(|| base.strip_suffix(".EXE"))
        .unwrap_or(base);
    (!base.is_empty()).then_some(base)
}

/// Tags for a captured command: its program name, then [`FAILED_TAG`] for a
/// non-zero exit code.
pub fn derive_tags(command: &str, exit_code: i32) -> TagSet {
    let mut tags = TagSet::new();
    if let Some(program) = program_name(command)
        && program.chars().count() <= MAX_TAG_LEN
    {
        tags.insert(program);
    }
    if exit_code != 0 {
        tags.insert(FAILED_TAG);
    }
    tags
}

/// Build the record a hook invocation describes, stamped at `now`.
///
/// # Errors
/// Returns [`StoreError::Validation`] for an empty command or any other
/// record invariant violation.
pub fn build_record(request: &CaptureRequest, now: DateTime<Utc>) -> Result<CommandRecord, StoreError> {
    let command = request.command.trim_end_matches(['\n', '\r']);
    if command.trim().is_empty() {
        return Err(StoreError::Validation("command must not be empty".into()));
    }
    let directory = normalize_directory(request.directory.as_deref().unwrap_or(""));
    let shell = request.shell.as_deref().map_or_else(Shell::detect, Shell::parse);

    let record = CommandRecord::new(command, directory)
        .with_timestamp(now)
        .with_shell(shell)
        .with_exit_code(request.exit_code)
        .with_duration(Duration::from_millis(request.duration_ms))
        .with_tags(derive_tags(command, request.exit_code));
    record.validate()?;
    Ok(record)
}

fn record(config: &StoreConfig, request: &CaptureRequest) -> Result<String, StoreError> {
    let record = build_record(request, Utc::now())?;
    let mut store = store::open_initialized(config)?;
    let saved = store.save_command(&record);
    let closed = store.close();
    let id = saved?;
    closed?;
    Ok(id)
}

/// Save one command and swallow every failure.
///
/// Returns the stored ID, or `None` when the command was ignored or could
/// not be saved. Failures are logged at `debug`.
pub fn try_record(config: &StoreConfig, request: &CaptureRequest) -> Option<String> {
    if is_ignored(&request.command) {
        tracing::debug!("command starts with a space, not recording");
        return None;
    }
    match record(config, request) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::debug!(error = %e, transient = e.is_transient(), "command not recorded");
            None
        }
    }
}
