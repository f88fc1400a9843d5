use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::tags::{MAX_TAG_LEN, TagSet};
use crate::error::StoreError;

/// Shell that executed a recorded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    #[default]
    Unknown,
    PowerShell,
    Bash,
    Zsh,
    Cmd,
}

impl Shell {
    /// Parse a shell name or executable path (case-insensitive).
    /// Returns `Unknown` for any unrecognised value.
    pub fn parse(s: &str) -> Self {
        let base = s.rsplit(['/', '\\']).next().unwrap_or(s).trim();
        let lower = base.to_ascii_lowercase();
        let name = lower.strip_suffix(".exe").unwrap_or(&lower);
        match name {
            "bash" => Self::Bash,
            "zsh" => Self::Zsh,
            "pwsh" | "powershell" => Self::PowerShell,
            "cmd" => Self::Cmd,
            _ => Self::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PowerShell => "powershell",
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Cmd => "cmd",
        }
    }

    /// Detect the invoking shell from the process environment.
    pub fn detect() -> Self {
        Self::detect_from(|key| std::env::var(key).ok())
    }

    /// Injectable form of [`Shell::detect`].
    ///
    /// Checks `SHELL` first, then `PSModulePath` (PowerShell), then `ComSpec` (cmd).
    pub fn detect_from(env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(shell) = env("SHELL") {
            let parsed = Self::parse(&shell);
            if parsed != Self::Unknown {
                return parsed;
            }
        }
        if env("PSModulePath").is_some_and(|v| !v.is_empty()) {
            return Self::PowerShell;
        }
        if env("ComSpec").is_some_and(|v| !v.is_empty()) {
            return Self::Cmd;
        }
        Self::Unknown
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed command as persisted by the store.
///
/// Records are insert-only. An empty `id` asks the store to assign one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub id: String,
    pub command: String,
    pub directory: String,
    pub timestamp: DateTime<Utc>,
    pub shell: Shell,
    pub exit_code: i32,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub tags: TagSet,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // signature fixed by serde
fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

impl CommandRecord {
    /// A record executed now with no ID, unknown shell, exit code 0 and no tags.
    pub fn new(command: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            command: command.into(),
            directory: directory.into(),
            timestamp: Utc::now(),
            shell: Shell::Unknown,
            exit_code: 0,
            duration: Duration::ZERO,
            tags: TagSet::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub const fn with_shell(mut self, shell: Shell) -> Self {
        self.shell = shell;
        self
    }

    #[must_use]
    pub const fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Check the invariants the store relies on.
    ///
    /// # Errors
    /// Returns [`StoreError::Validation`] for an empty command, a timestamp or
    /// duration that cannot be stored at nanosecond precision, or an oversized tag.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.command.trim().is_empty() {
            return Err(StoreError::Validation("command must not be empty".into()));
        }
        if self.timestamp.timestamp_nanos_opt().is_none() {
            return Err(StoreError::Validation(format!(
                "timestamp {} is outside the storable range",
                self.timestamp
            )));
        }
        if i64::try_from(self.duration.as_nanos()).is_err() {
            return Err(StoreError::Validation(format!(
                "duration {:?} is too large",
                self.duration
            )));
        }
        if let Some(tag) = self.tags.iter().find(|t| t.chars().count() > MAX_TAG_LEN) {
            return Err(StoreError::Validation(format!(
                "tag {tag:?} is longer than {MAX_TAG_LEN} characters"
            )));
        }
        Ok(())
    }
}
