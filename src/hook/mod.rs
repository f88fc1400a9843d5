//! Shell integration snippets printed by `dirhist init <shell>`.
//!
//! Each snippet calls `dirhist record` in the background after every
//! command, so a slow or locked store never delays the prompt.

use crate::history::Shell;

const BASH: &str = include_str!("dirhist.bash");
const ZSH: &str = include_str!("dirhist.zsh");
const POWERSHELL: &str = include_str!("dirhist.ps1");

/// Shells with a hook snippet.
pub const SUPPORTED: &[Shell] = &[Shell::Bash, Shell::Zsh, Shell::PowerShell];

/// The hook snippet for `shell`.
///
/// # Errors
/// Returns an error for shells without a snippet (`cmd`, unknown shells).
pub fn snippet(shell: Shell) -> anyhow::Result<&'static str> {
    match shell {
        Shell::Bash => Ok(BASH),
        Shell::Zsh => Ok(ZSH),
        Shell::PowerShell => Ok(POWERSHELL),
        Shell::Cmd | Shell::Unknown => {
            let supported: Vec<&str> = SUPPORTED.iter().map(|s| s.as_str()).collect();
            anyhow::bail!(
                "no hook available for shell {shell:?} (supported: {})",
                supported.join(", ")
            )
        }
    }
}
