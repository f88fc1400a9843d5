mod history_cmd;
mod info_cmd;
mod output;

use clap::{Parser, Subcommand};

use dirhist::capture::CaptureRequest;
use dirhist::history::Shell;
use dirhist::hook;

#[derive(Parser)]
#[command(
    name = "dirhist",
    version,
    about = "Per-directory shell command history"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a finished command (called by the shell hook)
    Record {
        /// Command line as typed
        #[arg(long, allow_hyphen_values = true)]
        command: String,
        /// Directory the command ran in (default: current directory)
        #[arg(long)]
        directory: Option<String>,
        /// Exit code of the command
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        exit_code: i32,
        /// Wall-clock duration in milliseconds
        #[arg(long, default_value_t = 0)]
        duration_ms: u64,
        /// Shell name (default: detected from the environment)
        #[arg(long)]
        shell: Option<String>,
    },
    /// List commands run in a directory, newest first
    List {
        /// Directory to list (default: current directory)
        dir: Option<String>,
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every directory with recorded history
    Dirs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search commands containing PATTERN (case-sensitive)
    Search {
        /// Substring to look for
        pattern: String,
        /// Directory to search (default: current directory)
        dir: Option<String>,
        /// Search across all directories
        #[arg(short, long, conflicts_with = "dir")]
        all: bool,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete records older than the retention period
    Cleanup {
        /// Retention in days (default: configured retention). 0 deletes everything
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
    },
    /// Print the shell hook for SHELL (bash, zsh, powershell)
    Init {
        shell: String,
    },
    /// Show resolved configuration and history counts
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn cmd_init(shell: &str) -> anyhow::Result<i32> {
    let snippet = hook::snippet(Shell::parse(shell))?;
    print!("{snippet}");
    Ok(0)
}

fn or_exit(r: anyhow::Result<i32>) -> i32 {
    r.unwrap_or_else(|e| {
        eprintln!("[dirhist] error: {e:#}");
        1
    })
}

fn main() {
    dirhist::logging::init();
    let cli = Cli::parse();
    let exit_code = match &cli.command {
        Commands::Record {
            command,
            directory,
            exit_code,
            duration_ms,
            shell,
        } => history_cmd::cmd_record(&CaptureRequest {
            command: command.clone(),
            directory: directory.clone(),
            shell: shell.clone(),
            exit_code: *exit_code,
            duration_ms: *duration_ms,
        }),
        Commands::List { dir, limit, json } => {
            or_exit(history_cmd::cmd_list(dir.as_deref(), *limit, *json))
        }
        Commands::Dirs { json } => or_exit(history_cmd::cmd_dirs(*json)),
        Commands::Search {
            pattern,
            dir,
            all,
            limit,
            json,
        } => or_exit(history_cmd::cmd_search(
            pattern,
            dir.as_deref(),
            *all,
            *limit,
            *json,
        )),
        Commands::Cleanup { days } => or_exit(history_cmd::cmd_cleanup(*days)),
        Commands::Init { shell } => or_exit(cmd_init(shell)),
        Commands::Info { json } => or_exit(info_cmd::cmd_info(*json)),
    };
    std::process::exit(exit_code);
}
