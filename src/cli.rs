use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Keeps a running host application's extensions in sync with their source files.
///
/// ext-reload watches a project tree and, when a tracked file changes, loads
/// the matching extension if the host does not have it yet or reloads it if
/// it does.
#[derive(Parser, Debug)]
#[command(
    name = "ext-reload",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that resolves the tracked set.
#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    /// Files or directories to track (default: config `paths`, else the project root).
    pub paths: Vec<PathBuf>,

    /// Project root that module identifiers are relative to.
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Files or directories to exclude from tracking (repeatable).
    #[arg(short, long)]
    pub ignore: Vec<PathBuf>,

    /// Tracked source extension, without the dot.
    #[arg(long)]
    pub extension: Option<String>,

    /// Namespace separator used in module identifiers.
    #[arg(long)]
    pub separator: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the project root and load or reload extensions as files change.
    Watch {
        #[command(flatten)]
        track: TrackArgs,

        /// Shell command run to load an extension; `{module}` is substituted.
        #[arg(long)]
        load_cmd: Option<String>,

        /// Shell command run to reload an extension; `{module}` is substituted.
        #[arg(long)]
        reload_cmd: Option<String>,

        /// Modules the host already has loaded (repeatable).
        #[arg(long = "active", value_name = "MODULE")]
        active: Vec<String>,

        /// Only act on the first event of each change batch.
        #[arg(long)]
        first_event_only: bool,

        /// Debounce window in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Verbose logging and the first-load notice.
        #[arg(short, long)]
        debug: bool,
    },

    /// Print the tracked files and the module identifier of each.
    List {
        #[command(flatten)]
        track: TrackArgs,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}
