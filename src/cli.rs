//! CLI struct definitions for the docdrift command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "docdrift",
    version = env!("CARGO_PKG_VERSION"),
    about = "Docdrift is the advisory pre-commit alignment engine that keeps an AI plugin repository's documentation honest: it scans actual agents, commands, skills, and hooks, compares them against documented claims, and previews or applies safe auto-fixes without ever blocking a commit."
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Option<Command>,
    #[clap(flatten)]
    pub check: CheckCli,
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct CheckCli {
    /// Apply suggested fixes instead of previewing them.
    #[clap(long)]
    pub fix: bool,
    /// Show every issue, bypassing session deduplication.
    #[clap(long = "no-dedup")]
    pub no_dedup: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
    /// Repository root (defaults to the current working directory).
    #[clap(long)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run the alignment check (the default when no subcommand is given)
    Check(CheckCli),
    /// Show where the file-organization classifier would place a file
    Classify(ClassifyCli),
    /// Inspect or maintain the session dedup store
    Session(SessionGroupCli),
    /// Print the version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ClassifyCli {
    /// File to classify (repository-relative).
    pub path: PathBuf,
    /// Repository root (defaults to the current working directory).
    #[clap(long)]
    pub root: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct SessionGroupCli {
    #[clap(subcommand)]
    pub command: SessionCommand,
    /// Repository root (defaults to the current working directory).
    #[clap(long)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SessionCommand {
    /// Show recorded sessions and their fingerprint counts
    Show,
    /// Drop sessions older than the retention window
    Prune,
    /// Delete all recorded session state
    Clear,
}
