//! Docdrift: documentation and project-alignment validation for AI plugin repos.
//!
//! **Docdrift is an advisory pre-commit engine.** It scans what a plugin
//! repository actually contains (agent files, command prompts, skill
//! directories, hook scripts), extracts what the docs claim (counts,
//! last-updated dates, referenced commands, skills status), reports the
//! drift between the two, and can fix misplaced files and stale
//! cross-references atomically.
//!
//! # Contracts
//!
//! - **Advisory-only**: exit code 0 (aligned or already shown this
//!   session) or 1 (new warnings; the commit proceeds). Exit code 2
//!   belongs to a separate critical validator and is never produced here.
//! - **Fail-open**: unparsable docs degrade to `Unknown` facts,
//!   unreadable paths are skipped with notices, and internal failures
//!   produce a partial report instead of blocking a commit.
//! - **Atomic fixes**: a file move and its reference rewrites land as one
//!   unit or roll back as one unit.
//! - **Daemonless dedup**: each hook run is a fresh process; "already
//!   shown" lives in a small on-disk session map keyed by calendar day
//!   and pruned by a retention window.
//!
//! # Examples
//!
//! ```bash
//! # Advisory check (pre-commit hook entrypoint)
//! docdrift
//!
//! # Apply suggested fixes
//! docdrift --fix
//!
//! # Preview a single file's destination
//! docdrift classify test-auth.sh
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: shared primitives (errors, config, state paths, dates, output)
//! - [`engine`]: the validation pipeline (scanner, parser, drift rules,
//!   classifier, auto-fix, session store, hook runtime)

pub mod core;
pub mod engine;

mod cli;

use crate::cli::{CheckCli, Cli, ClassifyCli, Command, SessionCommand, SessionGroupCli};
use crate::core::config::EngineConfig;
use crate::core::error::DocdriftError;
use crate::core::state::StateDir;
use crate::engine::runtime::{CheckOptions, run_check};
use crate::engine::classify;
use crate::engine::session::SessionStore;

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf, DocdriftError> {
    match root {
        Some(r) => Ok(r),
        None => Ok(std::env::current_dir()?),
    }
}

fn run_check_cli(args: CheckCli) -> u8 {
    let root = match resolve_root(args.root) {
        Ok(r) => r,
        Err(e) => {
            // Advisory contract: even a broken invocation never blocks.
            eprintln!("docdrift: {} (advisory; commit not blocked)", e);
            return 0;
        }
    };

    let options = CheckOptions {
        root,
        fix: args.fix,
        no_dedup: args.no_dedup,
        session_id: None,
        config: None,
    };
    let outcome = run_check(&options);

    if args.format == "json" {
        println!("{}", outcome.report.to_json());
    } else {
        eprint!("{}", outcome.report.render_human());
        println!("{}", outcome.report.summary_token());
    }
    outcome.exit_code
}

fn run_classify_cli(args: ClassifyCli) -> anyhow::Result<()> {
    let root = resolve_root(args.root)?;
    let content = fs::read_to_string(root.join(&args.path)).unwrap_or_default();
    let sample: String = content.chars().take(classify::CONTENT_SAMPLE_CHARS).collect();
    println!("{}", classify::classify(&args.path, &sample).display());
    Ok(())
}

fn run_session_cli(args: SessionGroupCli) -> anyhow::Result<()> {
    let root = resolve_root(args.root)?;
    let state = StateDir::for_repo(&root);
    let (config, _) = EngineConfig::load_or_default(&state.config_file());
    let store = SessionStore::open(state, &config);

    match args.command {
        SessionCommand::Show => {
            let sessions = store.sessions();
            if sessions.is_empty() {
                println!("No recorded sessions.");
            } else {
                for (id, count) in sessions {
                    println!("{}  {} fingerprint(s)", id, count);
                }
            }
        }
        SessionCommand::Prune => {
            let dropped = store.prune_now().context("pruning session store")?;
            println!("Pruned {} expired session(s).", dropped);
        }
        SessionCommand::Clear => {
            store.clear().context("clearing session store")?;
            println!("Session state cleared.");
        }
    }
    Ok(())
}

/// CLI entrypoint. Returns the process exit code: the check path honors
/// the 0/1 advisory contract, and the maintenance subcommands report
/// their own failures conventionally.
pub fn run() -> u8 {
    let cli = Cli::parse();
    match cli.command {
        None => run_check_cli(cli.check),
        Some(Command::Check(args)) => run_check_cli(args),
        Some(Command::Classify(args)) => match run_classify_cli(args) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("docdrift: {:#}", e);
                1
            }
        },
        Some(Command::Session(args)) => match run_session_cli(args) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("docdrift: {:#}", e);
                1
            }
        },
        Some(Command::Version) => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            0
        }
    }
}

// Re-exported for integration suites that drive the engine as a library.
pub use engine::runtime::{CheckOptions as EngineOptions, CheckOutcome, Phase};
