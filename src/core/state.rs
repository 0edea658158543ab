//! State-directory handle for docdrift's on-disk footprint.
//!
//! The engine keeps exactly one piece of persistent state: the session
//! dedup map under `<repo>/.docdrift/`. Everything else is recomputed
//! fresh on each invocation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::DocdriftError;

pub const STATE_DIR_NAME: &str = ".docdrift";
pub const SESSION_FILE_NAME: &str = "session.json";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Handle to a repository's docdrift state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    /// Absolute path to the `.docdrift` directory.
    pub root: PathBuf,
}

impl StateDir {
    pub fn for_repo(repo_root: &Path) -> Self {
        Self {
            root: repo_root.join(STATE_DIR_NAME),
        }
    }

    /// Create the directory if missing. Called lazily on first write so a
    /// clean check leaves no footprint behind.
    pub fn ensure(&self) -> Result<(), DocdriftError> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join(SESSION_FILE_NAME)
    }

    pub fn session_lock_file(&self) -> PathBuf {
        self.root.join(format!("{}.lock", SESSION_FILE_NAME))
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }
}
