//! Engine configuration.
//!
//! An optional `.docdrift/config.toml` tunes enforcement strength per rule
//! category plus the session retention window and runtime budgets. A
//! missing file means defaults; an unreadable or malformed file also means
//! defaults, surfaced as a notice by the runtime. Configuration can relax
//! the engine but can never make it commit-blocking: exit code 2 belongs
//! to the separate critical validator.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Enforcement strength for one rule category.
///
/// `Block` is accepted in config for forward-compatibility with the
/// critical validator's config surface, but this engine treats it as
/// `Warn`: documentation drift is advisory by contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    AutoFix,
    #[default]
    Warn,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub count_drift: Enforcement,
    pub missing_command: Enforcement,
    pub stale_date: Enforcement,
    pub skills_status: Enforcement,
    pub file_organization: Enforcement,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            count_drift: Enforcement::Warn,
            missing_command: Enforcement::Warn,
            stale_date: Enforcement::Warn,
            skills_status: Enforcement::Warn,
            file_organization: Enforcement::Warn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub enforcement: EnforcementConfig,
    /// Session entries older than this many days are pruned on write.
    pub retention_days: u32,
    /// Soft wall-clock budget for one invocation, in milliseconds.
    pub time_budget_ms: u64,
    /// How long to wait for the session-store lock before proceeding
    /// without deduplication, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforcement: EnforcementConfig::default(),
            retention_days: 7,
            time_budget_ms: 2_000,
            lock_timeout_ms: 500,
        }
    }
}

impl EngineConfig {
    /// Load config from a file, falling back to defaults on any failure.
    /// Returns the config plus an optional notice describing the fallback.
    pub fn load_or_default(path: &Path) -> (Self, Option<String>) {
        if !path.is_file() {
            return (Self::default(), None);
        }
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                return (
                    Self::default(),
                    Some(format!("config unreadable ({}), using defaults", e)),
                );
            }
        };
        match toml::from_str::<EngineConfig>(&content) {
            Ok(cfg) => (cfg, None),
            Err(e) => (
                Self::default(),
                Some(format!("config invalid ({}), using defaults", e)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.retention_days, 7);
        assert_eq!(cfg.time_budget_ms, 2_000);
        assert_eq!(cfg.enforcement.count_drift, Enforcement::Warn);
    }

    #[test]
    fn test_missing_file_is_silent_default() {
        let tmp = tempdir().unwrap();
        let (cfg, notice) = EngineConfig::load_or_default(&tmp.path().join("config.toml"));
        assert_eq!(cfg.retention_days, 7);
        assert!(notice.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "retention_days = 14\n[enforcement]\nfile_organization = \"autofix\"\n",
        )
        .unwrap();
        let (cfg, notice) = EngineConfig::load_or_default(&path);
        assert!(notice.is_none());
        assert_eq!(cfg.retention_days, 14);
        assert_eq!(cfg.enforcement.file_organization, Enforcement::AutoFix);
        assert_eq!(cfg.enforcement.count_drift, Enforcement::Warn);
    }

    #[test]
    fn test_malformed_toml_degrades_to_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "retention_days = [not toml").unwrap();
        let (cfg, notice) = EngineConfig::load_or_default(&path);
        assert_eq!(cfg.retention_days, 7);
        assert!(notice.unwrap().contains("config invalid"));
    }
}
