//! Session state store: cross-invocation warning deduplication.
//!
//! Each hook run is a fresh process, so "already shown this session"
//! lives in a small on-disk JSON map keyed by calendar day. Fingerprints
//! hash the issue's category and message-template id only — the variable
//! numeric payload is deliberately excluded so "7 vs 12" and "7 vs 13"
//! dedup as the same recurring class. The store is a nice-to-have by
//! contract: lock contention or a corrupt file degrade to showing the
//! warning again, never to blocking a commit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::core::config::EngineConfig;
use crate::core::state::StateDir;
use crate::core::time::{parse_session_id, today};
use crate::engine::drift::DriftIssue;

/// A lock file older than this is treated as leftover from a crashed run.
const LOCK_STALE_SECS: u64 = 10;

/// Stable identity of a warning class: category plus template id, never
/// the rendered message.
pub fn fingerprint(issue: &DriftIssue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issue.category.name().as_bytes());
    hasher.update(b"\n");
    hasher.update(issue.template.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    sessions: BTreeMap<String, BTreeSet<String>>,
}

/// Result of filtering one run's issues through the store.
#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    pub fresh: Vec<DriftIssue>,
    pub suppressed: usize,
    /// True when the lock could not be acquired and dedup was skipped.
    pub degraded: bool,
}

pub struct SessionStore {
    state: StateDir,
    retention_days: u32,
    lock_timeout: Duration,
}

struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

impl SessionStore {
    pub fn open(state: StateDir, config: &EngineConfig) -> Self {
        Self {
            state,
            retention_days: config.retention_days,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }

    fn load(&self) -> SessionFile {
        let Ok(content) = fs::read_to_string(self.state.session_file()) else {
            return SessionFile::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    fn save(&self, file: &SessionFile) -> std::io::Result<()> {
        self.state
            .ensure()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let json = serde_json::to_string_pretty(file)?;
        fs::write(self.state.session_file(), json)
    }

    /// Bounded advisory lock via atomic lock-file creation. `None` means
    /// the caller should proceed without deduplication.
    fn acquire_lock(&self) -> Option<LockGuard> {
        if self.state.ensure().is_err() {
            return None;
        }
        let path = self.state.session_lock_file();
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => return Some(LockGuard { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Ok(meta) = fs::metadata(&path) {
                        let stale = meta
                            .modified()
                            .ok()
                            .and_then(|m| m.elapsed().ok())
                            .is_some_and(|age| age.as_secs() >= LOCK_STALE_SECS);
                        if stale {
                            let _ = fs::remove_file(&path);
                            continue;
                        }
                    }
                    if Instant::now() >= deadline {
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return None,
            }
        }
    }

    pub fn has_been_shown(&self, fp: &str, session_id: &str) -> bool {
        self.load()
            .sessions
            .get(session_id)
            .is_some_and(|set| set.contains(fp))
    }

    /// Record one shown fingerprint. Prunes expired sessions, as every
    /// write does.
    pub fn record_shown(&self, fp: &str, session_id: &str) -> std::io::Result<()> {
        let _guard = self.acquire_lock();
        let mut file = self.load();
        file.sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(fp.to_string());
        prune_sessions(&mut file, today(), self.retention_days);
        self.save(&file)
    }

    /// Filter a run's issues down to the ones not yet shown this session,
    /// recording them as shown. Lock timeout degrades to no filtering.
    pub fn dedup(&self, session_id: &str, issues: Vec<DriftIssue>) -> DedupResult {
        let Some(_guard) = self.acquire_lock() else {
            return DedupResult {
                fresh: issues,
                suppressed: 0,
                degraded: true,
            };
        };

        let mut file = self.load();
        let shown = file.sessions.entry(session_id.to_string()).or_default();

        let mut result = DedupResult::default();
        for issue in issues {
            let fp = fingerprint(&issue);
            if shown.insert(fp) {
                result.fresh.push(issue);
            } else {
                result.suppressed += 1;
            }
        }

        prune_sessions(&mut file, today(), self.retention_days);
        if self.save(&file).is_err() {
            // The map is advisory; a failed write just means re-showing
            // these warnings next run.
            result.degraded = true;
        }
        result
    }

    /// Recorded sessions with their fingerprint counts, oldest first.
    pub fn sessions(&self) -> Vec<(String, usize)> {
        self.load()
            .sessions
            .iter()
            .map(|(id, fps)| (id.clone(), fps.len()))
            .collect()
    }

    /// Prune expired sessions immediately. Returns how many were dropped.
    pub fn prune_now(&self) -> std::io::Result<usize> {
        let _guard = self.acquire_lock();
        let mut file = self.load();
        let before = file.sessions.len();
        prune_sessions(&mut file, today(), self.retention_days);
        let dropped = before - file.sessions.len();
        if dropped > 0 {
            self.save(&file)?;
        }
        Ok(dropped)
    }

    /// Delete all recorded session state.
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(self.state.session_file()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn prune_sessions(file: &mut SessionFile, today: NaiveDate, retention_days: u32) {
    file.sessions.retain(|id, _| {
        parse_session_id(id)
            .map(|date| (today - date).num_days() <= i64::from(retention_days))
            .unwrap_or(false)
    });
}
