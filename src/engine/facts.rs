//! Fact model shared by the parser (declared side) and scanner (actual side).
//!
//! Facts are recomputed fresh on every invocation; nothing here persists.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The kinds of structured facts extracted from docs or derived from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactKind {
    AgentCount,
    CommandCount,
    SkillCount,
    HookCount,
    LastUpdatedDate,
    ReferencedCommand,
    SkillsStatus,
}

impl FactKind {
    /// Human noun used in report messages ("Agent count drift: ...").
    pub fn noun(&self) -> &'static str {
        match self {
            FactKind::AgentCount => "Agent",
            FactKind::CommandCount => "Command",
            FactKind::SkillCount => "Skill",
            FactKind::HookCount => "Hook",
            FactKind::LastUpdatedDate => "Last-updated date",
            FactKind::ReferencedCommand => "Referenced command",
            FactKind::SkillsStatus => "Skills status",
        }
    }
}

/// Declared skills posture, as parsed from prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillsStatus {
    Active,
    Removed,
    Unknown,
}

impl fmt::Display for SkillsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillsStatus::Active => write!(f, "Active"),
            SkillsStatus::Removed => write!(f, "Removed"),
            SkillsStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A fact's payload. `Unknown` is the fail-open result of an extractor
/// that found nothing; it is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactValue {
    Count(u64),
    Date(NaiveDate),
    Name(String),
    Skills(SkillsStatus),
    Unknown,
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Count(n) => write!(f, "{}", n),
            FactValue::Date(d) => write!(f, "{}", d),
            FactValue::Name(s) => write!(f, "{}", s),
            FactValue::Skills(s) => write!(f, "{}", s),
            FactValue::Unknown => write!(f, "unknown"),
        }
    }
}

/// A claim made by a human-readable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredFact {
    pub kind: FactKind,
    pub value: FactValue,
    pub source_file: PathBuf,
    /// 1-based line the extractor matched on; 0 when the fact is Unknown.
    pub source_line: usize,
}

/// The repository's actual state for the same fact kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualFact {
    pub kind: FactKind,
    pub value: FactValue,
    pub derived_from: PathBuf,
}
