//! Drift detector: pure comparison of declared vs. actual facts.
//!
//! Every rule here is a standalone function over already-gathered data.
//! No rule performs I/O, and no rule ever produces a commit-blocking
//! severity: documentation drift is advisory by contract, so the highest
//! severity this module emits is `Warning`. `Error` exists in the type
//! for the disjoint critical validator that shares the report format.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use ulid::Ulid;

use crate::engine::autofix::{FixAction, FixKind};
use crate::engine::facts::{ActualFact, DeclaredFact, FactKind, FactValue, SkillsStatus};
use crate::engine::scanner::CommandSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Notice => write!(f, "NOTICE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    CountDrift,
    MissingCommand,
    StaleDate,
    SkillsStatus,
    FileOrganization,
    ParseNotice,
    ScanNotice,
    RuntimeNotice,
}

impl IssueCategory {
    pub fn name(&self) -> &'static str {
        match self {
            IssueCategory::CountDrift => "count-drift",
            IssueCategory::MissingCommand => "missing-command",
            IssueCategory::StaleDate => "stale-date",
            IssueCategory::SkillsStatus => "skills-status",
            IssueCategory::FileOrganization => "file-organization",
            IssueCategory::ParseNotice => "parse-notice",
            IssueCategory::ScanNotice => "scan-notice",
            IssueCategory::RuntimeNotice => "runtime-notice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLocation {
    pub path: PathBuf,
    /// 1-based; 0 when the location is a whole file or directory.
    pub line: usize,
}

impl FileLocation {
    pub fn file(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            line: 0,
        }
    }

    pub fn at(path: &Path, line: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftIssue {
    pub id: String,
    pub severity: Severity,
    pub category: IssueCategory,
    /// Stable message-template id. Fingerprinting hashes this instead of
    /// the rendered message so "7 vs 12" and "7 vs 13" dedup together.
    pub template: &'static str,
    pub message: String,
    pub evidence: Vec<FileLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<FixAction>,
}

impl DriftIssue {
    pub fn warning(
        category: IssueCategory,
        template: &'static str,
        message: String,
        evidence: Vec<FileLocation>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            severity: Severity::Warning,
            category,
            template,
            message,
            evidence,
            suggested_fix: None,
        }
    }

    pub fn notice(
        category: IssueCategory,
        template: &'static str,
        message: String,
        evidence: Vec<FileLocation>,
    ) -> Self {
        Self {
            id: Ulid::new().to_string(),
            severity: Severity::Notice,
            category,
            template,
            message,
            evidence,
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: FixAction) -> Self {
        self.suggested_fix = Some(fix);
        self
    }
}

/// Actual repository state, pre-gathered by the scanner. Keeping this a
/// plain value keeps `compare` free of I/O.
#[derive(Debug, Clone, Default)]
pub struct ActualState {
    pub facts: Vec<ActualFact>,
    pub commands: CommandSet,
}

/// Compare declared facts against actual state. Declared `Unknown` values
/// never produce drift: an unparsable claim is a parse notice upstream,
/// not a mismatch.
pub fn compare(declared: &[DeclaredFact], actual: &ActualState) -> Vec<DriftIssue> {
    let mut issues = Vec::new();
    issues.extend(count_mismatches(declared, actual));
    issues.extend(missing_commands(declared, &actual.commands));
    issues.extend(stale_dates(declared));
    issues.extend(skills_status_drift(declared, actual));
    sort_issues(&mut issues);
    issues
}

/// Deterministic order: severity desc, then category name, then first
/// evidence path. Required for reproducible reports and test output.
pub fn sort_issues(issues: &mut [DriftIssue]) {
    issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.category.name().cmp(b.category.name()))
            .then_with(|| {
                let pa = a.evidence.first().map(|e| e.path.as_path());
                let pb = b.evidence.first().map(|e| e.path.as_path());
                pa.cmp(&pb)
            })
    });
}

fn count_template(kind: FactKind) -> &'static str {
    match kind {
        FactKind::AgentCount => "count-drift/agents",
        FactKind::CommandCount => "count-drift/commands",
        FactKind::SkillCount => "count-drift/skills",
        FactKind::HookCount => "count-drift/hooks",
        _ => "count-drift/other",
    }
}

fn count_mismatches(declared: &[DeclaredFact], actual: &ActualState) -> Vec<DriftIssue> {
    let mut issues = Vec::new();
    for fact in declared {
        let FactValue::Count(said) = fact.value else {
            continue;
        };
        let Some(actual_fact) = actual.facts.iter().find(|a| a.kind == fact.kind) else {
            continue;
        };
        let FactValue::Count(exist) = actual_fact.value else {
            continue;
        };
        if said != exist {
            let doc = fact
                .source_file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| fact.source_file.display().to_string());
            let issue = DriftIssue::warning(
                IssueCategory::CountDrift,
                count_template(fact.kind),
                format!(
                    "{} count drift: {} says {}, but {} exist.",
                    fact.kind.noun(),
                    doc,
                    said,
                    exist
                ),
                vec![
                    FileLocation::at(&fact.source_file, fact.source_line),
                    FileLocation::file(&actual_fact.derived_from),
                ],
            )
            .with_fix(FixAction {
                kind: FixKind::UpdateCount(fact.kind),
                source: fact.source_file.clone(),
                destination: exist.to_string(),
                affected_files: vec![fact.source_file.clone()],
            });
            issues.push(issue);
        }
    }
    issues
}

fn missing_commands(declared: &[DeclaredFact], commands: &CommandSet) -> Vec<DriftIssue> {
    let mut missing: BTreeSet<String> = BTreeSet::new();
    let mut evidence = Vec::new();

    for fact in declared {
        if fact.kind != FactKind::ReferencedCommand {
            continue;
        }
        let FactValue::Name(name) = &fact.value else {
            continue;
        };
        if commands.active.contains(name) || !missing.insert(name.clone()) {
            continue;
        }
        evidence.push(FileLocation::at(&fact.source_file, fact.source_line));
        if commands.archived.contains(name) {
            evidence.push(FileLocation::file(
                &PathBuf::from("commands/archive").join(format!("{}.md", name)),
            ));
        }
    }

    if missing.is_empty() {
        return Vec::new();
    }
    let names: Vec<String> = missing.into_iter().collect();
    vec![DriftIssue::warning(
        IssueCategory::MissingCommand,
        "missing-command",
        format!("Missing documented commands: {}.", names.join(", ")),
        evidence,
    )]
}

fn stale_dates(declared: &[DeclaredFact]) -> Vec<DriftIssue> {
    let dated: Vec<_> = declared
        .iter()
        .filter(|f| f.kind == FactKind::LastUpdatedDate)
        .filter_map(|f| match f.value {
            FactValue::Date(d) => Some((f, d)),
            _ => None,
        })
        .collect();
    let Some((newest_fact, newest)) = dated
        .iter()
        .max_by_key(|(_, d)| *d)
        .map(|(f, d)| (*f, *d))
    else {
        return Vec::new();
    };

    let mut issues = Vec::new();
    for (fact, date) in &dated {
        if *date >= newest {
            continue;
        }
        let stale_doc = doc_name(&fact.source_file);
        let fresh_doc = doc_name(&newest_fact.source_file);
        issues.push(
            DriftIssue::warning(
                IssueCategory::StaleDate,
                "stale-date",
                format!(
                    "Stale last-updated: {} says {}, but {} says {}.",
                    stale_doc, date, fresh_doc, newest
                ),
                vec![
                    FileLocation::at(&fact.source_file, fact.source_line),
                    FileLocation::at(&newest_fact.source_file, newest_fact.source_line),
                ],
            )
            .with_fix(FixAction {
                kind: FixKind::UpdateDate,
                source: fact.source_file.clone(),
                destination: newest.to_string(),
                affected_files: vec![fact.source_file.clone()],
            }),
        );
    }
    issues
}

fn skills_status_drift(declared: &[DeclaredFact], actual: &ActualState) -> Vec<DriftIssue> {
    let actual_status = actual.facts.iter().find_map(|f| {
        if f.kind == FactKind::SkillsStatus {
            match f.value {
                FactValue::Skills(s) => Some((f, s)),
                _ => None,
            }
        } else {
            None
        }
    });
    let Some((actual_fact, actual_status)) = actual_status else {
        return Vec::new();
    };

    let mut issues = Vec::new();
    for fact in declared {
        if fact.kind != FactKind::SkillsStatus {
            continue;
        }
        let FactValue::Skills(said) = fact.value else {
            continue;
        };
        if said == SkillsStatus::Unknown || said == actual_status {
            continue;
        }
        let doc = doc_name(&fact.source_file);
        let observed = match actual_status {
            SkillsStatus::Active => "skills/ has entries",
            _ => "skills/ is empty",
        };
        issues.push(DriftIssue::warning(
            IssueCategory::SkillsStatus,
            "skills-status-drift",
            format!("Skills status drift: {} says {}, but {}.", doc, said, observed),
            vec![
                FileLocation::at(&fact.source_file, fact.source_line),
                FileLocation::file(&actual_fact.derived_from),
            ],
        ));
    }
    issues
}

fn doc_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
