//! Hook runtime adapter: orchestrates one advisory validation run.
//!
//! One invocation walks `IDLE → SCANNING → PARSING → COMPARING →
//! DEDUPING → REPORTING → DONE` with no retries. Partial failures
//! degrade to a partial report, and a soft wall-clock budget keeps the
//! engine from ever stalling a commit: on overrun it reports
//! "validation incomplete" with whatever it has. The adapter is the only
//! place exit codes are decided, and it can only produce 0 or 1.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::config::{Enforcement, EngineConfig};
use crate::core::state::StateDir;
use crate::core::time::session_id_today;
use crate::engine::autofix::{self, ApplyMode, FixKind};
use crate::engine::classify;
use crate::engine::drift::{
    self, ActualState, DriftIssue, FileLocation, IssueCategory, Severity,
};
use crate::engine::facts::DeclaredFact;
use crate::engine::parser;
use crate::engine::report::ValidationReport;
use crate::engine::scanner;
use crate::engine::session::SessionStore;

/// The documents whose claims are validated.
pub const DOC_FILES: &[&str] = &["CLAUDE.md", "PROJECT.md", "README.md"];

/// Root-level files that belong in the repository root.
const ROOT_ALLOWLIST: &[&str] = &[
    "README.md",
    "CLAUDE.md",
    "PROJECT.md",
    "AGENTS.md",
    "GEMINI.md",
    "CHANGELOG.md",
    "CONTRIBUTING.md",
    "CODE_OF_CONDUCT.md",
    "SECURITY.md",
    "LICENSE.md",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Parsing,
    Comparing,
    Deduping,
    Reporting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Scanning => "scanning",
            Phase::Parsing => "parsing",
            Phase::Comparing => "comparing",
            Phase::Deduping => "deduping",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
        };
        write!(f, "{}", name)
    }
}

fn trace_phase(phase: Phase) {
    if std::env::var("DOCDRIFT_TRACE").ok().as_deref() == Some("1") {
        eprintln!("docdrift: phase {}", phase);
    }
}

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub root: PathBuf,
    /// Switch the auto-fix engine from DryRun to Apply for every category.
    pub fix: bool,
    /// Bypass the session store entirely.
    pub no_dedup: bool,
    /// Override the calendar-day session id (tests exercise rollover).
    pub session_id: Option<String>,
    /// Override the loaded config (tests pin budgets).
    pub config: Option<EngineConfig>,
}

impl CheckOptions {
    pub fn for_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            fix: false,
            no_dedup: false,
            session_id: None,
            config: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: ValidationReport,
    pub exit_code: u8,
    /// False when the wall-clock budget cut the run short.
    pub complete: bool,
}

struct Budget {
    start: Instant,
    limit: Duration,
}

impl Budget {
    fn new(limit_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            limit: Duration::from_millis(limit_ms),
        }
    }

    fn exceeded(&self) -> bool {
        self.start.elapsed() > self.limit
    }
}

fn enforcement_for(config: &EngineConfig, category: IssueCategory) -> Enforcement {
    match category {
        IssueCategory::CountDrift => config.enforcement.count_drift,
        IssueCategory::MissingCommand => config.enforcement.missing_command,
        IssueCategory::StaleDate => config.enforcement.stale_date,
        IssueCategory::SkillsStatus => config.enforcement.skills_status,
        IssueCategory::FileOrganization => config.enforcement.file_organization,
        _ => Enforcement::Warn,
    }
}

/// Run the full engine once. Infallible by design: every failure inside
/// is converted to an issue or a notice, because this advisory tool must
/// never break a developer's ability to commit.
pub fn run_check(options: &CheckOptions) -> CheckOutcome {
    let root = options.root.clone();
    let state = StateDir::for_repo(&root);

    let (config, config_notice) = match &options.config {
        Some(cfg) => (cfg.clone(), None),
        None => EngineConfig::load_or_default(&state.config_file()),
    };
    let budget = Budget::new(config.time_budget_ms);

    let mut issues: Vec<DriftIssue> = Vec::new();
    if let Some(notice) = config_notice {
        issues.push(DriftIssue::notice(
            IssueCategory::RuntimeNotice,
            "config-fallback",
            notice,
            vec![FileLocation::file(&state.config_file())],
        ));
    }

    trace_phase(Phase::Idle);

    // SCANNING
    trace_phase(Phase::Scanning);
    let scan = scanner::scan_repository(&root);
    for notice in &scan.notices {
        issues.push(DriftIssue::notice(
            IssueCategory::ScanNotice,
            "scan-notice",
            notice.clone(),
            vec![],
        ));
    }
    let mut complete = true;

    if budget.exceeded() {
        issues.push(incomplete_notice("scanning"));
        complete = false;
    }

    // PARSING
    let mut declared: Vec<DeclaredFact> = Vec::new();
    if complete {
        trace_phase(Phase::Parsing);
        for doc in DOC_FILES {
            let path = root.join(doc);
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(text) => {
                    let parsed = parser::parse_document(&text, Path::new(doc));
                    declared.extend(parsed.facts);
                    for notice in parsed.notices {
                        issues.push(DriftIssue::notice(
                            IssueCategory::ParseNotice,
                            "parse-notice",
                            notice,
                            vec![FileLocation::file(Path::new(doc))],
                        ));
                    }
                }
                Err(e) => issues.push(DriftIssue::notice(
                    IssueCategory::ScanNotice,
                    "scan-notice",
                    format!("skipped unreadable document {}: {}", doc, e),
                    vec![FileLocation::file(Path::new(doc))],
                )),
            }
        }
        if budget.exceeded() {
            issues.push(incomplete_notice("parsing"));
            complete = false;
        }
    }

    // COMPARING (plus file-organization findings and optional fixes)
    if complete {
        trace_phase(Phase::Comparing);
        let actual = ActualState {
            facts: scan.actual_facts(&root),
            commands: scan.commands.clone(),
        };
        let drift_issues = drift::compare(&declared, &actual);
        for issue in drift_issues {
            issues.push(maybe_apply(&root, &config, options.fix, issue));
        }
        for issue in organization_issues(&root) {
            issues.push(maybe_apply(&root, &config, options.fix, issue));
        }
    }

    // DEDUPING
    trace_phase(Phase::Deduping);
    let session_id = options
        .session_id
        .clone()
        .unwrap_or_else(session_id_today);
    let (mut fresh, suppressed) = if options.no_dedup {
        (issues, 0)
    } else {
        let store = SessionStore::open(state, &config);
        let result = store.dedup(&session_id, issues);
        let mut fresh = result.fresh;
        if result.degraded {
            fresh.push(DriftIssue::notice(
                IssueCategory::RuntimeNotice,
                "dedup-degraded",
                "session store busy; warnings shown without deduplication".to_string(),
                vec![],
            ));
        }
        (fresh, result.suppressed)
    };

    // REPORTING
    trace_phase(Phase::Reporting);
    drift::sort_issues(&mut fresh);
    let report = ValidationReport::new(fresh, suppressed);
    let exit_code = report.exit_code();
    trace_phase(Phase::Done);

    CheckOutcome {
        report,
        exit_code,
        complete,
    }
}

fn incomplete_notice(stage: &str) -> DriftIssue {
    DriftIssue::notice(
        IssueCategory::RuntimeNotice,
        "validation-incomplete",
        format!(
            "validation incomplete: {} exceeded the time budget; partial report follows",
            stage
        ),
        vec![],
    )
}

/// Apply an issue's suggested fix when the run or config asks for it.
/// Success demotes the issue to an auto-fixed notice; failure keeps the
/// warning and reports exactly which files were left unchanged.
fn maybe_apply(
    root: &Path,
    config: &EngineConfig,
    fix_requested: bool,
    issue: DriftIssue,
) -> DriftIssue {
    let Some(fix) = issue.suggested_fix.clone() else {
        return issue;
    };
    let apply = fix_requested || enforcement_for(config, issue.category) == Enforcement::AutoFix;
    if !apply {
        return issue;
    }

    let outcome = autofix::apply_fix(root, &fix, ApplyMode::Apply);
    let mut fixed = issue;
    if outcome.succeeded() {
        fixed.severity = Severity::Notice;
        fixed.message = match fix.kind {
            FixKind::MoveFile => format!(
                "Auto-fixed: moved {} to {} ({} reference(s) updated).",
                fix.source.display(),
                fix.destination,
                outcome.updated_reference_count
            ),
            _ => format!("{} [auto-fixed]", fixed.message),
        };
    } else {
        fixed.message = format!("{} (auto-fix failed: {})", fixed.message, outcome.errors.join("; "));
    }
    fixed
}

/// Find candidate files sitting in the repository root that the
/// classifier would place elsewhere.
fn organization_issues(root: &Path) -> Vec<DriftIssue> {
    let mut issues = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return issues;
    };

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext, "md" | "sh") && !ROOT_ALLOWLIST.contains(&name)
        })
        .collect();
    candidates.sort();

    for path in candidates {
        let Some(name) = path.file_name().map(PathBuf::from) else {
            continue;
        };
        let sample = fs::read_to_string(&path).unwrap_or_default();
        let destination = classify::classify(&name, &sample);

        let action = match autofix::plan_move(root, &name, &destination) {
            Ok(a) => a,
            Err(_) => continue,
        };
        let preview = autofix::apply_fix(root, &action, ApplyMode::DryRun);
        issues.push(
            DriftIssue::warning(
                IssueCategory::FileOrganization,
                "file-organization",
                format!(
                    "Misplaced file: {} belongs in {} ({} reference(s) to update).",
                    name.display(),
                    destination.parent().unwrap_or(Path::new("")).display(),
                    preview.updated_reference_count
                ),
                vec![FileLocation::file(&name)],
            )
            .with_fix(action),
        );
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            lock_timeout_ms: 50,
            ..EngineConfig::default()
        }
    }

    fn options(root: &Path) -> CheckOptions {
        CheckOptions {
            config: Some(fast_config()),
            no_dedup: true,
            ..CheckOptions::for_root(root)
        }
    }

    #[test]
    fn test_empty_repo_is_aligned() {
        let tmp = tempdir().unwrap();
        let outcome = run_check(&options(tmp.path()));
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.report.summary_token(), "ALIGNED");
        assert!(outcome.complete);
    }

    #[test]
    fn test_budget_overrun_degrades_to_partial_report() {
        let tmp = tempdir().unwrap();
        let mut opts = options(tmp.path());
        opts.config = Some(EngineConfig {
            time_budget_ms: 0,
            lock_timeout_ms: 50,
            ..EngineConfig::default()
        });
        let outcome = run_check(&opts);
        assert!(!outcome.complete);
        assert_eq!(outcome.exit_code, 0);
        assert!(
            outcome
                .report
                .issues
                .iter()
                .any(|i| i.template == "validation-incomplete")
        );
    }

    #[test]
    fn test_misplaced_root_script_is_flagged_not_moved() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("test-auth.sh"), "#!/bin/sh\n").unwrap();

        let outcome = run_check(&options(root));
        assert_eq!(outcome.exit_code, 1);
        let issue = outcome
            .report
            .issues
            .iter()
            .find(|i| i.category == IssueCategory::FileOrganization)
            .unwrap();
        assert!(issue.message.contains("scripts/test"));
        assert!(root.join("test-auth.sh").exists());
    }

    #[test]
    fn test_fix_mode_moves_misplaced_script() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("test-auth.sh"), "#!/bin/sh\n").unwrap();

        let mut opts = options(root);
        opts.fix = true;
        let outcome = run_check(&opts);
        assert!(!root.join("test-auth.sh").exists());
        assert!(root.join("scripts/test/test-auth.sh").is_file());
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn test_autofix_enforcement_applies_without_flag() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("PERF_ANALYSIS.md"), "notes\n").unwrap();

        let mut opts = options(root);
        let mut config = fast_config();
        config.enforcement.file_organization = Enforcement::AutoFix;
        opts.config = Some(config);
        run_check(&opts);
        assert!(root.join("docs/archive/PERF_ANALYSIS.md").is_file());
    }
}
