//! Validation report: the ephemeral result of one engine run.
//!
//! Rendered to stderr for humans (grouped by severity, with suggested
//! fixes) and to stdout as a single summary token for CI capture. Never
//! persisted; the session store keeps only fingerprints.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;

use crate::core::output::{compact_line, preview_items};
use crate::engine::drift::{DriftIssue, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Aligned,
    Warnings,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<DriftIssue>,
    pub overall_status: OverallStatus,
    /// Issues withheld because their class was already shown this session.
    pub suppressed: usize,
}

impl ValidationReport {
    pub fn new(issues: Vec<DriftIssue>, suppressed: usize) -> Self {
        let overall_status = if issues.iter().any(|i| i.severity == Severity::Error) {
            OverallStatus::Critical
        } else if issues.iter().any(|i| i.severity == Severity::Warning) {
            OverallStatus::Warnings
        } else {
            OverallStatus::Aligned
        };
        Self {
            issues,
            overall_status,
            suppressed,
        }
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity <= Severity::Warning)
            .count()
    }

    /// Exit-code contract: 0 when nothing new needs attention, 1 when new
    /// warning-class issues exist. 2 is reserved for the critical
    /// validator and never produced here.
    pub fn exit_code(&self) -> u8 {
        if self.warning_count() > 0 { 1 } else { 0 }
    }

    /// The single stdout token: `ALIGNED` or `N warnings`.
    pub fn summary_token(&self) -> String {
        match self.warning_count() {
            0 => "ALIGNED".to_string(),
            n => format!("{} warnings", n),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Human-readable report, grouped by severity.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        if self.issues.is_empty() {
            let _ = writeln!(
                out,
                "{} documentation and repository state are aligned",
                "✓".bright_green()
            );
            if self.suppressed > 0 {
                let _ = writeln!(
                    out,
                    "  ({} recurring warning(s) already shown this session)",
                    self.suppressed
                );
            }
            return out;
        }

        for severity in [Severity::Error, Severity::Warning, Severity::Notice] {
            let group: Vec<&DriftIssue> =
                self.issues.iter().filter(|i| i.severity == severity).collect();
            if group.is_empty() {
                continue;
            }
            let label = match severity {
                Severity::Error => severity.to_string().bright_red().bold(),
                Severity::Warning => severity.to_string().bright_yellow().bold(),
                Severity::Notice => severity.to_string().bright_blue(),
            };
            let _ = writeln!(out, "{} ({})", label, group.len());
            for issue in group {
                let _ = writeln!(out, "  {} {}", "▸".bright_cyan(), issue.message);
                let locations: Vec<String> = issue
                    .evidence
                    .iter()
                    .map(|loc| {
                        if loc.line > 0 {
                            format!("{}:{}", loc.path.display(), loc.line)
                        } else {
                            loc.path.display().to_string()
                        }
                    })
                    .collect();
                if !locations.is_empty() {
                    let _ = writeln!(out, "      {}", preview_items(&locations, 4, 80));
                }
                if let Some(fix) = &issue.suggested_fix {
                    let _ = writeln!(
                        out,
                        "      {} {}",
                        "fix:".bright_green(),
                        compact_line(
                            &format!("{} -> {}", fix.source.display(), fix.destination),
                            96
                        )
                    );
                }
            }
        }
        if self.suppressed > 0 {
            let _ = writeln!(
                out,
                "{} recurring warning(s) suppressed (already shown this session)",
                self.suppressed
            );
        }
        out
    }
}
