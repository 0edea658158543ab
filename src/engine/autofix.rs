//! Auto-fix engine: previewable, atomic filesystem repairs.
//!
//! A move and its cross-reference rewrites are one logical unit. Apply
//! mode stages every rewritten file in memory first, validates the
//! destination, performs the move, then flushes the rewrites; any
//! mid-flight failure rolls the whole action back from the in-memory
//! originals. The repository is never left with a moved file and stale
//! references, or rewritten references to a file that did not move.

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::DocdriftError;
use crate::engine::facts::FactKind;
use crate::engine::parser;
use crate::engine::scanner;

/// Env toggle for rewrite-failure drills: a path-substring that makes the
/// matching staged write fail. Exercised by the atomicity suite.
pub const FAULT_REWRITE_ENV: &str = "DOCDRIFT_FAULT_REWRITE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixKind {
    MoveFile,
    UpdateReference,
    UpdateCount(FactKind),
    UpdateDate,
}

/// A planned, previewable repair. Paths are repository-relative. For
/// `MoveFile`/`UpdateReference` the destination is the new relative path;
/// for `UpdateCount`/`UpdateDate` it is the replacement value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixAction {
    pub kind: FixKind,
    pub source: PathBuf,
    pub destination: String,
    pub affected_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    DryRun,
    Apply,
}

#[derive(Debug, Clone, Default)]
pub struct FixOutcome {
    pub moved_file: Option<PathBuf>,
    pub updated_reference_count: usize,
    pub errors: Vec<String>,
}

impl FixOutcome {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'/' | b'-')
}

/// Locate boundary-checked references to `old` in markdown text. Matches
/// the three reference forms (link target, bare mention, anchored link —
/// the `#anchor` sits past the boundary and survives rewrites untouched)
/// while rejecting longer paths that merely contain `old`.
fn find_references(text: &str, old: &str) -> Vec<(usize, usize)> {
    let Ok(re) = Regex::new(&format!(r"(?:\./)?{}", regex::escape(old))) else {
        return Vec::new();
    };
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    for m in re.find_iter(text) {
        if m.start() > 0 && is_path_byte(bytes[m.start() - 1]) {
            continue;
        }
        if m.end() < bytes.len() {
            let b = bytes[m.end()];
            if is_path_byte(b) {
                // A lone period is sentence punctuation, not a longer path.
                let sentence_period =
                    b == b'.' && (m.end() + 1 == bytes.len() || !is_path_byte(bytes[m.end() + 1]));
                if !sentence_period {
                    continue;
                }
            }
        }
        spans.push((m.start(), m.end()));
    }
    spans
}

/// Rewrite references to `old` as `new`, preserving a `./` prefix and any
/// trailing anchor. Returns the new text and the number of rewrites.
pub fn rewrite_references(text: &str, old: &str, new: &str) -> (String, usize) {
    let spans = find_references(text, old);
    if spans.is_empty() {
        return (text.to_string(), 0);
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in &spans {
        out.push_str(&text[cursor..*start]);
        if text[*start..*end].starts_with("./") {
            out.push_str("./");
        }
        out.push_str(new);
        cursor = *end;
    }
    out.push_str(&text[cursor..]);
    (out, spans.len())
}

/// Plan a move: find every markdown file that references `file` so the
/// whole action is previewable before anything touches disk.
pub fn plan_move(
    root: &Path,
    file: &Path,
    destination: &Path,
) -> Result<FixAction, DocdriftError> {
    if !root.join(file).is_file() {
        return Err(DocdriftError::NotFound(format!(
            "cannot plan move, {} does not exist",
            file.display()
        )));
    }
    let old = file.to_string_lossy();
    let mut notices = Vec::new();
    let mut affected = Vec::new();
    for md in scanner::collect_markdown_files(root, &mut notices) {
        if md == file {
            continue;
        }
        let Ok(content) = fs::read_to_string(root.join(&md)) else {
            continue;
        };
        if !find_references(&content, &old).is_empty() {
            affected.push(md);
        }
    }
    Ok(FixAction {
        kind: FixKind::MoveFile,
        source: file.to_path_buf(),
        destination: destination.to_string_lossy().into_owned(),
        affected_files: affected,
    })
}

fn staged_write(path: &Path, content: &str) -> io::Result<()> {
    if let Ok(needle) = std::env::var(FAULT_REWRITE_ENV) {
        if !needle.is_empty() && path.to_string_lossy().contains(&needle) {
            return Err(io::Error::other("injected rewrite fault"));
        }
    }
    fs::write(path, content)
}

struct StagedFile {
    abs: PathBuf,
    original: String,
    rewritten: String,
    rewrites: usize,
}

/// Apply (or preview) a fix. Failures never propagate: the outcome lists
/// exactly which files could not be moved or rewritten, and on any apply
/// failure the repository state for this action is rolled back.
pub fn apply_fix(root: &Path, action: &FixAction, mode: ApplyMode) -> FixOutcome {
    match action.kind {
        FixKind::MoveFile => apply_move(root, action, mode, true),
        FixKind::UpdateReference => apply_move(root, action, mode, false),
        FixKind::UpdateCount(kind) => {
            apply_span_update(root, action, mode, |text| parser::count_value_span(text, kind))
        }
        FixKind::UpdateDate => {
            apply_span_update(root, action, mode, parser::last_updated_value_span)
        }
    }
}

fn apply_move(root: &Path, action: &FixAction, mode: ApplyMode, move_file: bool) -> FixOutcome {
    let mut outcome = FixOutcome::default();
    let old = action.source.to_string_lossy();
    let new = action.destination.as_str();

    // Stage every rewrite in memory before anything is mutated.
    let mut staged = Vec::new();
    for rel in &action.affected_files {
        let abs = root.join(rel);
        let original = match fs::read_to_string(&abs) {
            Ok(c) => c,
            Err(e) => {
                outcome
                    .errors
                    .push(format!("cannot stage rewrite of {}: {}", rel.display(), e));
                return outcome;
            }
        };
        let (rewritten, rewrites) = rewrite_references(&original, &old, new);
        if rewrites > 0 {
            staged.push(StagedFile {
                abs,
                original,
                rewritten,
                rewrites,
            });
        }
    }
    let total: usize = staged.iter().map(|s| s.rewrites).sum();

    if mode == ApplyMode::DryRun {
        outcome.moved_file = move_file.then(|| PathBuf::from(new));
        outcome.updated_reference_count = total;
        return outcome;
    }

    let src_abs = root.join(&action.source);
    let dest_abs = root.join(new);
    if move_file {
        if let Some(parent) = dest_abs.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                outcome.errors.push(format!(
                    "cannot create destination {}: {}",
                    parent.display(),
                    e
                ));
                return outcome;
            }
        }
        if let Err(e) = fs::rename(&src_abs, &dest_abs) {
            outcome.errors.push(format!(
                "cannot move {} to {}: {}",
                action.source.display(),
                new,
                e
            ));
            return outcome;
        }
    }

    for (i, file) in staged.iter().enumerate() {
        if let Err(e) = staged_write(&file.abs, &file.rewritten) {
            outcome.errors.push(format!(
                "could not rewrite {}: {}; action rolled back",
                file.abs.display(),
                e
            ));
            // Restore the files already rewritten, then undo the move.
            for done in staged.iter().take(i) {
                if let Err(re) = fs::write(&done.abs, &done.original) {
                    outcome.errors.push(format!(
                        "rollback incomplete for {}: {}",
                        done.abs.display(),
                        re
                    ));
                }
            }
            if move_file {
                if let Err(re) = fs::rename(&dest_abs, &src_abs) {
                    outcome.errors.push(format!(
                        "rollback incomplete, file left at {}: {}",
                        new, re
                    ));
                }
            }
            return outcome;
        }
    }

    outcome.moved_file = move_file.then(|| PathBuf::from(new));
    outcome.updated_reference_count = total;
    outcome
}

fn apply_span_update(
    root: &Path,
    action: &FixAction,
    mode: ApplyMode,
    span_of: impl Fn(&str) -> Option<std::ops::Range<usize>>,
) -> FixOutcome {
    let mut outcome = FixOutcome::default();
    let abs = root.join(&action.source);
    let text = match fs::read_to_string(&abs) {
        Ok(t) => t,
        Err(e) => {
            outcome
                .errors
                .push(format!("cannot read {}: {}", action.source.display(), e));
            return outcome;
        }
    };
    let Some(span) = span_of(&text) else {
        outcome.errors.push(format!(
            "could not locate the declared value in {}",
            action.source.display()
        ));
        return outcome;
    };
    if mode == ApplyMode::DryRun {
        outcome.updated_reference_count = 1;
        return outcome;
    }
    let updated = format!(
        "{}{}{}",
        &text[..span.start],
        action.destination,
        &text[span.end..]
    );
    match staged_write(&abs, &updated) {
        Ok(()) => outcome.updated_reference_count = 1,
        Err(e) => outcome.errors.push(format!(
            "could not update {}: {}; file unchanged",
            action.source.display(),
            e
        )),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rewrite_link_and_bare_and_anchored() {
        let text = "See [auth](test-auth.sh) and test-auth.sh, plus \
                    [setup](test-auth.sh#setup).\n";
        let (out, n) = rewrite_references(text, "test-auth.sh", "scripts/test/test-auth.sh");
        assert_eq!(n, 3);
        assert!(out.contains("[auth](scripts/test/test-auth.sh)"));
        assert!(out.contains("and scripts/test/test-auth.sh,"));
        assert!(out.contains("[setup](scripts/test/test-auth.sh#setup)"));
    }

    #[test]
    fn test_rewrite_preserves_dot_slash_prefix() {
        let (out, n) = rewrite_references("[x](./notes.md)", "notes.md", "docs/archive/notes.md");
        assert_eq!(n, 1);
        assert_eq!(out, "[x](./docs/archive/notes.md)");
    }

    #[test]
    fn test_rewrite_skips_longer_paths() {
        let text = "old/notes.md and footnotes.md and notes.md.bak stay put";
        let (out, n) = rewrite_references(text, "notes.md", "docs/notes.md");
        assert_eq!(n, 0);
        assert_eq!(out, text);
    }

    #[test]
    fn test_rewrite_handles_sentence_period() {
        let (out, n) = rewrite_references("Run test-auth.sh.", "test-auth.sh", "scripts/test/test-auth.sh");
        assert_eq!(n, 1);
        assert_eq!(out, "Run scripts/test/test-auth.sh.");
    }

    #[test]
    fn test_plan_move_finds_affected_files() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("test-auth.sh"), "#!/bin/sh\n").unwrap();
        fs::write(root.join("README.md"), "Run [auth](test-auth.sh)\n").unwrap();
        fs::write(root.join("CLAUDE.md"), "No references here\n").unwrap();

        let action = plan_move(
            root,
            Path::new("test-auth.sh"),
            Path::new("scripts/test/test-auth.sh"),
        )
        .unwrap();
        assert_eq!(action.kind, FixKind::MoveFile);
        assert_eq!(action.affected_files, vec![PathBuf::from("README.md")]);
    }

    #[test]
    fn test_plan_move_missing_source_is_not_found() {
        let tmp = tempdir().unwrap();
        let err = plan_move(tmp.path(), Path::new("ghost.sh"), Path::new("scripts/ghost.sh"));
        assert!(matches!(err, Err(DocdriftError::NotFound(_))));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("test-auth.sh"), "#!/bin/sh\n").unwrap();
        fs::write(root.join("README.md"), "Run [auth](test-auth.sh)\n").unwrap();

        let action = plan_move(
            root,
            Path::new("test-auth.sh"),
            Path::new("scripts/test/test-auth.sh"),
        )
        .unwrap();
        let outcome = apply_fix(root, &action, ApplyMode::DryRun);
        assert!(outcome.succeeded());
        assert_eq!(outcome.updated_reference_count, 1);
        assert!(root.join("test-auth.sh").exists());
        assert!(!root.join("scripts/test/test-auth.sh").exists());
        assert!(
            fs::read_to_string(root.join("README.md"))
                .unwrap()
                .contains("](test-auth.sh)")
        );
    }

    #[test]
    fn test_apply_moves_and_rewrites() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("test-auth.sh"), "#!/bin/sh\n").unwrap();
        fs::write(root.join("README.md"), "Run [auth](test-auth.sh)\n").unwrap();

        let action = plan_move(
            root,
            Path::new("test-auth.sh"),
            Path::new("scripts/test/test-auth.sh"),
        )
        .unwrap();
        let outcome = apply_fix(root, &action, ApplyMode::Apply);
        assert!(outcome.succeeded(), "errors: {:?}", outcome.errors);
        assert_eq!(outcome.moved_file, Some(PathBuf::from("scripts/test/test-auth.sh")));
        assert!(!root.join("test-auth.sh").exists());
        assert!(root.join("scripts/test/test-auth.sh").is_file());
        assert_eq!(
            fs::read_to_string(root.join("README.md")).unwrap(),
            "Run [auth](scripts/test/test-auth.sh)\n"
        );
    }

    #[test]
    fn test_update_reference_rewrites_without_moving() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("README.md"), "See [auth](test-auth.sh)\n").unwrap();

        // The file already lives at its destination; only the stale
        // references need repair.
        let action = FixAction {
            kind: FixKind::UpdateReference,
            source: PathBuf::from("test-auth.sh"),
            destination: "scripts/test/test-auth.sh".to_string(),
            affected_files: vec![PathBuf::from("README.md")],
        };
        let outcome = apply_fix(root, &action, ApplyMode::Apply);
        assert!(outcome.succeeded(), "errors: {:?}", outcome.errors);
        assert_eq!(outcome.moved_file, None);
        assert_eq!(outcome.updated_reference_count, 1);
        assert_eq!(
            fs::read_to_string(root.join("README.md")).unwrap(),
            "See [auth](scripts/test/test-auth.sh)\n"
        );
    }

    #[test]
    fn test_update_count_rewrites_declared_number() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("CLAUDE.md"), "### Agents (7 specialists)\n").unwrap();

        let action = FixAction {
            kind: FixKind::UpdateCount(FactKind::AgentCount),
            source: PathBuf::from("CLAUDE.md"),
            destination: "16".to_string(),
            affected_files: vec![PathBuf::from("CLAUDE.md")],
        };
        let outcome = apply_fix(root, &action, ApplyMode::Apply);
        assert!(outcome.succeeded());
        assert_eq!(
            fs::read_to_string(root.join("CLAUDE.md")).unwrap(),
            "### Agents (16 specialists)\n"
        );
    }

    #[test]
    fn test_update_date_rewrites_declared_date() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("CLAUDE.md"), "Last Updated: 2026-01-01\n").unwrap();

        let action = FixAction {
            kind: FixKind::UpdateDate,
            source: PathBuf::from("CLAUDE.md"),
            destination: "2026-03-04".to_string(),
            affected_files: vec![PathBuf::from("CLAUDE.md")],
        };
        let outcome = apply_fix(root, &action, ApplyMode::Apply);
        assert!(outcome.succeeded(), "errors: {:?}", outcome.errors);
        assert_eq!(
            fs::read_to_string(root.join("CLAUDE.md")).unwrap(),
            "Last Updated: 2026-03-04\n"
        );
    }
}
