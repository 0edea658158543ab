//! Repository scanner: enumerates the entities that actually exist on disk.
//!
//! The scanner is the "actual" side of drift detection. It never fails a
//! run: unreadable files and directories are skipped and surfaced as
//! low-severity notices, and directory recursion is cycle-guarded so a
//! symlink loop cannot hang a commit.

use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::facts::{ActualFact, FactKind, FactValue, SkillsStatus};

pub const AGENTS_DIR: &str = "agents";
pub const COMMANDS_DIR: &str = "commands";
pub const SKILLS_DIR: &str = "skills";
pub const HOOKS_DIR: &str = "hooks";
pub const COMMAND_ARCHIVE_DIR: &str = "archive";

/// The entity families the scanner knows how to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Agents,
    Commands,
    Skills,
    Hooks,
}

impl EntityKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Agents => AGENTS_DIR,
            EntityKind::Commands => COMMANDS_DIR,
            EntityKind::Skills => SKILLS_DIR,
            EntityKind::Hooks => HOOKS_DIR,
        }
    }

    pub fn fact_kind(&self) -> FactKind {
        match self {
            EntityKind::Agents => FactKind::AgentCount,
            EntityKind::Commands => FactKind::CommandCount,
            EntityKind::Skills => FactKind::SkillCount,
            EntityKind::Hooks => FactKind::HookCount,
        }
    }

    fn extension(&self) -> Option<&'static str> {
        match self {
            EntityKind::Agents | EntityKind::Commands => Some("md"),
            EntityKind::Hooks => Some("py"),
            EntityKind::Skills => None,
        }
    }
}

/// Result of enumerating one entity family.
#[derive(Debug, Clone)]
pub struct EntityScan {
    pub kind: EntityKind,
    pub count: u64,
    pub ids: BTreeSet<String>,
}

/// Active vs. archived command names under `commands/`.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    pub active: BTreeSet<String>,
    pub archived: BTreeSet<String>,
}

/// Everything the scanner learned in one pass, plus skip notices.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub entities: Vec<EntityScan>,
    pub commands: CommandSet,
    pub notices: Vec<String>,
}

impl ScanReport {
    /// Project the scan into comparable facts for the drift detector.
    pub fn actual_facts(&self, root: &Path) -> Vec<ActualFact> {
        let mut facts: Vec<ActualFact> = self
            .entities
            .iter()
            .map(|scan| ActualFact {
                kind: scan.kind.fact_kind(),
                value: FactValue::Count(scan.count),
                derived_from: root.join(scan.kind.dir_name()),
            })
            .collect();

        let skills_present = self
            .entities
            .iter()
            .any(|s| s.kind == EntityKind::Skills && s.count > 0);
        facts.push(ActualFact {
            kind: FactKind::SkillsStatus,
            value: FactValue::Skills(if skills_present {
                SkillsStatus::Active
            } else {
                SkillsStatus::Removed
            }),
            derived_from: root.join(SKILLS_DIR),
        });
        facts
    }
}

/// Scan all entity families under the repository root.
pub fn scan_repository(root: &Path) -> ScanReport {
    let mut notices = Vec::new();
    let mut entities = Vec::new();

    for kind in [
        EntityKind::Agents,
        EntityKind::Commands,
        EntityKind::Skills,
        EntityKind::Hooks,
    ] {
        entities.push(list_entities(kind, root, &mut notices));
    }

    let commands = resolve_command_set(&root.join(COMMANDS_DIR), &mut notices);

    ScanReport {
        entities,
        commands,
        notices,
    }
}

/// Enumerate one entity family. Commands exclude anything under
/// `commands/archive/`. Skills are counted as subdirectories.
pub fn list_entities(kind: EntityKind, root: &Path, notices: &mut Vec<String>) -> EntityScan {
    let dir = root.join(kind.dir_name());
    let mut ids = BTreeSet::new();

    match kind {
        EntityKind::Skills => {
            match fs::read_dir(&dir) {
                Ok(entries) => {
                    for entry in entries {
                        match entry {
                            Ok(e) if e.path().is_dir() => {
                                let name = e.file_name().to_string_lossy().to_string();
                                if !name.starts_with('.') {
                                    ids.insert(name);
                                }
                            }
                            Ok(_) => {}
                            Err(e) => notices.push(format!(
                                "skipped unreadable entry in {}: {}",
                                dir.display(),
                                e
                            )),
                        }
                    }
                }
                Err(_) => {
                    // Absent skills/ is a normal state (skills removed), not a notice.
                }
            }
        }
        _ => {
            let ext = kind.extension().unwrap_or("md");
            let mut files = Vec::new();
            let mut visited = FxHashSet::default();
            walk_files(&dir, ext, &mut visited, &mut files, notices);
            for file in files {
                if kind == EntityKind::Commands && is_archived(&dir, &file) {
                    continue;
                }
                if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                    ids.insert(stem.to_string());
                }
            }
        }
    }

    EntityScan {
        kind,
        count: ids.len() as u64,
        ids,
    }
}

/// Partition command names into active and archived sets. The drift
/// detector treats archived-only commands as missing but cites the
/// archive location as evidence.
pub fn resolve_command_set(commands_dir: &Path, notices: &mut Vec<String>) -> CommandSet {
    let mut set = CommandSet::default();
    let mut files = Vec::new();
    let mut visited = FxHashSet::default();
    walk_files(commands_dir, "md", &mut visited, &mut files, notices);

    for file in files {
        let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if is_archived(commands_dir, &file) {
            set.archived.insert(stem.to_string());
        } else {
            set.active.insert(stem.to_string());
        }
    }
    set
}

fn is_archived(commands_dir: &Path, file: &Path) -> bool {
    file.strip_prefix(commands_dir)
        .map(|rel| {
            rel.components()
                .any(|c| c.as_os_str() == COMMAND_ARCHIVE_DIR)
        })
        .unwrap_or(false)
}

/// Identity of a directory for cycle detection. Inode-based on unix so
/// symlinked aliases of the same directory are recognized; canonical
/// paths elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DirIdentity {
    #[cfg(unix)]
    Inode(u64, u64),
    Canonical(PathBuf),
}

fn dir_identity(dir: &Path) -> Option<DirIdentity> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(meta) = fs::metadata(dir) {
            return Some(DirIdentity::Inode(meta.dev(), meta.ino()));
        }
    }
    fs::canonicalize(dir).ok().map(DirIdentity::Canonical)
}

/// Recursive file collection with a visited set so symlink loops terminate.
fn walk_files(
    dir: &Path,
    ext: &str,
    visited: &mut FxHashSet<DirIdentity>,
    out: &mut Vec<PathBuf>,
    notices: &mut Vec<String>,
) {
    if !dir.is_dir() {
        return;
    }
    match dir_identity(dir) {
        Some(id) => {
            if !visited.insert(id) {
                return;
            }
        }
        None => {
            notices.push(format!("skipped unresolvable directory {}", dir.display()));
            return;
        }
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            notices.push(format!("skipped unreadable directory {}: {}", dir.display(), e));
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                notices.push(format!("skipped unreadable entry in {}: {}", dir.display(), e));
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if matches!(name, ".git" | "target" | "node_modules" | ".docdrift") {
                continue;
            }
            walk_files(&path, ext, visited, out, notices);
        } else if path.is_file() && path.extension().is_some_and(|e| e == ext) {
            out.push(path);
        }
    }
}

/// Collect every markdown file under `root` (repo-relative paths), for
/// cross-reference scans. VCS and state directories are skipped.
pub fn collect_markdown_files(root: &Path, notices: &mut Vec<String>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut visited = FxHashSet::default();
    walk_files(root, "md", &mut visited, &mut files, notices);
    let mut rels: Vec<PathBuf> = files
        .into_iter()
        .filter_map(|p| p.strip_prefix(root).ok().map(|r| r.to_path_buf()))
        .collect();
    rels.sort();
    rels
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_counts_per_entity_kind() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        for i in 0..3 {
            seed(root, &format!("agents/agent-{}.md", i), "# agent");
        }
        seed(root, "commands/build.md", "# build");
        seed(root, "commands/deploy.md", "# deploy");
        seed(root, "hooks/pre_commit.py", "print('ok')");
        fs::create_dir_all(root.join("skills/search")).unwrap();

        let report = scan_repository(root);
        let count_of = |kind: EntityKind| {
            report
                .entities
                .iter()
                .find(|s| s.kind == kind)
                .unwrap()
                .count
        };
        assert_eq!(count_of(EntityKind::Agents), 3);
        assert_eq!(count_of(EntityKind::Commands), 2);
        assert_eq!(count_of(EntityKind::Skills), 1);
        assert_eq!(count_of(EntityKind::Hooks), 1);
    }

    #[test]
    fn test_archive_excluded_from_active_commands() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        seed(root, "commands/build.md", "# build");
        seed(root, "commands/archive/format.md", "# format");

        let report = scan_repository(root);
        assert!(report.commands.active.contains("build"));
        assert!(!report.commands.active.contains("format"));
        assert!(report.commands.archived.contains("format"));

        let commands = report
            .entities
            .iter()
            .find(|s| s.kind == EntityKind::Commands)
            .unwrap();
        assert_eq!(commands.count, 1);
    }

    #[test]
    fn test_missing_dirs_scan_clean() {
        let tmp = tempdir().unwrap();
        let report = scan_repository(tmp.path());
        assert!(report.entities.iter().all(|s| s.count == 0));
        assert!(report.notices.is_empty());
    }

    #[test]
    fn test_skills_status_fact_tracks_emptiness() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let facts = scan_repository(root).actual_facts(root);
        let status = facts
            .iter()
            .find(|f| f.kind == FactKind::SkillsStatus)
            .unwrap();
        assert_eq!(status.value, FactValue::Skills(SkillsStatus::Removed));

        fs::create_dir_all(root.join("skills/search")).unwrap();
        let facts = scan_repository(root).actual_facts(root);
        let status = facts
            .iter()
            .find(|f| f.kind == FactKind::SkillsStatus)
            .unwrap();
        assert_eq!(status.value, FactValue::Skills(SkillsStatus::Active));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_terminates() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        seed(root, "commands/build.md", "# build");
        std::os::unix::fs::symlink(root.join("commands"), root.join("commands/loop")).unwrap();

        let report = scan_repository(root);
        let commands = report
            .entities
            .iter()
            .find(|s| s.kind == EntityKind::Commands)
            .unwrap();
        assert_eq!(commands.count, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped_with_notice() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        seed(root, "agents/visible.md", "# agent");
        let sealed = root.join("agents/sealed");
        fs::create_dir_all(&sealed).unwrap();
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&sealed).is_ok() {
            // Running privileged; permission bits don't bite here.
            fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = scan_repository(root);
        fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();

        let agents = report
            .entities
            .iter()
            .find(|s| s.kind == EntityKind::Agents)
            .unwrap();
        assert_eq!(agents.count, 1);
        assert!(report.notices.iter().any(|n| n.contains("sealed")));
    }
}
