//! File organization classifier: decides where a stray file belongs.
//!
//! Evaluation is an ordered rule list, first match wins: filename rules,
//! then content-keyword rules over the first ~1000 characters, then a
//! fallback. The classifier is a pure function of `(path, content_sample)`
//! so repeated calls are reproducible.

use std::path::{Path, PathBuf};

/// How much of a file's content participates in keyword classification.
pub const CONTENT_SAMPLE_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePattern {
    /// Filename ends with this suffix (case-sensitive, matches the
    /// working-notes naming convention: `*_SUMMARY.md` etc).
    FileSuffix(&'static str),
    /// Filename starts with `prefix` and carries `ext`.
    FilePrefix {
        prefix: &'static str,
        ext: &'static str,
    },
    /// Markdown content mentions this keyword in the sampled window.
    ContentKeyword(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ClassificationRule {
    pub pattern: RulePattern,
    pub destination: &'static str,
    pub priority: u32,
}

/// The built-in rule set, priority-ordered.
pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        pattern: RulePattern::FileSuffix("_SUMMARY.md"),
        destination: "docs/archive",
        priority: 10,
    },
    ClassificationRule {
        pattern: RulePattern::FileSuffix("_AUDIT.md"),
        destination: "docs/archive",
        priority: 11,
    },
    ClassificationRule {
        pattern: RulePattern::FileSuffix("_ANALYSIS.md"),
        destination: "docs/archive",
        priority: 12,
    },
    ClassificationRule {
        pattern: RulePattern::FilePrefix {
            prefix: "test-",
            ext: "sh",
        },
        destination: "scripts/test",
        priority: 20,
    },
    ClassificationRule {
        pattern: RulePattern::FilePrefix {
            prefix: "debug-",
            ext: "sh",
        },
        destination: "scripts/debug",
        priority: 21,
    },
    ClassificationRule {
        pattern: RulePattern::ContentKeyword("architecture"),
        destination: "docs/architecture",
        priority: 30,
    },
    ClassificationRule {
        pattern: RulePattern::ContentKeyword("guide"),
        destination: "docs/guides",
        priority: 31,
    },
    ClassificationRule {
        pattern: RulePattern::ContentKeyword("research"),
        destination: "docs/research",
        priority: 32,
    },
    ClassificationRule {
        pattern: RulePattern::ContentKeyword("api"),
        destination: "docs/api",
        priority: 33,
    },
];

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn matches(rule: &ClassificationRule, path: &Path, sample: &str) -> bool {
    let name = file_name(path);
    match rule.pattern {
        RulePattern::FileSuffix(suffix) => name.ends_with(suffix),
        RulePattern::FilePrefix { prefix, ext } => {
            name.starts_with(prefix) && extension(path) == ext
        }
        // Keyword rules only categorize markdown; scripts fall through to
        // the script fallback regardless of wording.
        RulePattern::ContentKeyword(keyword) => {
            extension(path) == "md" && sample.to_lowercase().contains(keyword)
        }
    }
}

/// Destination directory for a file, per the ordered rule list.
pub fn destination_dir(path: &Path, content_sample: &str) -> &'static str {
    let sample: String = content_sample.chars().take(CONTENT_SAMPLE_CHARS).collect();
    for rule in DEFAULT_RULES {
        if matches(rule, path, &sample) {
            return rule.destination;
        }
    }
    if extension(path) == "sh" {
        "scripts/misc"
    } else {
        "docs/archive"
    }
}

/// Full destination path (directory + original file name).
pub fn classify(path: &Path, content_sample: &str) -> PathBuf {
    Path::new(destination_dir(path, content_sample)).join(file_name(path))
}
