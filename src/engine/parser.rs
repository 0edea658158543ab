//! Document parser: extracts declared facts from human-readable docs.
//!
//! Docs phrase the same fact many ways ("### Agents (7 specialists)",
//! "7 agents", "Agents: 7"), so each fact kind gets an ordered list of
//! small, independent regex extractors; the first match wins. Extraction
//! is fail-open throughout: a field the doc mentions but the extractors
//! cannot parse yields `Unknown` plus a parse notice, and a field the doc
//! never mentions yields nothing. Neither case is an error.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use crate::core::time::parse_doc_date;
use crate::engine::facts::{DeclaredFact, FactKind, FactValue, SkillsStatus};

/// Everything one document declared, plus parse notices for near-misses.
#[derive(Debug, Clone, Default)]
pub struct ParsedDoc {
    pub facts: Vec<DeclaredFact>,
    pub notices: Vec<String>,
}

struct CountExtractor {
    kind: FactKind,
    noun: &'static str,
    patterns: Vec<Regex>,
}

static COUNT_EXTRACTORS: LazyLock<Vec<CountExtractor>> = LazyLock::new(|| {
    [
        (FactKind::AgentCount, "agents?"),
        (FactKind::CommandCount, "commands?"),
        (FactKind::SkillCount, "skills?"),
        (FactKind::HookCount, "hooks?"),
    ]
    .into_iter()
    .map(|(kind, noun)| CountExtractor {
        kind,
        noun,
        patterns: vec![
            // "### Agents (7 specialists)" — heading with a parenthesized count.
            Regex::new(&format!(r"(?mi)^#{{1,6}}[^\n]*\b{noun}\b[^\n(]*\((\d+)")).unwrap(),
            // "Agents: 7" and bold-label "**Agents**: 7".
            Regex::new(&format!(r"(?mi)\b{noun}\b\*{{0,2}}\s*:\s*(\d+)\b")).unwrap(),
            // "7 agents" / "7 specialist agents".
            Regex::new(&format!(r"(?mi)\b(\d+)\s+(?:\w+\s+)?{noun}\b")).unwrap(),
        ],
    })
    .collect()
});

static LAST_UPDATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)last[\s_-]*updated\*{0,2}\s*[:\s]\s*\*{0,2}([A-Za-z0-9 ,/-]+)").unwrap()
});

static COMMAND_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[\s(\[`])/([A-Za-z][A-Za-z0-9_-]*)").unwrap()
});

static SKILLS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[^\n]*\bskills?\b[^\n]*$").unwrap());
static SKILLS_REMOVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b0\s*[-–]\s*removed\b|\bremoved\b").unwrap());
static SKILLS_ACTIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bactive\b").unwrap());

/// 1-based line number of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

fn mentions(text: &str, noun: &str) -> bool {
    Regex::new(&format!(r"(?i)\b{noun}\b"))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Run the ordered extractor list for every count kind.
pub fn extract_declared_counts(text: &str, source: &Path) -> ParsedDoc {
    let mut doc = ParsedDoc::default();

    for extractor in COUNT_EXTRACTORS.iter() {
        let mut matched = false;
        for pattern in &extractor.patterns {
            if let Some(caps) = pattern.captures(text) {
                let m = caps.get(1).expect("count group");
                if let Ok(value) = m.as_str().parse::<u64>() {
                    doc.facts.push(DeclaredFact {
                        kind: extractor.kind,
                        value: FactValue::Count(value),
                        source_file: source.to_path_buf(),
                        source_line: line_of(text, m.start()),
                    });
                    matched = true;
                    break;
                }
            }
        }
        if !matched && mentions(text, extractor.noun) {
            doc.facts.push(DeclaredFact {
                kind: extractor.kind,
                value: FactValue::Unknown,
                source_file: source.to_path_buf(),
                source_line: 0,
            });
            doc.notices.push(format!(
                "could not parse {} count declared in {}",
                extractor.kind.noun().to_lowercase(),
                source.display()
            ));
        }
    }
    doc
}

/// Extract the document's declared last-updated date, if any.
pub fn extract_last_updated(text: &str, source: &Path) -> ParsedDoc {
    let mut doc = ParsedDoc::default();
    let Some(caps) = LAST_UPDATED.captures(text) else {
        return doc;
    };
    let m = caps.get(1).expect("date group");
    match parse_doc_date(m.as_str()) {
        Some(date) => doc.facts.push(DeclaredFact {
            kind: FactKind::LastUpdatedDate,
            value: FactValue::Date(date),
            source_file: source.to_path_buf(),
            source_line: line_of(text, m.start()),
        }),
        None => {
            doc.facts.push(DeclaredFact {
                kind: FactKind::LastUpdatedDate,
                value: FactValue::Unknown,
                source_file: source.to_path_buf(),
                source_line: line_of(text, m.start()),
            });
            doc.notices.push(format!(
                "could not parse last-updated date {:?} in {}",
                m.as_str().trim(),
                source.display()
            ));
        }
    }
    doc
}

/// Extract `/name` command references from prose. Path-like tokens
/// (`/usr/bin`) are skipped by rejecting a trailing slash.
pub fn extract_command_references(text: &str, source: &Path) -> ParsedDoc {
    let mut doc = ParsedDoc::default();
    let mut seen = BTreeSet::new();

    for caps in COMMAND_REF.captures_iter(text) {
        let m = caps.get(1).expect("name group");
        if text[m.end()..].starts_with('/') {
            continue;
        }
        let name = m.as_str().to_string();
        if seen.insert(name.clone()) {
            doc.facts.push(DeclaredFact {
                kind: FactKind::ReferencedCommand,
                value: FactValue::Name(name),
                source_file: source.to_path_buf(),
                source_line: line_of(text, m.start()),
            });
        }
    }
    doc
}

/// Extract the declared skills posture: Active, "0 - Removed", or Unknown.
pub fn extract_skills_status(text: &str, source: &Path) -> ParsedDoc {
    let mut doc = ParsedDoc::default();
    for m in SKILLS_LINE.find_iter(text) {
        let line = m.as_str();
        let status = if SKILLS_REMOVED.is_match(line) {
            Some(SkillsStatus::Removed)
        } else if SKILLS_ACTIVE.is_match(line) {
            Some(SkillsStatus::Active)
        } else {
            None
        };
        if let Some(status) = status {
            doc.facts.push(DeclaredFact {
                kind: FactKind::SkillsStatus,
                value: FactValue::Skills(status),
                source_file: source.to_path_buf(),
                source_line: line_of(text, m.start()),
            });
            return doc;
        }
    }
    if SKILLS_LINE.is_match(text) {
        doc.facts.push(DeclaredFact {
            kind: FactKind::SkillsStatus,
            value: FactValue::Skills(SkillsStatus::Unknown),
            source_file: source.to_path_buf(),
            source_line: 0,
        });
    }
    doc
}

/// Byte span of the first count value matched for `kind`, used when
/// applying an update-count fix to the declaring document.
pub fn count_value_span(text: &str, kind: FactKind) -> Option<std::ops::Range<usize>> {
    let extractor = COUNT_EXTRACTORS.iter().find(|e| e.kind == kind)?;
    for pattern in &extractor.patterns {
        if let Some(caps) = pattern.captures(text) {
            return caps.get(1).map(|m| m.range());
        }
    }
    None
}

/// Byte span of the declared last-updated date value, for update-date fixes.
pub fn last_updated_value_span(text: &str) -> Option<std::ops::Range<usize>> {
    LAST_UPDATED
        .captures(text)
        .and_then(|caps| caps.get(1).map(|m| {
            let mut range = m.range();
            // Trim the trailing run the permissive date pattern may grab.
            let trimmed = text[range.clone()].trim_end();
            range.end = range.start + trimmed.len();
            range
        }))
}

/// Parse one document with every extractor family.
pub fn parse_document(text: &str, source: &Path) -> ParsedDoc {
    let mut doc = ParsedDoc::default();
    for part in [
        extract_declared_counts(text, source),
        extract_last_updated(text, source),
        extract_command_references(text, source),
        extract_skills_status(text, source),
    ] {
        doc.facts.extend(part.facts);
        doc.notices.extend(part.notices);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn src() -> PathBuf {
        PathBuf::from("CLAUDE.md")
    }

    fn count_for(doc: &ParsedDoc, kind: FactKind) -> Option<&FactValue> {
        doc.facts.iter().find(|f| f.kind == kind).map(|f| &f.value)
    }

    #[test]
    fn test_heading_parenthetical_phrasing() {
        let doc = extract_declared_counts("### Agents (7 specialists)\n", &src());
        assert_eq!(count_for(&doc, FactKind::AgentCount), Some(&FactValue::Count(7)));
        assert_eq!(doc.facts[0].source_line, 1);
    }

    #[test]
    fn test_label_colon_phrasing() {
        let doc = extract_declared_counts("Stats:\n\nCommands: 12\n**Hooks**: 3\n", &src());
        assert_eq!(count_for(&doc, FactKind::CommandCount), Some(&FactValue::Count(12)));
        assert_eq!(count_for(&doc, FactKind::HookCount), Some(&FactValue::Count(3)));
    }

    #[test]
    fn test_count_before_noun_phrasing() {
        let doc = extract_declared_counts("This repo ships 7 agents and 4 skills.\n", &src());
        assert_eq!(count_for(&doc, FactKind::AgentCount), Some(&FactValue::Count(7)));
        assert_eq!(count_for(&doc, FactKind::SkillCount), Some(&FactValue::Count(4)));
    }

    #[test]
    fn test_extractor_order_first_match_wins() {
        let text = "### Agents (7 specialists)\n\nWe also mention 99 agents in passing.\n";
        let doc = extract_declared_counts(text, &src());
        assert_eq!(count_for(&doc, FactKind::AgentCount), Some(&FactValue::Count(7)));
    }

    #[test]
    fn test_mentioned_but_unparsable_yields_unknown_and_notice() {
        let doc = extract_declared_counts("Agents are listed below.\n", &src());
        assert_eq!(count_for(&doc, FactKind::AgentCount), Some(&FactValue::Unknown));
        assert_eq!(doc.notices.len(), 1);
        assert!(doc.notices[0].contains("agent"));
    }

    #[test]
    fn test_unmentioned_kind_yields_nothing() {
        let doc = extract_declared_counts("Nothing relevant here.\n", &src());
        assert!(doc.facts.is_empty());
        assert!(doc.notices.is_empty());
    }

    #[test]
    fn test_last_updated_variants() {
        for text in [
            "Last Updated: 2026-08-01\n",
            "_last updated 2026-08-01_\n",
            "**Last Updated**: August 1, 2026\n",
        ] {
            let doc = extract_last_updated(text, &src());
            assert_eq!(
                doc.facts[0].value,
                FactValue::Date(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()),
                "failed on {:?}",
                text
            );
        }
    }

    #[test]
    fn test_last_updated_unparsable_is_notice_not_error() {
        let doc = extract_last_updated("Last updated: whenever\n", &src());
        assert_eq!(doc.facts[0].value, FactValue::Unknown);
        assert_eq!(doc.notices.len(), 1);
    }

    #[test]
    fn test_command_references() {
        let text = "Run /format before committing. See `/deploy` too.\nBinary at /usr/bin/env.\n";
        let doc = extract_command_references(text, &src());
        let names: Vec<_> = doc
            .facts
            .iter()
            .map(|f| f.value.to_string())
            .collect();
        assert_eq!(names, vec!["format", "deploy"]);
    }

    #[test]
    fn test_command_references_dedup() {
        let doc = extract_command_references("/format then /format again\n", &src());
        assert_eq!(doc.facts.len(), 1);
    }

    #[test]
    fn test_skills_status_active() {
        let doc = extract_skills_status("## Skills (Active)\n", &src());
        assert_eq!(doc.facts[0].value, FactValue::Skills(SkillsStatus::Active));
    }

    #[test]
    fn test_skills_status_removed() {
        let doc = extract_skills_status("Skills: 0 - Removed\n", &src());
        assert_eq!(doc.facts[0].value, FactValue::Skills(SkillsStatus::Removed));
    }

    #[test]
    fn test_skills_status_unknown_when_undecidable() {
        let doc = extract_skills_status("Skills live under skills/.\n", &src());
        assert_eq!(doc.facts[0].value, FactValue::Skills(SkillsStatus::Unknown));
    }
}
