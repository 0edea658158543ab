//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps report output bounded and readable while preserving signal.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render up to `max_items` evidence entries with an overflow marker.
pub fn preview_items(items: &[String], max_items: usize, max_chars: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let shown = items
        .iter()
        .take(max_items)
        .map(|m| compact_line(m, max_chars))
        .collect::<Vec<_>>()
        .join(" | ");
    if items.len() > max_items {
        format!("{} (+{} more)", shown, items.len() - max_items)
    } else {
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_line_bounds_length() {
        let long = "a ".repeat(100);
        let out = compact_line(&long, 20);
        assert!(out.len() <= 23);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_compact_line_collapses_whitespace() {
        assert_eq!(compact_line("a\n  b\tc", 80), "a b c");
    }

    #[test]
    fn test_preview_items_overflow_marker() {
        let items: Vec<String> = (0..5).map(|i| format!("item-{}", i)).collect();
        let out = preview_items(&items, 3, 80);
        assert!(out.contains("item-0"));
        assert!(out.ends_with("(+2 more)"));
    }

    #[test]
    fn test_preview_items_empty() {
        assert_eq!(preview_items(&[], 3, 80), "");
    }
}
