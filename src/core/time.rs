//! Shared date helpers for session boundaries and doc timestamps.
//!
//! Sessions are keyed by local calendar day: every hook invocation on the
//! same day shares one dedup window, and the window rolls over at midnight.

use chrono::{Local, NaiveDate};

/// Session id for the current invocation (local calendar day).
pub fn session_id_today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Today's date, for retention arithmetic.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a session id back into a date. Ids that don't parse are treated
/// as expired so malformed entries age out instead of accumulating.
pub fn parse_session_id(id: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(id, "%Y-%m-%d").ok()
}

/// Parse a human-written document date. Docs in the wild mix ISO dates
/// with prose forms, so several formats are tried in order.
pub fn parse_doc_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    None
}
