//! Watermark diff: which fetched entries are new, and in what order they go out.

use anifeed_core::activity::{ActivityEntry, ActivityId};

/// Result of comparing one fetched page against a watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntries {
    /// Entries to deliver, oldest first.
    pub deliver: Vec<ActivityEntry>,
    /// New entries dropped by the per-poll cap.
    pub skipped: usize,
    /// Highest id in the fetched page.
    pub newest: ActivityId,
}

/// Select the entries newer than `watermark`.
///
/// With no watermark only the single newest entry counts as new, so a fresh
/// subscription does not replay the account's history. When more than `cap`
/// entries are new, the most recent `cap` are kept and the older ones are
/// skipped. Returns `None` for an empty page.
pub fn select_new_entries(
    fetched: &[ActivityEntry],
    watermark: Option<ActivityId>,
    cap: usize,
) -> Option<NewEntries> {
    let newest = fetched.iter().map(|e| e.id).max()?;

    let mut fresh: Vec<ActivityEntry> = match watermark {
        None => fetched.iter().filter(|e| e.id == newest).take(1).cloned().collect(),
        Some(w) => fetched.iter().filter(|e| e.id > w).cloned().collect(),
    };
    fresh.sort_by_key(|e| e.id);
    fresh.dedup_by_key(|e| e.id);

    let skipped = fresh.len().saturating_sub(cap);
    let deliver = fresh.split_off(skipped);

    Some(NewEntries {
        deliver,
        skipped,
        newest,
    })
}

/// The watermark after a poll that saw `newest`. Never moves backwards.
pub fn advance(current: Option<ActivityId>, newest: ActivityId) -> ActivityId {
    current.map_or(newest, |w| w.max(newest))
}
