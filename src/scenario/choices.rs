//! Choice fragment merge algorithm
//!
//! The backend streams the same logical choice repeatedly with
//! progressively longer text, but does not guarantee whether successive
//! fragments for one id are cumulative snapshots or incremental deltas.
//! Merging therefore applies a three-way policy per id: a textual
//! extension replaces, a shorter prefix is ignored as stale, and a
//! divergent fragment is appended to the existing text. Appending is the
//! safe default for unknown fragment semantics; it can duplicate text if
//! the backend actually resends full snapshots with edits, but it never
//! loses data.

use crate::sse::Choice;

/// Merge an incoming fragment list into the previously merged list.
///
/// First-seen order is preserved: known ids update in place, new ids
/// append at the end. An empty side never discards the other.
pub fn merge_choices(previous: Vec<Choice>, incoming: Vec<Choice>) -> Vec<Choice> {
    if previous.is_empty() {
        return incoming;
    }
    if incoming.is_empty() {
        return previous;
    }

    let mut merged = previous;
    for fragment in incoming {
        let Some(existing) = merged.iter_mut().find(|c| c.id == fragment.id) else {
            merged.push(fragment);
            continue;
        };

        if fragment.text.starts_with(&existing.text) {
            // Extension or exact repeat
            existing.text = fragment.text;
        } else if existing.text.starts_with(&fragment.text) {
            // Stale shorter duplicate
        } else {
            // Divergent fragment: treat as a continuation
            existing.text.push_str(&fragment.text);
        }
    }
    merged
}
