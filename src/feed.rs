//! The unified update feed.
//!
//! The feed is a plain `Vec<Update>`, newest first. It is only ever replaced
//! wholesale by the pure functions below, never patched in place.

use std::collections::HashSet;

use crate::source::Update;

/// Maximum number of updates kept in the feed.
pub const FEED_CAPACITY: usize = 50;

/// Merge a freshly fetched batch into the current feed.
///
/// Batch items whose id is not yet in the feed are prepended in batch order;
/// repeats inside the batch collapse to their first occurrence. Existing
/// entries keep their relative order. The result is cut to
/// [`FEED_CAPACITY`].
pub fn merge(current: &[Update], batch: Vec<Update>) -> Vec<Update> {
    let mut seen: HashSet<String> = current.iter().map(|u| u.id.clone()).collect();

    let fresh = batch.into_iter().filter(|u| seen.insert(u.id.clone()));

    fresh
        .chain(current.iter().cloned())
        .take(FEED_CAPACITY)
        .collect()
}

/// Drop every update fetched for `account_id`.
pub fn without_account(current: &[Update], account_id: &str) -> Vec<Update> {
    current
        .iter()
        .filter(|u| u.account_id != account_id)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
