// src/ingest/rank.rs
use std::collections::HashMap;

use crate::ingest::types::NewsItem;

/// Drop repeated ids. The item seen last replaces the earlier one but keeps the
/// earlier slot, so the relative order of first appearances is preserved.
/// Returns the unique items and how many were replaced.
pub fn dedup_last_wins(items: Vec<NewsItem>) -> (Vec<NewsItem>, usize) {
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<NewsItem> = Vec::with_capacity(items.len());
    let mut replaced = 0usize;

    for it in items {
        match slot.get(&it.id) {
            Some(&i) => {
                out[i] = it;
                replaced += 1;
            }
            None => {
                slot.insert(it.id.clone(), out.len());
                out.push(it);
            }
        }
    }
    (out, replaced)
}

/// Newest first. Stable, so equal timestamps keep their input order.
pub fn sort_newest_first(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.time.cmp(&a.time));
}

/// Sort newest first and keep at most `max_count`; the rest is discarded.
pub fn rank_and_truncate(mut items: Vec<NewsItem>, max_count: usize) -> Vec<NewsItem> {
    sort_newest_first(&mut items);
    items.truncate(max_count);
    items
}

/// Dedup (last write wins), sort by time descending, keep at most `max_count`.
pub fn merge_and_rank(items: Vec<NewsItem>, max_count: usize) -> Vec<NewsItem> {
    let (unique, _) = dedup_last_wins(items);
    rank_and_truncate(unique, max_count)
}
