//! # Recent Documents
//!
//! A bounded, newest-first list of documents the user has loaded or saved.
//! Each entry points at a point-in-time snapshot of the full text stored
//! under its own `snapshot:` key, so a recent document can be reopened even
//! when the original file or URL is gone.
//!
//! ## Invariants
//!
//! - At most `max_entries` entries, newest first.
//! - No two entries share `(kind, title)`: re-inserting replaces and moves
//!   the entry to the front.
//! - Every entry's snapshot key exists in the store. Replaced, evicted,
//!   removed and cleared entries take their snapshots with them.
//!
//! ## Atomicity
//!
//! An insert writes the snapshot first and the index second. If the index
//! write fails the fresh snapshot is removed again, and old snapshots are
//! only deleted once the new index is in place. A quota failure therefore
//! leaves the previous list and its snapshots exactly as they were.
//!
//! ## Index Format
//!
//! `recent-index` holds `{"version": 1, "entries": [...]}`. A bare JSON array
//! (the unversioned layout) is migrated on read. Unreadable or unknown
//! versions read as an empty list rather than an error.

use crate::error::{MdvError, Result};
use crate::model::{RecentEntry, RecentKind};
use crate::store::{KeyValueStore, RECENT_INDEX_KEY, SNAPSHOT_PREFIX};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub const DEFAULT_MAX_ENTRIES: usize = 12;
pub const DEFAULT_MAX_SNAPSHOT_CHARS: usize = 180_000;

const INDEX_VERSION: u32 = 1;
const TITLE_KEY_CHARS: usize = 80;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct RecentIndex {
    version: u32,
    entries: Vec<RecentEntry>,
}

#[derive(Debug, Clone, Copy)]
pub struct RecentCache {
    max_entries: usize,
    max_snapshot_chars: usize,
}

impl Default for RecentCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_SNAPSHOT_CHARS)
    }
}

impl RecentCache {
    pub fn new(max_entries: usize, max_snapshot_chars: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_snapshot_chars,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Record a document, replacing any entry with the same `(kind, title)`.
    pub fn insert<S: KeyValueStore>(
        &self,
        store: &mut S,
        kind: RecentKind,
        title: &str,
        subtitle: &str,
        content: &str,
    ) -> Result<RecentEntry> {
        store.transaction(|store| {
            let mut entries = load_entries(store)?;

            let entry = loop {
                let candidate = new_entry(kind, title, subtitle);
                let taken = entries.iter().any(|e| e.id == candidate.id)
                    || store.contains(&candidate.snapshot_key)?;
                if !taken {
                    break candidate;
                }
            };

            store.set(&entry.snapshot_key, truncate_chars(content, self.max_snapshot_chars))?;

            let (replaced, kept): (Vec<_>, Vec<_>) = entries
                .drain(..)
                .partition(|e| e.same_document(kind, title));
            let mut next = Vec::with_capacity(kept.len() + 1);
            next.push(entry.clone());
            next.extend(kept);
            let evicted = if next.len() > self.max_entries {
                next.split_off(self.max_entries)
            } else {
                Vec::new()
            };

            if let Err(e) = save_entries(store, &next) {
                if let Err(cleanup) = store.remove(&entry.snapshot_key) {
                    warn!(key = %entry.snapshot_key, error = %cleanup, "could not roll back snapshot");
                }
                return Err(e);
            }

            for old in replaced.iter().chain(evicted.iter()) {
                if old.snapshot_key != entry.snapshot_key {
                    drop_snapshot(store, &old.snapshot_key);
                }
            }

            debug!(
                id = %entry.id,
                replaced = replaced.len(),
                evicted = evicted.len(),
                "recent entry inserted"
            );
            Ok(entry)
        })
    }

    /// Remove one entry and its snapshot. Returns `None` if no entry has `id`.
    pub fn remove<S: KeyValueStore>(&self, store: &mut S, id: &str) -> Result<Option<RecentEntry>> {
        store.transaction(|store| {
            let mut entries = load_entries(store)?;
            let Some(pos) = entries.iter().position(|e| e.id == id) else {
                return Ok(None);
            };
            let removed = entries.remove(pos);
            save_entries(store, &entries)?;
            drop_snapshot(store, &removed.snapshot_key);
            Ok(Some(removed))
        })
    }

    /// Remove every entry and every snapshot they reference.
    pub fn clear<S: KeyValueStore>(&self, store: &mut S) -> Result<usize> {
        store.transaction(|store| {
            let entries = load_entries(store)?;
            store.remove(RECENT_INDEX_KEY)?;
            for entry in &entries {
                drop_snapshot(store, &entry.snapshot_key);
            }
            Ok(entries.len())
        })
    }

    /// Newest-first entries, optionally filtered by a case-insensitive
    /// substring of title, subtitle or kind.
    pub fn list<S: KeyValueStore>(&self, store: &S, filter: Option<&str>) -> Result<Vec<RecentEntry>> {
        let entries = load_entries(store)?;
        let filter = filter.map(|f| f.trim().to_lowercase()).unwrap_or_default();
        if filter.is_empty() {
            return Ok(entries);
        }
        Ok(entries.into_iter().filter(|e| e.matches(&filter)).collect())
    }

    /// Look up an entry and its snapshot text.
    ///
    /// A missing entry or a missing snapshot is `NotFound`. An empty snapshot
    /// is a legitimately empty document and is returned as such.
    pub fn open<S: KeyValueStore>(&self, store: &S, id: &str) -> Result<(RecentEntry, String)> {
        let entry = load_entries(store)?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| MdvError::NotFound(format!("recent entry {}", id)))?;
        match store.get(&entry.snapshot_key)? {
            Some(text) => Ok((entry, text)),
            None => Err(MdvError::NotFound(format!(
                "snapshot for '{}' is no longer available",
                entry.title
            ))),
        }
    }

    /// Delete `snapshot:` keys no entry references. Returns how many went.
    pub fn prune_orphans<S: KeyValueStore>(&self, store: &mut S) -> Result<usize> {
        store.transaction(|store| {
            let entries = load_entries(store)?;
            let orphans: Vec<String> = store
                .keys()?
                .into_iter()
                .filter(|k| k.starts_with(SNAPSHOT_PREFIX))
                .filter(|k| !entries.iter().any(|e| &e.snapshot_key == k))
                .collect();
            for key in &orphans {
                store.remove(key)?;
            }
            Ok(orphans.len())
        })
    }
}

fn load_entries<S: KeyValueStore>(store: &S) -> Result<Vec<RecentEntry>> {
    let Some(raw) = store.get(RECENT_INDEX_KEY)? else {
        return Ok(Vec::new());
    };
    if let Ok(index) = serde_json::from_str::<RecentIndex>(&raw) {
        if index.version == INDEX_VERSION {
            return Ok(index.entries);
        }
        warn!(version = index.version, "unknown recent index version, ignoring");
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Vec<RecentEntry>>(&raw) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!(error = %e, "unreadable recent index, treating as empty");
            Ok(Vec::new())
        }
    }
}

fn save_entries<S: KeyValueStore>(store: &mut S, entries: &[RecentEntry]) -> Result<()> {
    let index = RecentIndex {
        version: INDEX_VERSION,
        entries: entries.to_vec(),
    };
    let json = serde_json::to_string(&index).map_err(MdvError::Serialization)?;
    store.set(RECENT_INDEX_KEY, &json)
}

fn drop_snapshot<S: KeyValueStore>(store: &mut S, key: &str) {
    if let Err(e) = store.remove(key) {
        warn!(key, error = %e, "could not remove snapshot");
    }
}

fn new_entry(kind: RecentKind, title: &str, subtitle: &str) -> RecentEntry {
    let now = Utc::now();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let id = format!(
        "{}:{}:{}.{}",
        kind,
        safe_key(title, TITLE_KEY_CHARS),
        now.timestamp_millis(),
        seq
    );
    let snapshot_key = format!("{}{}", SNAPSHOT_PREFIX, safe_key(&id, usize::MAX));
    RecentEntry {
        id,
        kind,
        title: title.to_string(),
        subtitle: subtitle.to_string(),
        timestamp: now,
        snapshot_key,
    }
}

/// Keep ASCII alphanumerics, CJK ideographs and `._-`; everything else
/// becomes `_`.
fn safe_key(s: &str, max_chars: usize) -> String {
    s.chars()
        .take(max_chars)
        .map(|c| {
            let keep = c.is_ascii_alphanumeric()
                || matches!(c, '.' | '_' | '-')
                || ('\u{4e00}'..='\u{9fff}').contains(&c);
            if keep {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn snapshot_count(store: &MemoryStore) -> usize {
        store
            .keys()
            .unwrap()
            .iter()
            .filter(|k| k.starts_with(SNAPSHOT_PREFIX))
            .count()
    }

    #[test]
    fn same_kind_and_title_replaces_entry_and_snapshot() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let first = cache
            .insert(&mut store, RecentKind::Local, "a.md", "", "first")
            .unwrap();
        let second = cache
            .insert(&mut store, RecentKind::Local, "a.md", "", "second")
            .unwrap();

        let listed = cache.list(&store, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(cache.open(&store, &second.id).unwrap().1, "second");
        assert!(!store.contains(&first.snapshot_key).unwrap());
        assert_eq!(snapshot_count(&store), 1);
    }

    #[test]
    fn same_title_different_kind_are_distinct() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        cache.insert(&mut store, RecentKind::Local, "x", "", "1").unwrap();
        cache.insert(&mut store, RecentKind::Url, "x", "", "2").unwrap();
        assert_eq!(cache.list(&store, None).unwrap().len(), 2);
    }

    #[test]
    fn overflow_evicts_oldest_and_its_snapshot() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::new(3, DEFAULT_MAX_SNAPSHOT_CHARS);
        let oldest = cache
            .insert(&mut store, RecentKind::Local, "0.md", "", "zero")
            .unwrap();
        for i in 1..=3 {
            cache
                .insert(&mut store, RecentKind::Local, &format!("{}.md", i), "", "x")
                .unwrap();
        }

        let titles: Vec<String> = cache
            .list(&store, None)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["3.md", "2.md", "1.md"]);
        assert!(!store.contains(&oldest.snapshot_key).unwrap());
        assert_eq!(snapshot_count(&store), 3);
    }

    #[test]
    fn default_capacity_is_twelve() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        for i in 0..=DEFAULT_MAX_ENTRIES {
            cache
                .insert(&mut store, RecentKind::Local, &format!("{}.md", i), "", "x")
                .unwrap();
        }
        let listed = cache.list(&store, None).unwrap();
        assert_eq!(listed.len(), DEFAULT_MAX_ENTRIES);
        assert_eq!(listed[0].title, "12.md");
        assert!(listed.iter().all(|e| e.title != "0.md"));
    }

    #[test]
    fn reinsert_moves_to_front() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        cache.insert(&mut store, RecentKind::Local, "a", "", "").unwrap();
        cache.insert(&mut store, RecentKind::Local, "b", "", "").unwrap();
        cache.insert(&mut store, RecentKind::Local, "a", "", "").unwrap();
        let titles: Vec<String> = cache
            .list(&store, None)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["a", "b"]);
    }

    #[test]
    fn clear_removes_entries_and_snapshots() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "1").unwrap();
        let b = cache.insert(&mut store, RecentKind::Url, "b", "", "2").unwrap();

        assert_eq!(cache.clear(&mut store).unwrap(), 2);
        assert!(cache.list(&store, None).unwrap().is_empty());
        assert!(!store.contains(&a.snapshot_key).unwrap());
        assert!(!store.contains(&b.snapshot_key).unwrap());
    }

    #[test]
    fn remove_deletes_snapshot_and_ignores_unknown_id() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "1").unwrap();

        assert!(cache.remove(&mut store, "nope").unwrap().is_none());
        assert_eq!(cache.list(&store, None).unwrap().len(), 1);

        let removed = cache.remove(&mut store, &a.id).unwrap().unwrap();
        assert_eq!(removed.id, a.id);
        assert!(!store.contains(&a.snapshot_key).unwrap());
    }

    #[test]
    fn open_with_missing_snapshot_is_not_found() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "text").unwrap();
        store.remove(&a.snapshot_key).unwrap();

        assert!(matches!(cache.open(&store, &a.id), Err(MdvError::NotFound(_))));
    }

    #[test]
    fn open_empty_snapshot_returns_empty_text() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "").unwrap();
        assert_eq!(cache.open(&store, &a.id).unwrap().1, "");
    }

    #[test]
    fn filter_is_case_insensitive_over_title_subtitle_kind() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        cache
            .insert(&mut store, RecentKind::Local, "Notes.md", "Saved as numbered file", "")
            .unwrap();
        cache
            .insert(&mut store, RecentKind::Url, "https://x.org/r.md", "URL", "")
            .unwrap();
        cache.insert(&mut store, RecentKind::Sample, "sample.md", "Sample", "").unwrap();

        assert_eq!(cache.list(&store, Some("NOTES")).unwrap().len(), 1);
        assert_eq!(cache.list(&store, Some("numbered")).unwrap().len(), 1);
        assert_eq!(cache.list(&store, Some("url")).unwrap().len(), 1);
        assert_eq!(cache.list(&store, Some(".md")).unwrap().len(), 3);
        assert_eq!(cache.list(&store, Some("  ")).unwrap().len(), 3);
        assert!(cache.list(&store, Some("zzz")).unwrap().is_empty());
    }

    #[test]
    fn snapshot_is_truncated_by_chars() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::new(DEFAULT_MAX_ENTRIES, 3);
        let e = cache.insert(&mut store, RecentKind::Local, "a", "", "äöüß").unwrap();
        assert_eq!(cache.open(&store, &e.id).unwrap().1, "äöü");
    }

    #[test]
    fn ids_are_unique_within_the_same_millisecond() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "").unwrap();
        let b = cache.insert(&mut store, RecentKind::Local, "a", "", "").unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.snapshot_key, b.snapshot_key);
    }

    #[test]
    fn quota_failure_on_snapshot_leaves_state_untouched() {
        let mut store = MemoryStore::with_capacity(600);
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "keep me").unwrap();
        let before = store.get(RECENT_INDEX_KEY).unwrap();

        let huge = "x".repeat(10_000);
        let err = cache
            .insert(&mut store, RecentKind::Local, "a", "", &huge)
            .unwrap_err();
        assert!(matches!(err, MdvError::QuotaExceeded { .. }));
        assert_eq!(store.get(RECENT_INDEX_KEY).unwrap(), before);
        assert_eq!(cache.open(&store, &a.id).unwrap().1, "keep me");
        assert_eq!(snapshot_count(&store), 1);
    }

    #[test]
    fn quota_failure_on_index_rolls_back_snapshot() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        cache.insert(&mut store, RecentKind::Local, "a", "", "keep").unwrap();
        let before = store.get(RECENT_INDEX_KEY).unwrap().unwrap();

        // Leave just enough room for the snapshot but not for a longer index
        let snapshot_room = 200;
        let cap = store.used() + snapshot_room;
        let mut tight = MemoryStore::with_capacity(cap);
        for key in store.keys().unwrap() {
            let value = store.get(&key).unwrap().unwrap();
            tight.set(&key, &value).unwrap();
        }

        let content = "y".repeat(snapshot_room - 60);
        let err = cache
            .insert(&mut tight, RecentKind::Local, "b", "", &content)
            .unwrap_err();
        assert!(matches!(err, MdvError::QuotaExceeded { .. }));
        assert_eq!(tight.get(RECENT_INDEX_KEY).unwrap().unwrap(), before);
        assert_eq!(snapshot_count(&tight), 1);
    }

    #[test]
    fn legacy_array_index_is_migrated() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let e = cache.insert(&mut store, RecentKind::Url, "u", "", "t").unwrap();
        store
            .set(RECENT_INDEX_KEY, &serde_json::to_string(&vec![e.clone()]).unwrap())
            .unwrap();

        let listed = cache.list(&store, None).unwrap();
        assert_eq!(listed, vec![e]);
    }

    #[test]
    fn garbage_index_reads_as_empty() {
        let mut store = MemoryStore::new();
        store.set(RECENT_INDEX_KEY, "{oops").unwrap();
        let cache = RecentCache::default();
        assert!(cache.list(&store, None).unwrap().is_empty());

        store
            .set(RECENT_INDEX_KEY, r#"{"version":99,"entries":[]}"#)
            .unwrap();
        assert!(cache.list(&store, None).unwrap().is_empty());
    }

    #[test]
    fn prune_orphans_keeps_referenced_snapshots() {
        let mut store = MemoryStore::new();
        let cache = RecentCache::default();
        let a = cache.insert(&mut store, RecentKind::Local, "a", "", "1").unwrap();
        store.set("snapshot:stray", "x").unwrap();

        assert_eq!(cache.prune_orphans(&mut store).unwrap(), 1);
        assert!(store.contains(&a.snapshot_key).unwrap());
        assert!(!store.contains("snapshot:stray").unwrap());
    }

    #[test]
    fn safe_key_replaces_separators() {
        assert_eq!(safe_key("a b/c:d.md", 80), "a_b_c_d.md");
        assert_eq!(safe_key("筆記.md", 80), "筆記.md");
        assert_eq!(safe_key("abcdef", 3), "abc");
    }

    #[test]
    fn inserts_from_two_store_handles_are_both_kept() {
        use crate::store::fs::FileStore;

        let dir = tempfile::tempdir().unwrap();
        let mut a = FileStore::open(dir.path()).unwrap();
        let mut b = FileStore::open(dir.path()).unwrap();
        let cache = RecentCache::default();

        let first = cache
            .insert(&mut a, RecentKind::Local, "a.md", "sub", "A")
            .unwrap();
        let second = cache
            .insert(&mut b, RecentKind::Local, "b.md", "sub", "B")
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        let ids: Vec<String> = cache
            .list(&reopened, None)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(cache.prune_orphans(&mut FileStore::open(dir.path()).unwrap()).unwrap(), 0);
    }
}
