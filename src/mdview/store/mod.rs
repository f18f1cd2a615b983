//! # Storage Layer
//!
//! Every piece of persisted state in mdview (theme, recent list, snapshots,
//! save counters, scroll offsets) lives in a flat string-to-string mapping
//! behind the [`KeyValueStore`] trait. Components never reach for ambient
//! global state: the store is passed in explicitly, which is what lets the
//! command layer run against [`memory::MemoryStore`] in tests.
//!
//! ## Capacity
//!
//! Stores have a finite capacity, measured as the sum of key and value
//! lengths in bytes. A `set` that would push usage over the ceiling fails
//! with [`MdvError::QuotaExceeded`](crate::error::MdvError::QuotaExceeded)
//! and leaves the previous value in place.
//!
//! ## Key Space
//!
//! ```text
//! theme                     dark | light | eye
//! recent-index              {"version":1,"entries":[...]}
//! snapshot:<derived-id>     document text (possibly truncated)
//! counter:<base-name>       decimal integer, last number handed out
//! scroll:<descriptor>       last scroll offset for a document source
//! ```
//!
//! Nothing beyond the shapes above may be assumed about stored values.
//! Readers treat malformed values permissively (see `naming` and `recent`).
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: A single `store.json` per data directory, rewritten
//!   atomically (tmp file + rename) on every mutation under an exclusive
//!   `store.lock`, so several `mdv` processes can share one directory.
//! - [`memory::MemoryStore`]: In-memory, with write-error simulation.

use crate::error::Result;

pub mod fs;
pub mod memory;

pub const THEME_KEY: &str = "theme";
pub const RECENT_INDEX_KEY: &str = "recent-index";
pub const SNAPSHOT_PREFIX: &str = "snapshot:";
pub const COUNTER_PREFIX: &str = "counter:";
pub const SCROLL_PREFIX: &str = "scroll:";

/// Default capacity, in bytes of key + value, mirroring the usual
/// browser local storage allowance.
pub const DEFAULT_QUOTA: usize = 5 * 1024 * 1024;

/// Abstract persistent mapping from string key to string value.
///
/// All calls are synchronous. Implementations must make `set` all-or-nothing:
/// when it fails, the prior value (or absence) of the key is unchanged.
pub trait KeyValueStore {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// All keys currently present, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Run a read-modify-write sequence as one unit.
    ///
    /// Stores shared between processes hold an exclusive lock for the whole
    /// of `f` and see the latest persisted state inside it. Counter bumps and
    /// recent-list edits go through here.
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>,
    {
        f(self)
    }
}

/// Bytes a single entry counts against the quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
