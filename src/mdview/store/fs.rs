use super::{entry_size, KeyValueStore, DEFAULT_QUOTA};
use crate::error::{MdvError, Result};
use fd_lock::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const STORE_FILENAME: &str = "store.json";
const LOCK_FILENAME: &str = "store.lock";

/// File-backed key-value store.
///
/// Reads are served from an in-memory copy of `store.json`. Every mutation
/// takes an exclusive lock on `store.lock`, reloads the file, applies the
/// change and writes it back before releasing the lock, so processes sharing
/// a data directory never overwrite each other's keys. Writes go to a temp
/// file first and are renamed into place, so a crash never leaves a
/// half-written store behind.
pub struct FileStore {
    root: PathBuf,
    entries: BTreeMap<String, String>,
    capacity: usize,
    used: usize,
    locked: bool,
}

impl FileStore {
    /// Open (or lazily create) the store in `root`.
    ///
    /// A corrupt `store.json` is set aside as `store.json.corrupt` and an
    /// empty store is used instead.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let entries = load_entries(&root)?;
        let used = usage(&entries);
        Ok(Self {
            root,
            entries,
            capacity: DEFAULT_QUOTA,
            used,
            locked: false,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(MdvError::Io)?;
        }
        Ok(())
    }

    fn lock_file(&self) -> Result<File> {
        self.ensure_dir()?;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILENAME))
            .map_err(MdvError::Io)
    }

    fn reload(&mut self) -> Result<()> {
        self.entries = load_entries(&self.root)?;
        self.used = usage(&self.entries);
        Ok(())
    }

    /// Run `f` holding the directory lock, against freshly loaded entries.
    /// Nested calls reuse the lock already held.
    fn exclusive<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.locked {
            return f(self);
        }
        let mut lock = RwLock::new(self.lock_file()?);
        let _guard = lock.write().map_err(MdvError::Io)?;
        self.reload()?;

        self.locked = true;
        let result = f(self);
        self.locked = false;
        result
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        self.ensure_dir()?;

        let data_file = self.root.join(STORE_FILENAME);
        let content = serde_json::to_string_pretty(entries).map_err(MdvError::Serialization)?;

        let tmp_file = self.root.join(format!(".store-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(MdvError::Io)?;
        if let Err(e) = fs::rename(&tmp_file, &data_file) {
            let _ = fs::remove_file(&tmp_file);
            return Err(MdvError::Io(e));
        }
        Ok(())
    }

    fn set_locked(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.entries.get(key).map_or(0, |v| entry_size(key, v));
        let needed = entry_size(key, value);
        let available = self.capacity.saturating_sub(self.used - previous);
        if needed > available {
            return Err(MdvError::QuotaExceeded {
                key: key.to_string(),
                needed,
                available,
            });
        }

        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;

        debug!(key, bytes = value.len(), "store set");
        self.entries = next;
        self.used = self.used - previous + needed;
        Ok(())
    }

    fn remove_locked(&mut self, key: &str) -> Result<()> {
        let Some(value) = self.entries.get(key) else {
            return Ok(());
        };
        let size = entry_size(key, value);

        let mut next = self.entries.clone();
        next.remove(key);
        self.flush(&next)?;

        debug!(key, "store remove");
        self.entries = next;
        self.used -= size;
        Ok(())
    }
}

fn usage(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| entry_size(k, v)).sum()
}

fn load_entries(root: &Path) -> Result<BTreeMap<String, String>> {
    let data_file = root.join(STORE_FILENAME);
    if !data_file.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(&data_file).map_err(MdvError::Io)?;
    match serde_json::from_str(&content) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!(error = %e, path = %data_file.display(), "unreadable store, starting empty");
            let _ = fs::rename(&data_file, root.join(format!("{}.corrupt", STORE_FILENAME)));
            Ok(BTreeMap::new())
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.exclusive(|store| store.set_locked(key, value))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.exclusive(|store| store.remove_locked(key))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.exclusive(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::next_numbered_name;

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(dir.path()).unwrap();
            store.set("theme", "eye").unwrap();
            store.set("counter:note", "3").unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("eye"));
        assert_eq!(store.get("counter:note").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn missing_directory_is_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("data");
        let mut store = FileStore::open(&root).unwrap();
        assert!(store.keys().unwrap().is_empty());

        store.set("a", "b").unwrap();
        assert!(root.join(STORE_FILENAME).exists());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILENAME), "{not json").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(dir.path().join("store.json.corrupt").exists());
    }

    #[test]
    fn quota_failure_leaves_disk_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap().with_capacity(16);
        store.set("k", "small").unwrap();

        let err = store.set("big", "0123456789abcdef").unwrap_err();
        assert!(matches!(err, MdvError::QuotaExceeded { .. }));

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("big").unwrap(), None);
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.set("a", "1").unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(!reopened.contains("a").unwrap());
    }

    #[test]
    fn two_handles_keep_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = FileStore::open(dir.path()).unwrap();
        let mut b = FileStore::open(dir.path()).unwrap();

        a.set("theme", "eye").unwrap();
        b.set("scroll:sample", "40").unwrap();
        a.remove("missing").unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("eye"));
        assert_eq!(reopened.get("scroll:sample").unwrap().as_deref(), Some("40"));
    }

    #[test]
    fn two_handles_never_share_a_number() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = FileStore::open(dir.path()).unwrap();
        let mut b = FileStore::open(dir.path()).unwrap();

        let first = next_numbered_name(&mut a, "note.md").unwrap();
        let second = next_numbered_name(&mut b, "note.md").unwrap();
        let third = next_numbered_name(&mut a, "note.md").unwrap();

        assert_eq!(first, "note(1).md");
        assert_eq!(second, "note(2).md");
        assert_eq!(third, "note(3).md");
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("counter:note").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn transaction_sees_other_handles_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = FileStore::open(dir.path()).unwrap();
        let mut b = FileStore::open(dir.path()).unwrap();
        b.set("k", "from-b").unwrap();

        let seen = a.transaction(|store| store.get("k")).unwrap();
        assert_eq!(seen.as_deref(), Some("from-b"));
    }
}
