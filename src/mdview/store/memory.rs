use super::{entry_size, KeyValueStore, DEFAULT_QUOTA};
use crate::error::{MdvError, Result};
use std::collections::HashMap;

/// In-memory key-value store for testing.
///
/// Enforces the same quota rules as the file store so that capacity
/// failures can be exercised without touching disk.
pub struct MemoryStore {
    entries: HashMap<String, String>,
    capacity: usize,
    used: usize,
    simulate_write_error: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUOTA)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            used: 0,
            simulate_write_error: false,
        }
    }

    /// Make every subsequent `set` fail with a store error.
    pub fn set_simulate_write_error(&mut self, simulate: bool) {
        self.simulate_write_error = simulate;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error {
            return Err(MdvError::Store("Simulated write error".to_string()));
        }

        let previous = self.entries.get(key).map_or(0, |v| entry_size(key, v));
        let needed = entry_size(key, value);
        let available = self.capacity - (self.used - previous);
        if needed > available {
            return Err(MdvError::QuotaExceeded {
                key: key.to_string(),
                needed,
                available,
            });
        }

        self.entries.insert(key.to_string(), value.to_string());
        self.used = self.used - previous + needed;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(value) = self.entries.remove(key) {
            self.used -= entry_size(key, &value);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}
