//! # Numbered Save-As Names
//!
//! When a document cannot be written back in place it is emitted as a new,
//! never-before-used numbered copy: `note.md` becomes `note(1).md`, then
//! `note(2).md`, and so on.
//!
//! ## Rules
//!
//! 1. The name is split at the last `.`. No dot, or a dot in first position
//!    (`.bashrc`), means the whole name is the base and `.md` is assumed.
//! 2. A trailing `(<digits>)` is stripped from the base, so saving
//!    `note(3).md` again yields `note(N).md` and never `note(3)(1).md`.
//! 3. One counter per normalized base lives under `counter:<base>`. Missing or
//!    malformed values read as 0, so a damaged counter never blocks saving.
//!    A value past the `u64` range reads as exhausted rather than as 0.
//! 4. Counters only move forward. They are never reset or decremented, and
//!    numbers of deleted files are not reused.
//!
//! ## Reservation Policy
//!
//! [`CounterPolicy::Optimistic`] persists the incremented counter before the
//! name is returned, so a save that later fails still burns the number.
//! [`CounterPolicy::OnConfirm`] only peeks; the caller commits the number once
//! the artifact has actually been accepted.

use crate::error::{MdvError, Result};
use crate::store::{KeyValueStore, COUNTER_PREFIX};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use tracing::debug;

pub const DEFAULT_EXTENSION: &str = ".md";
pub const DEFAULT_FILE_NAME: &str = "note.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CounterPolicy {
    /// Persist the counter as soon as a name is handed out.
    #[default]
    Optimistic,
    /// Persist the counter only after the save is confirmed.
    OnConfirm,
}

/// A numbered name together with the counter value it consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedName {
    pub file_name: String,
    pub base: String,
    pub number: u64,
}

/// Split a file name into `(base, extension)`; the extension keeps its dot.
pub fn split_name_and_ext(file_name: &str) -> (String, String) {
    let name = match file_name.trim() {
        "" => DEFAULT_FILE_NAME,
        trimmed => trimmed,
    };
    match name.rfind('.') {
        Some(dot) if dot > 0 => (name[..dot].to_string(), name[dot..].to_string()),
        _ => (name.to_string(), DEFAULT_EXTENSION.to_string()),
    }
}

/// Strip one trailing `(<digits>)` suffix and surrounding whitespace.
pub fn normalize_base(base: &str) -> String {
    let stripped = base
        .strip_suffix(')')
        .and_then(|rest| {
            let open = rest.rfind('(')?;
            let digits = &rest[open + 1..];
            let is_number = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
            is_number.then(|| &rest[..open])
        })
        .unwrap_or(base);
    stripped.trim().to_string()
}

pub fn counter_key(base: &str) -> String {
    format!("{}{}", COUNTER_PREFIX, base)
}

/// Current counter for a normalized base.
///
/// Anything unparsable reads as 0, except a decimal too large for `u64`,
/// which reads as `u64::MAX` so numbers already handed out stay used.
pub fn current_counter<S: KeyValueStore>(store: &S, base: &str) -> Result<u64> {
    let Some(raw) = store.get(&counter_key(base))? else {
        return Ok(0);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) => Ok(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(u64::MAX),
        Err(_) => {
            debug!(base, raw = %raw, "malformed counter, reading as 0");
            Ok(0)
        }
    }
}

/// Compute the next numbered name without persisting anything.
pub fn reserve<S: KeyValueStore>(store: &S, original_name: &str) -> Result<NumberedName> {
    let (base, ext) = split_name_and_ext(original_name);
    let base = normalize_base(&base);
    let number = current_counter(store, &base)?
        .checked_add(1)
        .ok_or_else(|| MdvError::Store(format!("no numbers left for {}", base)))?;
    Ok(NumberedName {
        file_name: format!("{}({}){}", base, number, ext),
        base,
        number,
    })
}

/// Persist the number consumed by `name`. Never moves a counter backwards.
pub fn commit<S: KeyValueStore>(store: &mut S, name: &NumberedName) -> Result<()> {
    store.transaction(|store| {
        let current = current_counter(store, &name.base)?;
        if name.number > current {
            store.set(&counter_key(&name.base), &name.number.to_string())?;
            debug!(base = %name.base, number = name.number, "counter advanced");
        }
        Ok(())
    })
}

/// Hand out the next numbered name for `original_name`, persisting the
/// counter before returning.
pub fn next_numbered_name<S: KeyValueStore>(store: &mut S, original_name: &str) -> Result<String> {
    let name = reserve_and_commit(store, original_name)?;
    Ok(name.file_name)
}

/// [`reserve`] then [`commit`] as one store transaction, so two writers
/// sharing a store never receive the same number.
pub fn reserve_and_commit<S: KeyValueStore>(
    store: &mut S,
    original_name: &str,
) -> Result<NumberedName> {
    store.transaction(|store| {
        let name = reserve(store, original_name)?;
        commit(store, &name)?;
        Ok(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn suffixes_count_up_from_one() {
        let mut store = MemoryStore::new();
        let names: Vec<String> = (0..4)
            .map(|_| next_numbered_name(&mut store, "note.md").unwrap())
            .collect();
        assert_eq!(names, ["note(1).md", "note(2).md", "note(3).md", "note(4).md"]);
    }

    #[test]
    fn interleaved_bases_keep_independent_counters() {
        let mut store = MemoryStore::new();
        assert_eq!(next_numbered_name(&mut store, "a.md").unwrap(), "a(1).md");
        assert_eq!(next_numbered_name(&mut store, "b.txt").unwrap(), "b(1).txt");
        assert_eq!(next_numbered_name(&mut store, "a.md").unwrap(), "a(2).md");
        assert_eq!(next_numbered_name(&mut store, "b.txt").unwrap(), "b(2).txt");
        assert_eq!(next_numbered_name(&mut store, "a(2).md").unwrap(), "a(3).md");
    }

    #[test]
    fn numbered_input_is_normalized_not_compounded() {
        let mut store = MemoryStore::new();
        assert_eq!(next_numbered_name(&mut store, "note(3).md").unwrap(), "note(1).md");
    }

    #[test]
    fn missing_extension_defaults_to_markdown() {
        let mut store = MemoryStore::new();
        assert_eq!(next_numbered_name(&mut store, "README").unwrap(), "README(1).md");
    }

    #[test]
    fn leading_dot_is_not_an_extension() {
        assert_eq!(
            split_name_and_ext(".bashrc"),
            (".bashrc".to_string(), ".md".to_string())
        );
    }

    #[test]
    fn blank_name_uses_placeholder() {
        let mut store = MemoryStore::new();
        assert_eq!(next_numbered_name(&mut store, "  ").unwrap(), "note(1).md");
    }

    #[test]
    fn only_last_extension_is_split() {
        assert_eq!(
            split_name_and_ext("archive.tar.gz"),
            ("archive.tar".to_string(), ".gz".to_string())
        );
    }

    #[test]
    fn normalize_strips_only_numeric_parens() {
        assert_eq!(normalize_base("note(12)"), "note");
        assert_eq!(normalize_base("note (2)"), "note");
        assert_eq!(normalize_base("note(draft)"), "note(draft)");
        assert_eq!(normalize_base("note()"), "note()");
        assert_eq!(normalize_base("(4)"), "");
    }

    #[test]
    fn malformed_counter_reads_as_zero() {
        let mut store = MemoryStore::new();
        store.set("counter:note", "banana").unwrap();
        assert_eq!(next_numbered_name(&mut store, "note.md").unwrap(), "note(1).md");

        store.set("counter:note", "-7").unwrap();
        assert_eq!(next_numbered_name(&mut store, "note.md").unwrap(), "note(1).md");
    }

    #[test]
    fn exhausted_counter_is_an_error_not_a_panic() {
        let mut store = MemoryStore::new();
        store.set("counter:note", &u64::MAX.to_string()).unwrap();

        let err = next_numbered_name(&mut store, "note.md").unwrap_err();
        assert!(matches!(err, MdvError::Store(_)));
        assert_eq!(current_counter(&store, "note").unwrap(), u64::MAX);
    }

    #[test]
    fn oversized_counter_never_restarts_at_one() {
        let mut store = MemoryStore::new();
        store.set("counter:note", "99999999999999999999999").unwrap();

        assert_eq!(current_counter(&store, "note").unwrap(), u64::MAX);
        assert!(next_numbered_name(&mut store, "note.md").is_err());
        assert_eq!(
            store.get("counter:note").unwrap().as_deref(),
            Some("99999999999999999999999")
        );
    }

    #[test]
    fn counter_is_persisted_before_name_is_returned() {
        let mut store = MemoryStore::new();
        next_numbered_name(&mut store, "note.md").unwrap();
        assert_eq!(store.get("counter:note").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn reserve_does_not_persist() {
        let mut store = MemoryStore::new();
        let first = reserve(&store, "note.md").unwrap();
        let again = reserve(&store, "note.md").unwrap();
        assert_eq!(first, again);
        assert_eq!(store.get("counter:note").unwrap(), None);

        commit(&mut store, &first).unwrap();
        assert_eq!(reserve(&store, "note.md").unwrap().number, 2);
    }

    #[test]
    fn commit_never_moves_backwards() {
        let mut store = MemoryStore::new();
        store.set("counter:note", "9").unwrap();
        let stale = NumberedName {
            file_name: "note(3).md".into(),
            base: "note".into(),
            number: 3,
        };
        commit(&mut store, &stale).unwrap();
        assert_eq!(current_counter(&store, "note").unwrap(), 9);
    }

    #[test]
    fn quota_failure_surfaces_and_keeps_counter() {
        let mut store = MemoryStore::with_capacity(0);
        let err = next_numbered_name(&mut store, "note.md").unwrap_err();
        assert!(matches!(err, MdvError::QuotaExceeded { .. }));
        assert_eq!(current_counter(&store, "note").unwrap(), 0);
    }
}
