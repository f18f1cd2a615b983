use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::recent::RecentCache;
use crate::store::KeyValueStore;

pub fn list<S: KeyValueStore>(
    store: &S,
    cache: &RecentCache,
    filter: Option<&str>,
) -> Result<CmdResult> {
    let entries = cache.list(store, filter)?;
    let mut result = CmdResult::default();
    if entries.is_empty() {
        let text = match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => format!("No recent documents match '{}'", f),
            None => "No recent documents".to_string(),
        };
        result.add_message(CmdMessage::info(text));
    }
    Ok(result.with_recent(entries))
}

pub fn remove<S: KeyValueStore>(store: &mut S, cache: &RecentCache, id: &str) -> Result<CmdResult> {
    Ok(match cache.remove(store, id)? {
        Some(entry) => CmdResult::default().with_message(CmdMessage::success(format!(
            "Removed '{}' from the recent list",
            entry.title
        ))),
        None => CmdResult::default()
            .with_message(CmdMessage::error(format!("No recent entry {}", id))),
    })
}

pub fn clear<S: KeyValueStore>(store: &mut S, cache: &RecentCache) -> Result<CmdResult> {
    let n = cache.clear(store)?;
    Ok(CmdResult::default().with_message(CmdMessage::success(format!(
        "Cleared {} recent {}",
        n,
        if n == 1 { "document" } else { "documents" }
    ))))
}

/// Drop snapshots that no entry points at, e.g. left behind by an
/// interrupted write.
pub fn prune<S: KeyValueStore>(store: &mut S, cache: &RecentCache) -> Result<CmdResult> {
    let n = cache.prune_orphans(store)?;
    let message = if n == 0 {
        CmdMessage::info("No orphaned snapshots")
    } else {
        CmdMessage::success(format!("Removed {} orphaned snapshots", n))
    };
    Ok(CmdResult::default().with_message(message))
}
