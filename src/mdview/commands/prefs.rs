//! Display preferences: the colour theme and the remembered scroll offset
//! of each document source. Unreadable stored values fall back to the
//! defaults instead of failing.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Theme;
use crate::store::{KeyValueStore, SCROLL_PREFIX, THEME_KEY};
use tracing::{debug, warn};

pub fn theme<S: KeyValueStore>(store: &S) -> Result<Theme> {
    let raw = store.get(THEME_KEY)?;
    Ok(match raw.as_deref().map(Theme::parse) {
        Some(Some(theme)) => theme,
        Some(None) => {
            warn!(value = ?raw, "unknown theme stored, using dark");
            Theme::default()
        }
        None => Theme::default(),
    })
}

pub fn get_theme<S: KeyValueStore>(store: &S) -> Result<CmdResult> {
    Ok(CmdResult::default().with_theme(theme(store)?))
}

pub fn set_theme<S: KeyValueStore>(store: &mut S, theme: Theme) -> Result<CmdResult> {
    store.set(THEME_KEY, theme.as_str())?;
    debug!(%theme, "theme set");
    Ok(CmdResult::default()
        .with_theme(theme)
        .with_message(CmdMessage::success(format!("Theme: {}", theme))))
}

/// dark -> light -> eye -> dark
pub fn cycle_theme<S: KeyValueStore>(store: &mut S) -> Result<CmdResult> {
    let next = theme(store)?.next();
    set_theme(store, next)
}

fn scroll_key(descriptor: &str) -> String {
    format!("{}{}", SCROLL_PREFIX, descriptor)
}

pub fn scroll<S: KeyValueStore>(store: &S, descriptor: &str) -> Result<u64> {
    Ok(store
        .get(&scroll_key(descriptor))?
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0))
}

pub fn save_scroll<S: KeyValueStore>(store: &mut S, descriptor: &str, offset: u64) -> Result<()> {
    store.set(&scroll_key(descriptor), &offset.to_string())
}
