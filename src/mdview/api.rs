//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for UI
//! clients. It owns the store, the open session and the settings derived
//! from config, and dispatches to `commands/*.rs`.
//!
//! The facade does no terminal I/O and holds no business logic beyond
//! turning display numbers (`1` = newest recent entry) into entry ids.
//!
//! `MdvApi<S: KeyValueStore>` is generic over the storage backend:
//! `FileStore` in the binary, `MemoryStore` in tests.

use crate::clipboard::Clipboard;
use crate::commands::open::LocalAccess;
use crate::commands::save::SaveOptions;
use crate::commands::{self, CmdMessage, CmdResult};
use crate::config::MdvConfig;
use crate::emit::ArtifactEmitter;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::find::FindState;
use crate::model::{Mode, Theme};
use crate::recent::RecentCache;
use crate::render::{self, PageOptions, Rendered};
use crate::session::Session;
use crate::store::KeyValueStore;
use chrono::Local;
use std::path::Path;

pub use crate::commands::{MessageLevel, SaveOutcome};

pub struct MdvApi<S: KeyValueStore> {
    store: S,
    session: Session,
    cache: RecentCache,
    save_options: SaveOptions,
    find: FindState,
}

impl<S: KeyValueStore> MdvApi<S> {
    pub fn new(store: S, config: &MdvConfig) -> Self {
        Self {
            store,
            session: Session::new(),
            cache: config.recent_cache(),
            save_options: SaveOptions {
                policy: config.counter_policy,
                default_file_name: config.default_file_name.clone(),
            },
            find: FindState::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // Loading

    pub fn open_file(&mut self, path: &Path, access: LocalAccess) -> Result<CmdResult> {
        self.find.clear();
        commands::open::open_file(&mut self.store, &mut self.session, &self.cache, path, access)
    }

    pub fn open_url<F: Fetcher>(&mut self, fetcher: &F, url: &str) -> Result<CmdResult> {
        self.find.clear();
        commands::open::open_url(&mut self.store, &mut self.session, &self.cache, fetcher, url)
    }

    pub fn open_sample(&mut self) -> Result<CmdResult> {
        self.find.clear();
        commands::open::open_sample(&mut self.store, &mut self.session, &self.cache)
    }

    pub fn open_text(&mut self, text: String, name: Option<String>) -> CmdResult {
        self.find.clear();
        commands::open::open_text(&mut self.session, text, name)
    }

    /// Reopen the `number`th entry of the recent list (1 = newest).
    pub fn open_recent(&mut self, number: usize) -> Result<CmdResult> {
        let Some(id) = self.recent_id(number)? else {
            return Ok(no_such_entry(number));
        };
        self.find.clear();
        commands::open::open_recent(&mut self.store, &mut self.session, &self.cache, &id)
    }

    // Editing and saving

    /// Replace the text of the open document, keeping its source.
    pub fn edit(&mut self, text: String) {
        self.session.set_mode(Mode::Edit);
        self.session.set_text(text);
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.session.set_mode(mode);
    }

    pub fn save<E: ArtifactEmitter>(&mut self, emitter: &mut E) -> Result<CmdResult> {
        commands::save::run(
            &mut self.store,
            &mut self.session,
            emitter,
            &self.cache,
            &self.save_options,
        )
    }

    // Recent list

    pub fn list_recent(&self, filter: Option<&str>) -> Result<CmdResult> {
        commands::recent::list(&self.store, &self.cache, filter)
    }

    pub fn remove_recent(&mut self, number: usize) -> Result<CmdResult> {
        let Some(id) = self.recent_id(number)? else {
            return Ok(no_such_entry(number));
        };
        commands::recent::remove(&mut self.store, &self.cache, &id)
    }

    pub fn clear_recent(&mut self) -> Result<CmdResult> {
        commands::recent::clear(&mut self.store, &self.cache)
    }

    pub fn prune_recent(&mut self) -> Result<CmdResult> {
        commands::recent::prune(&mut self.store, &self.cache)
    }

    fn recent_id(&self, number: usize) -> Result<Option<String>> {
        let entries = self.cache.list(&self.store, None)?;
        Ok(number
            .checked_sub(1)
            .and_then(|i| entries.get(i))
            .map(|e| e.id.clone()))
    }

    // Preferences

    pub fn theme(&self) -> Result<CmdResult> {
        commands::prefs::get_theme(&self.store)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<CmdResult> {
        commands::prefs::set_theme(&mut self.store, theme)
    }

    pub fn cycle_theme(&mut self) -> Result<CmdResult> {
        commands::prefs::cycle_theme(&mut self.store)
    }

    /// Remembered scroll offset of the open document.
    pub fn scroll(&self) -> Result<u64> {
        commands::prefs::scroll(&self.store, self.session.descriptor())
    }

    pub fn save_scroll(&mut self, offset: u64) -> Result<()> {
        commands::prefs::save_scroll(&mut self.store, self.session.descriptor(), offset)
    }

    // Viewing

    pub fn render(&self) -> CmdResult {
        commands::view::render(&self.session)
    }

    pub fn find(&mut self, keyword: &str) -> CmdResult {
        commands::view::find(&self.session, keyword, &mut self.find)
    }

    pub fn find_state(&self) -> &FindState {
        &self.find
    }

    pub fn find_next(&mut self) -> Option<usize> {
        self.find.next()
    }

    pub fn find_prev(&mut self) -> Option<usize> {
        self.find.prev()
    }

    pub fn copy_code_block<C: Clipboard>(&self, number: usize, clipboard: &mut C) -> CmdResult {
        commands::view::copy_code_block(&self.session, number, clipboard)
    }

    pub fn share_link<C: Clipboard>(&self, base: &str, clipboard: &mut C) -> CmdResult {
        commands::view::share_link(&self.session, base, clipboard)
    }

    /// A standalone HTML page for `rendered` with the stored theme and the
    /// remembered scroll offset of the open document.
    pub fn page(&self, rendered: &Rendered) -> Result<String> {
        let theme = commands::prefs::theme(&self.store)?;
        let scroll = self.scroll()?;
        let meta = render::meta_line(
            self.session.descriptor(),
            self.session.char_count(),
            Local::now(),
        );
        let title = self.session.display_name().unwrap_or("mdview");
        Ok(render::page(
            rendered,
            &PageOptions {
                title,
                theme,
                scroll,
                meta: &meta,
            },
        ))
    }
}

fn no_such_entry(number: usize) -> CmdResult {
    CmdResult::default().with_message(CmdMessage::error(format!(
        "No recent entry {}",
        number
    )))
}
