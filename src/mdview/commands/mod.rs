use crate::model::{RecentEntry, Theme};
use crate::render::Rendered;
use std::path::PathBuf;

pub mod open;
pub mod prefs;
pub mod recent;
pub mod save;
pub mod view;

pub use save::{FallbackReason, SaveOutcome, SaveReport};

pub const SUBTITLE_LOCAL_OPENED: &str = "Local (snapshot saved on this device)";
pub const SUBTITLE_URL_OPENED: &str = "URL (content snapshot saved)";
pub const SUBTITLE_SAMPLE: &str = "Sample";
pub const SUBTITLE_OVERWRITTEN: &str = "Local (snapshot updated)";
pub const SUBTITLE_SAVED_AS: &str = "Saved as numbered file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub recent: Vec<RecentEntry>,
    pub rendered: Option<Rendered>,
    pub save: Option<SaveReport>,
    pub theme: Option<Theme>,
    pub written_paths: Vec<PathBuf>,
    /// A share link that was produced
    pub link: Option<String>,
    /// Text the clipboard refused, to be shown for copying by hand
    pub manual_copy: Option<String>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_recent(mut self, entries: Vec<RecentEntry>) -> Self {
        self.recent = entries;
        self
    }

    pub fn with_rendered(mut self, rendered: Rendered) -> Self {
        self.rendered = Some(rendered);
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// True when any message is an error. Loads and saves that fail are
    /// reported this way rather than as `Err`, so the session stays usable.
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.level == MessageLevel::Error)
    }
}
