use crate::model::{DocumentSource, Mode};

/// Descriptor of a session nothing has been loaded into.
pub const NO_SOURCE: &str = "none";

/// A fully read document, ready to replace whatever is open.
///
/// Loads build one of these first (reading the file, fetching the URL) and
/// only then hand it to [`Session::replace`], so a failed load never touches
/// the open document and a successful one swaps text and source together.
#[derive(Debug)]
pub struct LoadedDocument {
    pub text: String,
    pub source: DocumentSource,
    /// Best name for saving, e.g. `notes.md` or `sample.md`.
    pub display_name: Option<String>,
    /// Stable description used as the scroll-memory key, e.g. `local: notes.md`.
    pub descriptor: String,
}

/// The one open document.
///
/// Mutation goes through `&mut Session`, which is the single-writer rule:
/// no second load or save can interleave with one in progress.
#[derive(Debug)]
pub struct Session {
    text: String,
    source: DocumentSource,
    display_name: Option<String>,
    descriptor: String,
    mode: Mode,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            text: String::new(),
            source: DocumentSource::Unsourced,
            display_name: None,
            descriptor: NO_SOURCE.to_string(),
            mode: Mode::Preview,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new document wholesale and return to preview mode.
    pub fn replace(&mut self, doc: LoadedDocument) {
        self.text = doc.text;
        self.source = doc.source;
        self.display_name = doc.display_name;
        self.descriptor = doc.descriptor;
        self.mode = Mode::Preview;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut DocumentSource {
        &mut self.source
    }

    /// The name to base a save on: the source's own file name first, then
    /// whatever name the load supplied.
    pub fn display_name(&self) -> Option<&str> {
        self.source
            .file_name()
            .or(self.display_name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn set_descriptor(&mut self, descriptor: impl Into<String>) {
        self.descriptor = descriptor.into();
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Size of the current text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}
