use crate::error::{MdvError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A capability to write text back to the place a document came from.
///
/// Holding one does not guarantee the write will work: the file may have
/// been moved or its permissions revoked since it was opened.
pub trait WriteHandle: fmt::Debug {
    /// Name shown to the user, e.g. `notes.md`.
    fn file_name(&self) -> &str;

    /// Replace the full contents of the target with `text`.
    fn write(&mut self, text: &str) -> Result<()>;
}

/// Write-back handle for a file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileHandle {
    path: PathBuf,
    file_name: String,
}

impl FileHandle {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WriteHandle for FileHandle {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let denied = |e: std::io::Error| MdvError::WriteDenied(e.to_string());

        // Follow symlinks so the file the user opened is the one rewritten
        let target = fs::canonicalize(&self.path).map_err(denied)?;
        let meta = fs::metadata(&target).map_err(denied)?;
        if meta.permissions().readonly() {
            return Err(MdvError::WriteDenied(format!(
                "{} is read-only",
                self.path.display()
            )));
        }

        // Rewrite in place so the inode and its mode survive
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&target)
            .map_err(denied)?;
        file.write_all(text.as_bytes()).map_err(MdvError::Io)?;
        file.sync_all().map_err(MdvError::Io)?;
        Ok(())
    }
}

/// Where the bytes of the current document came from.
#[derive(Debug)]
pub enum DocumentSource {
    /// Opened with a write-back capability.
    LocalWritable { handle: Box<dyn WriteHandle> },
    /// Read from a local file, no way to write it back.
    LocalReadOnly { file_name: String },
    /// Fetched from the network; never writable in place.
    Remote { url: String },
    /// Built-in sample or pasted text.
    Unsourced,
}

impl DocumentSource {
    pub fn writable<H: WriteHandle + 'static>(handle: H) -> Self {
        DocumentSource::LocalWritable {
            handle: Box::new(handle),
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, DocumentSource::LocalWritable { .. })
    }

    /// The file name this source would be saved under, if it has one.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            DocumentSource::LocalWritable { handle } => Some(handle.file_name()),
            DocumentSource::LocalReadOnly { file_name } => Some(file_name),
            DocumentSource::Remote { .. } | DocumentSource::Unsourced => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            DocumentSource::Remote { url } => Some(url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecentKind {
    Local,
    Url,
    Sample,
}

impl RecentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecentKind::Local => "local",
            RecentKind::Url => "url",
            RecentKind::Sample => "sample",
        }
    }
}

impl fmt::Display for RecentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the recent list. The snapshot it points at is a copy taken at
/// insertion time, not a live link to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub id: String,
    pub kind: RecentKind,
    pub title: String,
    pub subtitle: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot_key: String,
}

impl RecentEntry {
    pub fn same_document(&self, kind: RecentKind, title: &str) -> bool {
        self.kind == kind && self.title == title
    }

    pub fn matches(&self, filter_lower: &str) -> bool {
        self.title.to_lowercase().contains(filter_lower)
            || self.subtitle.to_lowercase().contains(filter_lower)
            || self.kind.as_str().contains(filter_lower)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Eye,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Dark, Theme::Light, Theme::Eye];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Eye => "eye",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn next(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Eye,
            Theme::Eye => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Preview,
    Edit,
}
