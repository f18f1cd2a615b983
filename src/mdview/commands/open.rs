//! Load actions. Each one reads everything it needs first and only then
//! replaces the session, so a failed load leaves the open document as it was.
//! Successful loads are recorded in the recent list.

use crate::commands::{
    CmdMessage, CmdResult, SUBTITLE_LOCAL_OPENED, SUBTITLE_SAMPLE, SUBTITLE_URL_OPENED,
};
use crate::error::{MdvError, Result};
use crate::fetch::Fetcher;
use crate::model::{DocumentSource, FileHandle, RecentKind};
use crate::recent::RecentCache;
use crate::session::{LoadedDocument, Session};
use crate::store::KeyValueStore;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const SAMPLE_NAME: &str = "sample.md";

pub const SAMPLE: &str = r#"# mdview sample

- Code blocks **never wrap**; wide lines scroll sideways
- Every code block can be copied in one step
- Recent documents keep a snapshot on this device, searchable
- Find in document highlights every hit outside code

## Code

```bash
sudo systemctl restart networking && echo "done"
```

```js
function hello(name) {
  return "Hello " + name;
}
console.log(hello("World"));
```

> Themes: dark, light and eye (warm paper tones)
"#;

/// How a local file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAccess {
    /// Keep a handle so saves can overwrite the file.
    Writable,
    /// Read the text only; saves produce numbered copies.
    ReadOnly,
}

pub fn open_file<S: KeyValueStore>(
    store: &mut S,
    session: &mut Session,
    cache: &RecentCache,
    path: &Path,
    access: LocalAccess,
) -> Result<CmdResult> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            return Ok(CmdResult::default().with_message(CmdMessage::error(format!(
                "Read failed: {}: {}",
                path.display(),
                e
            ))))
        }
    };

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(crate::naming::DEFAULT_FILE_NAME)
        .to_string();
    let source = match access {
        LocalAccess::Writable => DocumentSource::writable(FileHandle::new(path)),
        LocalAccess::ReadOnly => DocumentSource::LocalReadOnly {
            file_name: file_name.clone(),
        },
    };

    session.replace(LoadedDocument {
        text,
        source,
        display_name: Some(file_name.clone()),
        descriptor: format!("local: {}", file_name),
    });
    debug!(%file_name, ?access, "opened local file");

    let status = match access {
        LocalAccess::Writable => format!("Opened {} (saving overwrites it)", file_name),
        LocalAccess::ReadOnly => {
            format!("Opened {} read-only (saving makes a numbered copy)", file_name)
        }
    };
    Ok(record(
        store,
        cache,
        session,
        RecentKind::Local,
        &file_name,
        SUBTITLE_LOCAL_OPENED,
        status,
    ))
}

pub fn open_url<S: KeyValueStore, F: Fetcher>(
    store: &mut S,
    session: &mut Session,
    cache: &RecentCache,
    fetcher: &F,
    url: &str,
) -> Result<CmdResult> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(CmdResult::default().with_message(CmdMessage::error("Paste a markdown URL first")));
    }

    let text = match fetcher.fetch(url) {
        Ok(text) => text,
        Err(MdvError::FetchFailed(why)) => {
            return Ok(CmdResult::default()
                .with_message(CmdMessage::error(format!("Load failed: {}", why))))
        }
        Err(e) => return Err(e),
    };

    session.replace(LoadedDocument {
        text,
        source: DocumentSource::Remote {
            url: url.to_string(),
        },
        display_name: None,
        descriptor: format!("url: {}", url),
    });

    Ok(record(
        store,
        cache,
        session,
        RecentKind::Url,
        url,
        SUBTITLE_URL_OPENED,
        "URL loaded (saving makes a numbered copy)".to_string(),
    ))
}

pub fn open_sample<S: KeyValueStore>(
    store: &mut S,
    session: &mut Session,
    cache: &RecentCache,
) -> Result<CmdResult> {
    session.replace(LoadedDocument {
        text: SAMPLE.to_string(),
        source: DocumentSource::Unsourced,
        display_name: Some(SAMPLE_NAME.to_string()),
        descriptor: "sample".to_string(),
    });
    Ok(record(
        store,
        cache,
        session,
        RecentKind::Sample,
        SAMPLE_NAME,
        SUBTITLE_SAMPLE,
        "Sample loaded".to_string(),
    ))
}

/// Pasted or piped text. It has no title to file it under, so it only
/// reaches the recent list once it is saved.
pub fn open_text(session: &mut Session, text: String, name: Option<String>) -> CmdResult {
    session.replace(LoadedDocument {
        text,
        source: DocumentSource::Unsourced,
        display_name: name,
        descriptor: "pasted".to_string(),
    });
    CmdResult::default().with_message(CmdMessage::success("Text loaded"))
}

/// Reopen a recent snapshot. The original write capability cannot be
/// restored, so the document comes back read-only.
///
/// A snapshot that has gone missing is reported as unavailable and its
/// dangling entry is dropped.
pub fn open_recent<S: KeyValueStore>(
    store: &mut S,
    session: &mut Session,
    cache: &RecentCache,
    id: &str,
) -> Result<CmdResult> {
    let (entry, text) = match cache.open(store, id) {
        Ok(found) => found,
        Err(MdvError::NotFound(what)) => {
            let mut result = CmdResult::default()
                .with_message(CmdMessage::error(format!("Content unavailable: {}", what)));
            if let Ok(Some(pruned)) = cache.remove(store, id) {
                result.add_message(CmdMessage::info(format!(
                    "Removed '{}' from the recent list",
                    pruned.title
                )));
            }
            return Ok(result);
        }
        Err(e) => return Err(e),
    };

    let source = match entry.kind {
        RecentKind::Url => DocumentSource::Remote {
            url: entry.title.clone(),
        },
        RecentKind::Local | RecentKind::Sample => DocumentSource::LocalReadOnly {
            file_name: entry.title.clone(),
        },
    };
    session.replace(LoadedDocument {
        text,
        source,
        display_name: None,
        descriptor: format!("recent: {}", entry.title),
    });

    Ok(CmdResult::default()
        .with_message(CmdMessage::success(format!(
            "Opened {} from the recent list (snapshot)",
            entry.title
        )))
        .with_recent(vec![entry]))
}

fn record<S: KeyValueStore>(
    store: &mut S,
    cache: &RecentCache,
    session: &Session,
    kind: RecentKind,
    title: &str,
    subtitle: &str,
    status: String,
) -> CmdResult {
    let mut result = CmdResult::default().with_message(CmdMessage::success(status));
    match cache.insert(store, kind, title, subtitle, session.text()) {
        Ok(entry) => result.recent.push(entry),
        Err(e) => result.add_message(CmdMessage::warning(format!(
            "Not added to the recent list: {}",
            e
        ))),
    }
    result
}
