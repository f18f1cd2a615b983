//! # Save: Overwrite or Numbered Save-As
//!
//! | Source          | Attempt                 | Success     | Failure                   |
//! |-----------------|-------------------------|-------------|---------------------------|
//! | LocalWritable   | write through handle    | overwritten | reason, then numbered copy |
//! | LocalReadOnly   | none                    | n/a         | numbered copy             |
//! | Remote          | none                    | n/a         | numbered copy             |
//! | Unsourced       | none                    | n/a         | numbered copy             |
//!
//! A numbered copy is emitted under a fresh name from [`crate::naming`]. The
//! session keeps its source afterwards: the copy is only emitted, not opened,
//! so a failed overwrite stays a failed overwrite.
//!
//! Each save yields exactly one status line (see [`SaveReport`]) and, when
//! something was written, a fresh recent-list snapshot.

use crate::commands::{
    CmdMessage, CmdResult, MessageLevel, SUBTITLE_OVERWRITTEN, SUBTITLE_SAVED_AS,
};
use crate::emit::{ArtifactEmitter, Emitted};
use crate::error::{MdvError, Result};
use crate::model::{DocumentSource, Mode, RecentKind};
use crate::naming::{self, CounterPolicy};
use crate::recent::RecentCache;
use crate::session::Session;
use crate::store::KeyValueStore;
use std::path::PathBuf;
use tracing::{debug, warn};

const MAX_NAME_ATTEMPTS: usize = 64;

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub policy: CounterPolicy,
    pub default_file_name: String,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            policy: CounterPolicy::Optimistic,
            default_file_name: naming::DEFAULT_FILE_NAME.to_string(),
        }
    }
}

/// Why the save went down the numbered path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Known in advance: the source has no write-back capability.
    CapabilityAbsent(String),
    /// A capability existed but the write failed.
    WriteDenied(String),
}

impl FallbackReason {
    pub fn explanation(&self) -> String {
        match self {
            FallbackReason::CapabilityAbsent(why) => format!("Cannot overwrite: {}", why),
            FallbackReason::WriteDenied(why) => format!("Overwrite failed: {}", why),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Overwritten {
        file_name: String,
    },
    SavedAs {
        file_name: String,
        path: PathBuf,
        reason: FallbackReason,
    },
    /// The numbered copy could not be produced. The document is untouched.
    NotSaved {
        reason: FallbackReason,
        error: String,
    },
}

/// Outcome plus the single status line shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub outcome: SaveOutcome,
    pub level: MessageLevel,
    pub status: String,
}

impl SaveReport {
    fn new(outcome: SaveOutcome) -> Self {
        let (level, status) = match &outcome {
            SaveOutcome::Overwritten { file_name } => {
                (MessageLevel::Success, format!("Overwritten: {}", file_name))
            }
            SaveOutcome::SavedAs {
                file_name, reason, ..
            } => {
                let level = match reason {
                    FallbackReason::CapabilityAbsent(_) => MessageLevel::Info,
                    FallbackReason::WriteDenied(_) => MessageLevel::Error,
                };
                (
                    level,
                    format!("{}. Saved as {}", reason.explanation(), file_name),
                )
            }
            SaveOutcome::NotSaved { reason, error } => (
                MessageLevel::Error,
                format!("{}. Numbered copy not saved: {}", reason.explanation(), error),
            ),
        };
        Self {
            outcome,
            level,
            status,
        }
    }

    pub fn message(&self) -> CmdMessage {
        CmdMessage {
            level: self.level,
            content: self.status.clone(),
        }
    }
}

pub fn run<S: KeyValueStore, E: ArtifactEmitter>(
    store: &mut S,
    session: &mut Session,
    emitter: &mut E,
    cache: &RecentCache,
    opts: &SaveOptions,
) -> Result<CmdResult> {
    let text = session.text().to_string();

    let reason = match session.source_mut() {
        DocumentSource::LocalWritable { handle } => {
            let file_name = handle.file_name().to_string();
            match handle.write(&text) {
                Ok(()) => {
                    debug!(%file_name, "overwrote in place");
                    session.set_descriptor(format!("local: {}", file_name));
                    session.set_mode(Mode::Preview);
                    let outcome = SaveOutcome::Overwritten {
                        file_name: file_name.clone(),
                    };
                    return Ok(finish(store, cache, outcome, &file_name, SUBTITLE_OVERWRITTEN, &text));
                }
                Err(MdvError::WriteDenied(why)) => FallbackReason::WriteDenied(why),
                Err(e) => FallbackReason::WriteDenied(e.to_string()),
            }
        }
        DocumentSource::LocalReadOnly { .. } => FallbackReason::CapabilityAbsent(
            "this file was opened without write access".to_string(),
        ),
        DocumentSource::Remote { .. } => FallbackReason::CapabilityAbsent(
            "documents loaded from a URL cannot be written back".to_string(),
        ),
        DocumentSource::Unsourced => {
            FallbackReason::CapabilityAbsent("this document has no file behind it".to_string())
        }
    };

    let base_name = suggested_name(session, &opts.default_file_name);
    match save_numbered(store, emitter, &base_name, &text, opts.policy) {
        Ok((file_name, path)) => {
            session.set_descriptor(format!("saved-as: {}", file_name));
            session.set_mode(Mode::Preview);
            let outcome = SaveOutcome::SavedAs {
                file_name: file_name.clone(),
                path,
                reason,
            };
            Ok(finish(store, cache, outcome, &file_name, SUBTITLE_SAVED_AS, &text))
        }
        Err(error) => {
            warn!(%error, "numbered save-as failed");
            let report = SaveReport::new(SaveOutcome::NotSaved { reason, error });
            let mut result = CmdResult::default().with_message(report.message());
            result.save = Some(report);
            Ok(result)
        }
    }
}

/// Emit `text` under the next free numbered name. Errors come back as the
/// user-facing reason string.
fn save_numbered<S: KeyValueStore, E: ArtifactEmitter>(
    store: &mut S,
    emitter: &mut E,
    base_name: &str,
    text: &str,
    policy: CounterPolicy,
) -> std::result::Result<(String, PathBuf), String> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = match policy {
            CounterPolicy::Optimistic => naming::reserve_and_commit(store, base_name),
            CounterPolicy::OnConfirm => store.transaction(|store| naming::reserve(store, base_name)),
        }
        .map_err(|e| e.to_string())?;

        match emitter.emit(&name.file_name, text) {
            Ok(Emitted::Written(path)) => {
                if policy == CounterPolicy::OnConfirm {
                    if let Err(e) = naming::commit(store, &name) {
                        warn!(error = %e, file = %name.file_name, "saved but counter not persisted");
                    }
                }
                return Ok((name.file_name, path));
            }
            Ok(Emitted::NameTaken) => {
                debug!(file = %name.file_name, "name taken, trying next number");
                naming::commit(store, &name).map_err(|e| e.to_string())?;
            }
            Ok(Emitted::Declined(why)) => return Err(why),
            Err(e) => return Err(e.to_string()),
        }
    }
    Err(format!(
        "no free name found for {} after {} attempts",
        base_name, MAX_NAME_ATTEMPTS
    ))
}

fn finish<S: KeyValueStore>(
    store: &mut S,
    cache: &RecentCache,
    outcome: SaveOutcome,
    title: &str,
    subtitle: &str,
    text: &str,
) -> CmdResult {
    let report = SaveReport::new(outcome);
    let mut result = CmdResult::default().with_message(report.message());
    if let Err(e) = cache.insert(store, RecentKind::Local, title, subtitle, text) {
        result.add_message(CmdMessage::warning(format!(
            "Saved, but the recent list was not updated: {}",
            e
        )));
    }
    result.save = Some(report);
    result
}

/// Best available name to number: the document's own file name, then the
/// last path segment of its URL, then the configured placeholder.
fn suggested_name(session: &Session, default_name: &str) -> String {
    if let Some(name) = session.display_name() {
        return name.to_string();
    }
    session
        .source()
        .url()
        .and_then(|url| reqwest::Url::parse(url).ok())
        .and_then(|url| {
            url.path_segments()?
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| default_name.to_string())
}
