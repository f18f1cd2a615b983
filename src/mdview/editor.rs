use crate::error::{MdvError, Result};
use crate::naming::split_name_and_ext;
use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Gets the editor command from environment.
/// Checks $EDITOR, then $VISUAL, then falls back to common editors.
pub fn get_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.trim().is_empty() {
                return Ok(editor);
            }
        }
    }

    for fallback in &["vim", "vi", "nano"] {
        if Command::new("which")
            .arg(fallback)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
        {
            return Ok((*fallback).to_string());
        }
    }

    Err(MdvError::CapabilityAbsent(
        "No editor found. Set $EDITOR environment variable.".to_string(),
    ))
}

/// Opens a file in the user's editor and waits for it to close.
/// Returns the contents of the file after editing.
///
/// The editor command may carry arguments (`code --wait`).
pub fn open_in_editor<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let editor = get_editor()?;
    let path = file_path.as_ref();
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");

    debug!(%editor, path = %path.display(), "launching editor");
    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| MdvError::Api(format!("Failed to launch editor '{}': {}", editor, e)))?;

    if !status.success() {
        return Err(MdvError::Api(format!(
            "Editor '{}' exited with non-zero status",
            editor
        )));
    }

    fs::read_to_string(path).map_err(MdvError::Io)
}

/// Edits `text` in a temporary file named after `file_name` so the editor
/// picks the right syntax. Returns the edited text.
pub fn edit_text(text: &str, file_name: &str) -> Result<String> {
    let (base, ext) = split_name_and_ext(file_name);
    let temp_file = env::temp_dir().join(format!(
        "mdv-{}-{}{}",
        sanitize(&base),
        uuid::Uuid::new_v4().simple(),
        ext
    ));

    fs::write(&temp_file, text).map_err(MdvError::Io)?;
    let result = open_in_editor(&temp_file);
    let _ = fs::remove_file(&temp_file);
    result
}

fn sanitize(base: &str) -> String {
    base.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(40)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_names_file_safe() {
        assert_eq!(sanitize("my notes/v2"), "my_notes_v2");
        assert_eq!(sanitize(&"a".repeat(60)).len(), 40);
    }
}
