use crate::error::{MdvError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// What happened to an emitted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    /// Written out; carries where it landed.
    Written(PathBuf),
    /// Something already occupies that name. Nothing was written.
    NameTaken,
    /// The platform or user turned the artifact down (e.g. cancelled prompt).
    Declined(String),
}

/// Produces a standalone copy of a document under a given file name.
///
/// This never reacquires a write capability: the emitted file is not opened
/// as the current document.
pub trait ArtifactEmitter {
    fn emit(&mut self, file_name: &str, text: &str) -> Result<Emitted>;
}

/// Emits artifacts as new files in a directory, never clobbering.
#[derive(Debug, Clone)]
pub struct DirEmitter {
    dir: PathBuf,
}

impl DirEmitter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactEmitter for DirEmitter {
    fn emit(&mut self, file_name: &str, text: &str) -> Result<Emitted> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(MdvError::Io)?;
        }
        let path = self.dir.join(file_name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(Emitted::NameTaken),
            Err(e) => return Err(MdvError::Io(e)),
        };
        write_or_discard(&path, file, text)?;
        Ok(Emitted::Written(path))
    }
}

/// Write `text` to a freshly created `path`, deleting it again if the write
/// does not complete so no truncated copy holds the name.
fn write_or_discard<W: Write>(path: &Path, mut out: W, text: &str) -> Result<()> {
    let written = out.write_all(text.as_bytes()).and_then(|()| out.flush());
    drop(out);
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %cleanup, "could not remove partial file");
        }
        return Err(MdvError::Io(e));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = DirEmitter::new(dir.path());
        let out = emitter.emit("note(1).md", "# hi").unwrap();
        let path = dir.path().join("note(1).md");
        assert_eq!(out, Emitted::Written(path.clone()));
        assert_eq!(fs::read_to_string(path).unwrap(), "# hi");
    }

    #[test]
    fn refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("note(1).md"), "mine").unwrap();
        let mut emitter = DirEmitter::new(dir.path());

        assert_eq!(emitter.emit("note(1).md", "new").unwrap(), Emitted::NameTaken);
        assert_eq!(
            fs::read_to_string(dir.path().join("note(1).md")).unwrap(),
            "mine"
        );
    }

    /// Accepts a few bytes, then fails as a full disk would.
    struct FullDisk {
        inner: fs::File,
        room: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.room == 0 {
                return Err(std::io::Error::other("no space left"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            self.inner.write(&buf[..n])
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note(1).md");
        let inner = fs::File::create(&path).unwrap();

        let err = write_or_discard(&path, FullDisk { inner, room: 3 }, "# long text").unwrap_err();
        assert!(matches!(err, MdvError::Io(_)));
        assert!(!path.exists());

        let mut emitter = DirEmitter::new(dir.path());
        let out = emitter.emit("note(1).md", "# again").unwrap();
        assert_eq!(out, Emitted::Written(path));
    }
}
