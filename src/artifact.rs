//! File artifacts with an atomic-commit lifecycle.
//!
//! An [`Artifact`] names a file by its final path. Content is written to a
//! [`PendingSink`], a temporary file in the same directory, and only becomes
//! visible under the final path when [`Artifact::commit`] persists it in a
//! single rename. A sink dropped before commit deletes its temporary file,
//! so a failure at any point never leaves a partial file under a final name.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::SplitError;

/// A file on durable storage, identified by its final path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The final path of this artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff a file is present at the final path.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Opens a temporary sink next to the final path.
    ///
    /// The temporary file lives in the same directory as the artifact so the
    /// later commit is a same-filesystem rename.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::Io` if the path has no parent directory or file
    /// name, or if the temporary file cannot be created.
    pub fn open_pending_sink(&self) -> Result<PendingSink, SplitError> {
        let parent = match self.path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => {
                return Err(SplitError::io(
                    &self.path,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "artifact path has no parent directory",
                    ),
                ));
            }
        };
        let file_name = self.path.file_name().ok_or_else(|| {
            SplitError::io(
                &self.path,
                io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"),
            )
        })?;

        let prefix = format!(".{}.", file_name.to_string_lossy());
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| SplitError::io(&self.path, e))?;

        Ok(PendingSink {
            writer: BufWriter::new(temp),
            target: self.path.clone(),
        })
    }

    /// Atomically publishes a fully written sink under the final path.
    ///
    /// Flushes and syncs the sink, then persists it without clobbering: a
    /// committed artifact is never rewritten, so an existing file at the
    /// final path is an error and is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::Commit` if the sink belongs to another artifact,
    /// or if flushing, syncing or persisting fails. On error the temporary
    /// file is removed.
    pub fn commit(&self, sink: PendingSink) -> Result<(), SplitError> {
        let commit_err = |source: io::Error| SplitError::Commit {
            path: self.path.clone(),
            source,
        };

        if sink.target != self.path {
            return Err(commit_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sink was opened for {}", sink.target.display()),
            )));
        }

        let temp = sink
            .writer
            .into_inner()
            .map_err(|e| commit_err(e.into_error()))?;
        temp.as_file().sync_all().map_err(commit_err)?;
        temp.persist_noclobber(&self.path)
            .map_err(|e| commit_err(e.error))?;

        Ok(())
    }
}

/// A writable temporary file bound to one artifact.
///
/// Dropping the sink without committing it deletes the temporary file.
pub struct PendingSink {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl PendingSink {
    /// Where the pending content currently lives.
    pub fn temp_path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// The final path this sink will be committed to.
    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Write for PendingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Read-only reference to an input file handed over by an upstream stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputArtifact {
    path: PathBuf,
}

impl InputArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The artifact for split `index` of this input.
    pub fn split(&self, index: usize) -> Artifact {
        Artifact::new(split_path(&self.path, index))
    }

    /// Removes pending split sinks of this input left behind by a run that
    /// died before it could drop them.
    ///
    /// Only one writer works on an input's splits at a time, so any such
    /// file found before the input starts belongs to no live writer.
    /// Returns the number of files removed.
    pub fn sweep_stale_sinks(&self) -> Result<usize, SplitError> {
        let Some(file_name) = self.path.file_name() else {
            return Ok(0);
        };
        let dir = match self.path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Ok(0),
        };
        let prefix = format!(".{}.split_", file_name.to_string_lossy());

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SplitError::io(dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| SplitError::io(dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(&prefix) && name.ends_with(".tmp")) {
                continue;
            }
            if !entry.file_type().map_err(|e| SplitError::io(entry.path(), e))?.is_file() {
                continue;
            }
            fs::remove_file(entry.path()).map_err(|e| SplitError::io(entry.path(), e))?;
            removed += 1;
        }
        Ok(removed)
    }
}

impl From<PathBuf> for InputArtifact {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for InputArtifact {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A committed split, ready for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArtifact {
    path: PathBuf,
    index: usize,
    lines: u64,
}

impl SplitArtifact {
    pub(crate) fn committed(artifact: Artifact, index: usize, lines: u64) -> Self {
        Self {
            path: artifact.path,
            index,
            lines,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based position of this split within its input.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of lines written to this split.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Removes a committed split from storage.
    pub(crate) fn withdraw(&self) -> Result<(), SplitError> {
        fs::remove_file(&self.path).map_err(|e| SplitError::io(&self.path, e))
    }
}

/// Path of split `index` for the input at `base`: `<base>.split_<index>`.
pub fn split_path(base: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".split_{index}"));
    PathBuf::from(name)
}
