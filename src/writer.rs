//! Writer for one in-flight split.

use std::io::Write;

use crate::artifact::{Artifact, PendingSink, SplitArtifact};
use crate::audit::{AuditEvent, AuditLog};
use crate::error::SplitError;
use crate::record::LineRecord;

/// Accumulates a run of lines into a pending sink and commits them as one
/// split.
///
/// `finish` consumes the writer, so a finished split cannot take more lines.
pub struct SplitWriter {
    artifact: Artifact,
    index: usize,
    sink: PendingSink,
    lines: u64,
}

impl SplitWriter {
    /// Opens a pending sink for split `index`.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::Io` if the temporary sink cannot be created.
    pub fn open(artifact: Artifact, index: usize) -> Result<Self, SplitError> {
        let sink = artifact.open_pending_sink()?;
        Ok(Self {
            artifact,
            index,
            sink,
            lines: 0,
        })
    }

    /// Appends one line and its terminator.
    pub fn accept(&mut self, record: &LineRecord) -> Result<(), SplitError> {
        self.sink
            .write_all(record.as_bytes())
            .and_then(|()| self.sink.write_all(b"\n"))
            .map_err(|e| SplitError::io(self.artifact.path(), e))?;
        self.lines += 1;
        Ok(())
    }

    /// Lines accepted so far.
    pub fn line_count(&self) -> u64 {
        self.lines
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Closes the sink, commits it under the final path and records the
    /// committed split.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::Commit` if publishing fails; nothing is then
    /// visible under the final path.
    pub fn finish(self, audit: &dyn AuditLog) -> Result<SplitArtifact, SplitError> {
        self.artifact.commit(self.sink)?;
        audit.record(AuditEvent::SplitCreated {
            path: self.artifact.path().to_path_buf(),
            lines: self.lines,
        });
        Ok(SplitArtifact::committed(self.artifact, self.index, self.lines))
    }
}
