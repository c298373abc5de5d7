//! Error types for the split stage.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring or running the split stage.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Invalid stage configuration, detected at construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure opening or writing a pending split sink.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure publishing a pending sink under its final path.
    #[error("failed to commit {}: {source}", path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The line producer could not read the input.
    #[error("line producer failed for {}: {source}", path.display())]
    Producer {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Downstream dropped the output conduit.
    #[error("output conduit closed by downstream")]
    OutputClosed,

    /// The stage was asked to stop while this input was in flight.
    #[error("splitting of {} was cancelled", path.display())]
    Cancelled { path: PathBuf },
}

impl SplitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SplitError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn producer(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SplitError::Producer {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ends the whole stage rather than one input.
    pub fn is_stage_fatal(&self) -> bool {
        matches!(self, SplitError::OutputClosed | SplitError::Cancelled { .. })
    }
}
