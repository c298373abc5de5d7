//! # pipelines-split
//!
//! A checkpointable file-splitting stage for file-based pipelines.
//!
//! The stage takes input file references from an upstream conduit, reads
//! each file line by line through a producer running on its own thread, and
//! repackages the lines into splits of a fixed number of lines. Split `i` of
//! input `P` is written to `P.split_i`.
//!
//! ## Overview
//!
//! - **Atomic commit**: each split is written to a temporary file next to its
//!   final path and renamed into place, so a half-written split is never
//!   visible under its final name.
//! - **Streaming**: a split is published downstream as soon as it is
//!   committed, while the rest of the input is still being read.
//! - **Idempotent resume**: an input whose first split already exists is
//!   skipped, so rerunning after a crash does not redo finished inputs.
//!
//! ## Example
//!
//! ```
//! use std::fs;
//! use std::sync::Arc;
//! use pipelines_split::{InputArtifact, NullAudit, SplitConfig, Splitter, conduit};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let input = dir.path().join("reads.txt");
//! fs::write(&input, "a\nb\nc\nd\ne\n").unwrap();
//!
//! let splitter = Splitter::new(SplitConfig::new(3).unwrap()).with_audit(Arc::new(NullAudit));
//!
//! let (in_tx, in_rx) = conduit::bounded(1);
//! in_tx.send(InputArtifact::new(&input)).unwrap();
//! drop(in_tx);
//!
//! let (out_tx, out_rx) = conduit::rendezvous();
//! let stage = splitter.spawn(in_rx, out_tx).unwrap();
//! let splits: Vec<_> = out_rx.iter().collect();
//! stage.join().unwrap();
//!
//! assert_eq!(splits.len(), 2);
//! assert_eq!(fs::read_to_string(splits[0].path()).unwrap(), "a\nb\nc\n");
//! assert_eq!(fs::read_to_string(splits[1].path()).unwrap(), "d\ne\n");
//! ```

pub mod artifact;
pub mod audit;
pub mod conduit;
pub mod config;
pub mod error;
pub mod producer;
pub mod record;
pub mod splitter;
pub mod writer;

pub use artifact::{Artifact, InputArtifact, PendingSink, SplitArtifact, split_path};
pub use audit::{AuditEvent, AuditLog, MemoryAudit, NullAudit, TracingAudit};
pub use config::{ResumePolicy, SplitConfig};
pub use error::SplitError;
pub use producer::{FileLineReader, LineProducer, LineSender, LineStream};
pub use record::LineRecord;
pub use splitter::{InputOutcome, InputState, SplitReport, Splitter, StopHandle};
pub use writer::SplitWriter;
