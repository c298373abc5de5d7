//! Audit trail for the split stage.
//!
//! The splitter reports progress through an injected [`AuditLog`] instead of
//! a process-wide logger. [`TracingAudit`] forwards events to `tracing`,
//! [`MemoryAudit`] keeps them for inspection and [`NullAudit`] drops them.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// One human-readable progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// Work on an input has started.
    InputStarted { input: PathBuf },
    /// A split was committed under its final path.
    SplitCreated { path: PathBuf, lines: u64 },
    /// The first split already exists, so the input is skipped.
    SplitExists { path: PathBuf },
    /// Work resumes after the last of `committed` existing splits.
    Resumed { input: PathBuf, committed: usize },
    /// A committed split was removed after its input failed.
    SplitWithdrawn { path: PathBuf },
    /// A committed split of a failed input could not be removed.
    WithdrawFailed { path: PathBuf, reason: String },
    /// Temporary files left by an interrupted earlier run were removed.
    StaleSinksRemoved { input: PathBuf, count: usize },
    /// The input could not be split.
    InputFailed { input: PathBuf, reason: String },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::InputStarted { input } => {
                write!(f, "processing input {}", input.display())
            }
            AuditEvent::SplitCreated { path, lines } => {
                write!(f, "created split {} ({lines} lines)", path.display())
            }
            AuditEvent::SplitExists { path } => {
                write!(f, "split {} already exists, skipping", path.display())
            }
            AuditEvent::Resumed { input, committed } => write!(
                f,
                "resuming input {} after {committed} committed splits",
                input.display()
            ),
            AuditEvent::SplitWithdrawn { path } => {
                write!(f, "withdrew split {}", path.display())
            }
            AuditEvent::WithdrawFailed { path, reason } => {
                write!(f, "could not withdraw split {}: {reason}", path.display())
            }
            AuditEvent::StaleSinksRemoved { input, count } => write!(
                f,
                "removed {count} stale temporary files of input {}",
                input.display()
            ),
            AuditEvent::InputFailed { input, reason } => {
                write!(f, "failed to split input {}: {reason}", input.display())
            }
        }
    }
}

/// Sink for audit events.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Forwards audit events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditLog for TracingAudit {
    fn record(&self, event: AuditEvent) {
        match &event {
            AuditEvent::InputStarted { input } => {
                tracing::info!(input = %input.display(), "{event}");
            }
            AuditEvent::SplitCreated { path, lines } => {
                tracing::info!(split = %path.display(), lines, "{event}");
            }
            AuditEvent::SplitExists { path } => {
                tracing::info!(split = %path.display(), "{event}");
            }
            AuditEvent::Resumed { input, committed } => {
                tracing::info!(input = %input.display(), committed, "{event}");
            }
            AuditEvent::SplitWithdrawn { path } => {
                tracing::warn!(split = %path.display(), "{event}");
            }
            AuditEvent::WithdrawFailed { path, .. } => {
                tracing::error!(split = %path.display(), "{event}");
            }
            AuditEvent::StaleSinksRemoved { input, count } => {
                tracing::warn!(input = %input.display(), count, "{event}");
            }
            AuditEvent::InputFailed { input, .. } => {
                tracing::error!(input = %input.display(), "{event}");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The events rendered as log lines.
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl AuditLog for MemoryAudit {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditLog for NullAudit {
    fn record(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_audit_keeps_order() {
        let audit = MemoryAudit::new();
        audit.record(AuditEvent::InputStarted {
            input: PathBuf::from("in.txt"),
        });
        audit.record(AuditEvent::SplitCreated {
            path: PathBuf::from("in.txt.split_1"),
            lines: 3,
        });
        assert_eq!(
            audit.lines(),
            vec!["processing input in.txt", "created split in.txt.split_1 (3 lines)"]
        );
    }

    #[test]
    fn test_skip_notice_text() {
        let event = AuditEvent::SplitExists {
            path: PathBuf::from("in.txt.split_1"),
        };
        assert_eq!(
            event.to_string(),
            "split in.txt.split_1 already exists, skipping"
        );
    }

    #[test]
    fn test_null_audit_accepts_events() {
        let audit = NullAudit;
        audit.record(AuditEvent::InputFailed {
            input: PathBuf::from("in.txt"),
            reason: "gone".to_string(),
        });
    }
}
