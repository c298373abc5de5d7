//! The split stage.
//!
//! For each input arriving on the input conduit, the [`Splitter`] checks
//! whether earlier work can be reused, starts a line producer, and
//! partitions the lines into splits of `lines_per_split` lines. Each split is
//! committed atomically and published on the output conduit as soon as the
//! next line proves it full, or when the input ends. Inputs are handled one
//! at a time in arrival order; the output conduit is closed once the input
//! conduit is exhausted.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::artifact::{InputArtifact, SplitArtifact};
use crate::audit::{AuditEvent, AuditLog, TracingAudit};
use crate::config::{ResumePolicy, SplitConfig};
use crate::error::SplitError;
use crate::producer::{FileLineReader, LineProducer, LineStream};
use crate::writer::SplitWriter;

/// Requests that a running splitter stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the in-flight input before its next line and ends the stage.
    ///
    /// The current pending split is discarded; nothing partial is committed.
    /// The flag is only checked when a line or an input arrives: a stage
    /// waiting on an idle input conduit keeps waiting until the next input
    /// is sent or the conduit is closed.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    NotStarted,
    /// Existing splits covered the input; nothing was written.
    Skipped,
    /// Lines are being partitioned into splits.
    Streaming,
    /// The last split is being committed.
    Finalizing,
    Done,
    Failed,
}

/// What happened to one input.
#[derive(Debug)]
pub struct InputOutcome {
    pub input: PathBuf,
    pub state: InputState,
    /// Splits committed and published during this run.
    pub splits: Vec<SplitArtifact>,
    /// Lines written into new splits.
    pub lines: u64,
    /// Committed splits found and reused from an earlier run.
    pub resumed_after: usize,
    pub error: Option<SplitError>,
    /// Set when a committed split of this failed input could not be
    /// removed. Splits from that one on are still on disk.
    pub withdraw_error: Option<SplitError>,
}

impl InputOutcome {
    fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            state: InputState::NotStarted,
            splits: Vec::new(),
            lines: 0,
            resumed_after: 0,
            error: None,
            withdraw_error: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == InputState::Failed
    }
}

/// Outcomes of a stage run, in input order.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub outcomes: Vec<InputOutcome>,
}

impl SplitReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(InputOutcome::is_failed)
    }

    /// Total splits committed during the run.
    pub fn splits_created(&self) -> usize {
        self.outcomes.iter().map(|o| o.splits.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InputOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

/// Partitions input files into fixed-size line splits.
pub struct Splitter {
    config: SplitConfig,
    producer: Arc<dyn LineProducer>,
    audit: Arc<dyn AuditLog>,
    stop: StopHandle,
}

impl Splitter {
    /// A splitter reading files with [`FileLineReader`] and auditing through
    /// `tracing`.
    pub fn new(config: SplitConfig) -> Self {
        Self {
            config,
            producer: Arc::new(FileLineReader),
            audit: Arc::new(TracingAudit),
            stop: StopHandle::new(),
        }
    }

    pub fn with_producer(mut self, producer: Arc<dyn LineProducer>) -> Self {
        self.producer = producer;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// A handle that stops this splitter.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Splits every input from `inputs` until it is closed, then closes
    /// `outputs`.
    ///
    /// A failing input is recorded in the report and the next input is
    /// processed. The run ends early if downstream hangs up or a stop is
    /// requested.
    pub fn run(
        &self,
        inputs: Receiver<InputArtifact>,
        outputs: SyncSender<SplitArtifact>,
    ) -> SplitReport {
        let mut report = SplitReport::default();

        for input in inputs.iter() {
            if self.stop.is_stopped() {
                tracing::debug!(
                    input = %input.path().display(),
                    "Stop requested, not starting input"
                );
                break;
            }

            let outcome = self.split_input(&input, &outputs);
            let fatal = outcome
                .error
                .as_ref()
                .is_some_and(SplitError::is_stage_fatal);
            report.outcomes.push(outcome);
            if fatal {
                break;
            }
        }

        drop(outputs);
        report
    }

    /// Runs the stage on its own thread.
    pub fn spawn(
        self,
        inputs: Receiver<InputArtifact>,
        outputs: SyncSender<SplitArtifact>,
    ) -> io::Result<JoinHandle<SplitReport>> {
        thread::Builder::new()
            .name("splitter".to_string())
            .spawn(move || self.run(inputs, outputs))
    }

    /// Splits one input, publishing its splits on `outputs`.
    pub fn split_input(
        &self,
        input: &InputArtifact,
        outputs: &SyncSender<SplitArtifact>,
    ) -> InputOutcome {
        self.audit.record(AuditEvent::InputStarted {
            input: input.path().to_path_buf(),
        });

        let mut outcome = InputOutcome::new(input.path());
        match self.process(input, outputs, &mut outcome) {
            Ok(state) => outcome.state = state,
            Err(e) => {
                if self.config.resume_policy() == ResumePolicy::FirstSplit {
                    outcome.withdraw_error = self.withdraw(&outcome.splits).err();
                }
                self.audit.record(AuditEvent::InputFailed {
                    input: input.path().to_path_buf(),
                    reason: e.to_string(),
                });
                outcome.state = InputState::Failed;
                outcome.error = Some(e);
            }
        }
        outcome
    }

    fn process(
        &self,
        input: &InputArtifact,
        outputs: &SyncSender<SplitArtifact>,
        outcome: &mut InputOutcome,
    ) -> Result<InputState, SplitError> {
        match input.sweep_stale_sinks() {
            Ok(0) => {}
            Ok(count) => self.audit.record(AuditEvent::StaleSinksRemoved {
                input: input.path().to_path_buf(),
                count,
            }),
            Err(e) => tracing::warn!(
                input = %input.path().display(),
                error = %e,
                "Failed to remove stale temporary files"
            ),
        }

        let resume_after = match self.config.resume_policy() {
            ResumePolicy::FirstSplit => {
                let first = input.split(1);
                if first.exists() {
                    self.audit.record(AuditEvent::SplitExists {
                        path: first.path().to_path_buf(),
                    });
                    return Ok(InputState::Skipped);
                }
                0
            }
            ResumePolicy::Contiguous => {
                let committed = committed_prefix(input);
                if committed > 0 {
                    self.audit.record(AuditEvent::Resumed {
                        input: input.path().to_path_buf(),
                        committed,
                    });
                }
                committed
            }
        };
        outcome.resumed_after = resume_after;

        let stream = self.producer.start(input.path())?;
        outcome.state = InputState::Streaming;
        tracing::debug!(input = %input.path().display(), resume_after, "Streaming");

        let streamed = self.stream_lines(input, &stream, outputs, resume_after, outcome);
        let produced = stream.finish();
        let (pending, received) = streamed?;
        let produced = produced?;
        if produced != received {
            return Err(SplitError::producer(
                input.path(),
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("producer reported {produced} lines but {received} arrived"),
                ),
            ));
        }

        outcome.state = InputState::Finalizing;
        tracing::debug!(input = %input.path().display(), lines = received, "Finalizing");

        if let Some(writer) = pending {
            let split = writer.finish(self.audit.as_ref())?;
            self.publish(split, outputs, outcome)?;
        }

        if resume_after > 0 && outcome.splits.is_empty() {
            return Ok(InputState::Skipped);
        }
        Ok(InputState::Done)
    }

    /// Partitions the producer's lines, committing every full split.
    ///
    /// Returns the writer of the last, still pending split and the number of
    /// lines received. The last split is only committed once the producer
    /// has reported success.
    fn stream_lines(
        &self,
        input: &InputArtifact,
        stream: &LineStream,
        outputs: &SyncSender<SplitArtifact>,
        resume_after: usize,
        outcome: &mut InputOutcome,
    ) -> Result<(Option<SplitWriter>, u64), SplitError> {
        let per_split = self.config.lines_per_split();
        // Saturating: no input reaches u64::MAX lines
        let skip_lines = (resume_after as u64).saturating_mul(per_split);

        let mut line_counter: u64 = 0;
        let mut split_index = resume_after + 1;
        let mut pending: Option<SplitWriter> = None;

        for record in stream.iter() {
            if self.stop.is_stopped() {
                return Err(SplitError::Cancelled {
                    path: input.path().to_path_buf(),
                });
            }

            line_counter += 1;
            if line_counter <= skip_lines {
                continue;
            }

            // The line past a full split goes to the next one
            if line_counter > (split_index as u64).saturating_mul(per_split) {
                if let Some(writer) = pending.take() {
                    let split = writer.finish(self.audit.as_ref())?;
                    self.publish(split, outputs, outcome)?;
                }
                split_index += 1;
            }

            let writer = match pending.take() {
                Some(writer) => writer,
                None => SplitWriter::open(input.split(split_index), split_index)?,
            };
            let writer = pending.insert(writer);
            writer.accept(&record)?;
            outcome.lines += 1;
        }

        Ok((pending, line_counter))
    }

    fn publish(
        &self,
        split: SplitArtifact,
        outputs: &SyncSender<SplitArtifact>,
        outcome: &mut InputOutcome,
    ) -> Result<(), SplitError> {
        outcome.splits.push(split.clone());
        outputs.send(split).map_err(|_| SplitError::OutputClosed)
    }

    /// Removes the splits a failed input committed, split 1 first, so a
    /// rerun does not mistake the input for finished.
    ///
    /// Stops at the first split that cannot be removed: the splits after it
    /// stay on disk alongside it.
    fn withdraw(&self, splits: &[SplitArtifact]) -> Result<(), SplitError> {
        for split in splits {
            if let Err(e) = split.withdraw() {
                self.audit.record(AuditEvent::WithdrawFailed {
                    path: split.path().to_path_buf(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
            self.audit.record(AuditEvent::SplitWithdrawn {
                path: split.path().to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Number of splits `1..=h` already committed for `input`.
fn committed_prefix(input: &InputArtifact) -> usize {
    (1..).take_while(|&i| input.split(i).exists()).count()
}
