//! Split stage configuration.

use clap::ValueEnum;

use crate::error::SplitError;

/// How an input with existing splits is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResumePolicy {
    /// Skip the whole input when split 1 exists.
    ///
    /// A run interrupted after split 1 was committed is not resumed; the
    /// remaining splits are never written. Failed inputs have their
    /// committed splits withdrawn so a rerun starts over.
    #[default]
    FirstSplit,
    /// Continue after the longest run of committed splits `1..=h`.
    ///
    /// The first `h * lines_per_split` lines are read and discarded, and
    /// writing continues at split `h + 1`. Committed splits of a failed
    /// input are kept for the next run.
    Contiguous,
}

/// Settings for a [`Splitter`](crate::Splitter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    lines_per_split: u64,
    resume: ResumePolicy,
}

impl SplitConfig {
    /// Creates a configuration with `lines_per_split` lines per split.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::Config` if `lines_per_split` is zero.
    pub fn new(lines_per_split: u64) -> Result<Self, SplitError> {
        if lines_per_split == 0 {
            return Err(SplitError::Config(
                "lines per split must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            lines_per_split,
            resume: ResumePolicy::default(),
        })
    }

    /// Sets the resume policy.
    pub fn resume(mut self, policy: ResumePolicy) -> Self {
        self.resume = policy;
        self
    }

    pub fn lines_per_split(&self) -> u64 {
        self.lines_per_split
    }

    pub fn resume_policy(&self) -> ResumePolicy {
        self.resume
    }
}

impl TryFrom<i64> for SplitConfig {
    type Error = SplitError;

    fn try_from(lines_per_split: i64) -> Result<Self, Self::Error> {
        let lines = u64::try_from(lines_per_split).map_err(|_| {
            SplitError::Config(format!(
                "lines per split must be a positive integer, got {lines_per_split}"
            ))
        })?;
        Self::new(lines)
    }
}
