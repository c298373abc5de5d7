//! CLI tool to split input files into fixed-size line splits.
//!
//! Usage:
//!   split-run -n <lines> <input>...
//!   split-run -n <lines> --resume contiguous <input>...
//!
//! Committed split paths are written to stdout, one per line, as they are
//! published. Progress goes to stderr.

use clap::Parser;
use pipelines_split::{InputArtifact, ResumePolicy, SplitConfig, Splitter, conduit};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Split files into parts of a fixed number of lines.
///
/// Input `P` yields `P.split_1`, `P.split_2`, ... next to it. Inputs whose
/// first split already exists are skipped.
#[derive(Parser)]
#[command(name = "split-run")]
struct Cli {
    /// Input files, processed in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of lines per split (the last split may be shorter)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    lines_per_split: i64,

    /// How inputs with existing splits are resumed
    #[arg(long, value_enum, default_value_t = ResumePolicy::FirstSplit)]
    resume: ResumePolicy,

    /// Log debug detail on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match SplitConfig::try_from(cli.lines_per_split) {
        Ok(config) => config.resume(cli.resume),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let (in_tx, in_rx) = conduit::bounded(cli.inputs.len());
    for path in &cli.inputs {
        if in_tx.send(InputArtifact::new(path)).is_err() {
            eprintln!("Error queueing input '{}'", path.display());
            process::exit(1);
        }
    }
    drop(in_tx);

    let (out_tx, out_rx) = conduit::rendezvous();
    let stage = match Splitter::new(config).spawn(in_rx, out_tx) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error starting splitter: {e}");
            process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    for split in out_rx.iter() {
        if let Err(e) = writeln!(stdout, "{}", split.path().display()) {
            eprintln!("Error writing output: {e}");
            process::exit(1);
        }
    }

    let report = match stage.join() {
        Ok(report) => report,
        Err(_) => {
            eprintln!("Splitter thread panicked");
            process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!(
            "Inputs:   {} processed, {} failed",
            report.outcomes.len(),
            report.failures().count()
        );
        eprintln!("Splits:   {} created", report.splits_created());
    }

    for failure in report.failures() {
        if let Some(e) = &failure.error {
            eprintln!("Failed '{}': {e}", failure.input.display());
        }
        if let Some(e) = &failure.withdraw_error {
            eprintln!("  committed splits left in place: {e}");
        }
    }

    if report.has_failures() {
        process::exit(1);
    }
}
