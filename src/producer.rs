//! Line producers feeding the splitter.
//!
//! A producer runs on its own thread and hands records to its consumer over
//! a rendezvous conduit, so it blocks until the consumer takes each line.
//! The path to read is delivered through a one-shot channel that is closed
//! right after sending. When the producer is done its result (line count or
//! error) is collected with [`LineStream::finish`], which is how an open
//! failure is told apart from an empty input.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::conduit;
use crate::error::SplitError;
use crate::record::LineRecord;

/// Something that can stream the lines of an input path.
pub trait LineProducer: Send + Sync {
    /// Starts producing the lines of `path`.
    fn start(&self, path: &Path) -> Result<LineStream, SplitError>;
}

/// Sending half of a line conduit, as seen by a producer.
pub struct LineSender {
    tx: SyncSender<LineRecord>,
}

impl LineSender {
    /// Hands one record to the consumer, blocking until it is taken.
    ///
    /// Fails with `BrokenPipe` once the consumer has gone away.
    pub fn send(&self, record: LineRecord) -> io::Result<()> {
        self.tx
            .send(record)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "line consumer hung up"))
    }
}

/// A running producer: its line conduit plus its completion result.
pub struct LineStream {
    path: PathBuf,
    lines: Receiver<LineRecord>,
    worker: JoinHandle<io::Result<u64>>,
}

impl LineStream {
    /// Spawns `body` on a named thread and delivers `path` to it.
    ///
    /// `body` returns the number of lines it sent, or the error that stopped
    /// it.
    pub fn spawn<F>(name: &str, path: &Path, body: F) -> Result<Self, SplitError>
    where
        F: FnOnce(&Path, &LineSender) -> io::Result<u64> + Send + 'static,
    {
        let (path_tx, path_rx) = mpsc::sync_channel::<PathBuf>(1);
        let (line_tx, line_rx) = conduit::rendezvous();

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let path = path_rx.recv().map_err(|_| {
                    io::Error::new(io::ErrorKind::BrokenPipe, "no input path received")
                })?;
                body(&path, &LineSender { tx: line_tx })
            })
            .map_err(|e| SplitError::producer(path, e))?;

        path_tx.send(path.to_path_buf()).map_err(|_| {
            SplitError::producer(
                path,
                io::Error::new(io::ErrorKind::BrokenPipe, "line producer exited early"),
            )
        })?;
        drop(path_tx);

        Ok(Self {
            path: path.to_path_buf(),
            lines: line_rx,
            worker,
        })
    }

    /// The path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Waits for the next record; `None` at end-of-stream.
    pub fn recv(&self) -> Option<LineRecord> {
        self.lines.recv().ok()
    }

    /// Blocking iterator over the remaining records.
    pub fn iter(&self) -> mpsc::Iter<'_, LineRecord> {
        self.lines.iter()
    }

    /// Closes the conduit and collects the producer's result.
    ///
    /// A producer still sending when this is called sees its consumer hang
    /// up and stops, so this never waits on a blocked send.
    ///
    /// # Errors
    ///
    /// Returns `SplitError::Producer` if the producer failed or panicked.
    pub fn finish(self) -> Result<u64, SplitError> {
        let LineStream {
            path,
            lines,
            worker,
        } = self;
        drop(lines);

        match worker.join() {
            Ok(Ok(count)) => Ok(count),
            Ok(Err(e)) => Err(SplitError::producer(path, e)),
            Err(_) => Err(SplitError::producer(
                path,
                io::Error::other("line producer panicked"),
            )),
        }
    }
}

/// Reads a file line by line.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLineReader;

impl LineProducer for FileLineReader {
    fn start(&self, path: &Path) -> Result<LineStream, SplitError> {
        LineStream::spawn("line-reader", path, read_lines)
    }
}

fn read_lines(path: &Path, out: &LineSender) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut count = 0;

    loop {
        let mut buf = Vec::new();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        out.send(LineRecord::from_terminated(buf))?;
        count += 1;
    }

    tracing::debug!(path = %path.display(), lines = count, "Finished reading input");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn collect(stream: &LineStream) -> Vec<String> {
        stream
            .iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_reads_all_lines_in_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("in.txt");
        fs::write(&path, "a\nb\r\n\nlast").expect("Failed to write input");

        let stream = FileLineReader.start(&path).expect("Failed to start reader");
        assert_eq!(stream.path(), path);
        assert_eq!(collect(&stream), vec!["a", "b", "", "last"]);
        assert_eq!(stream.finish().expect("Reader should succeed"), 4);
    }

    #[test]
    fn test_empty_file_produces_no_lines() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("empty.txt");
        fs::write(&path, "").expect("Failed to write input");

        let stream = FileLineReader.start(&path).expect("Failed to start reader");
        assert!(stream.recv().is_none());
        assert_eq!(stream.finish().expect("Empty input is valid"), 0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("missing.txt");

        let stream = FileLineReader.start(&path).expect("Failed to start reader");
        assert!(stream.recv().is_none());
        assert!(matches!(stream.finish(), Err(SplitError::Producer { .. })));
    }

    #[test]
    fn test_consumer_hangup_stops_producer() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("in.txt");
        fs::write(&path, "1\n2\n3\n4\n").expect("Failed to write input");

        let stream = FileLineReader.start(&path).expect("Failed to start reader");
        assert_eq!(
            stream.recv().map(|r| r.into_bytes()),
            Some(b"1".to_vec())
        );
        // Producer is blocked handing over line 2; finishing must not hang
        assert!(stream.finish().is_err());
    }

    #[test]
    fn test_spawn_delivers_path_to_body() {
        let stream = LineStream::spawn("echo-path", Path::new("some/input"), |path, out| {
            out.send(LineRecord::from(path.display().to_string()))?;
            Ok(1)
        })
        .expect("Failed to spawn");

        assert_eq!(collect(&stream), vec!["some/input"]);
        assert_eq!(stream.finish().expect("Body succeeded"), 1);
    }

    #[test]
    fn test_panicking_producer_is_reported() {
        let stream = LineStream::spawn("boom", Path::new("x"), |_, _| -> io::Result<u64> {
            panic!("reader exploded")
        })
        .expect("Failed to spawn");

        assert!(stream.recv().is_none());
        assert!(matches!(stream.finish(), Err(SplitError::Producer { .. })));
    }
}
