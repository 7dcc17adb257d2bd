//! Device log tailer
//!
//! Follows the console log written by an external terminal logger and
//! publishes each completed line on a bounded channel. Content that was in
//! the file before attaching is skipped. The follow is a plain polling loop:
//! read until EOF, sleep, read again. The writer is not under our control
//! and may pause, truncate or rotate the file at any time.

mod lines;

pub use lines::LineAssembler;

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::{Error, Result};

/// Size of a single read from the device log
const READ_CHUNK: usize = 8192;

/// Follows one device log file
pub struct LogTailer {
    path: PathBuf,
    file: File,
    /// Bytes consumed from the current file
    offset: u64,
    poll_interval: Duration,
    lines: LineAssembler,
}

impl LogTailer {
    /// Open the device log and position at its current end
    pub async fn attach(path: &Path, poll_interval: Duration) -> Result<Self> {
        let open_err = |source| Error::DeviceLogOpen {
            path: path.display().to_string(),
            source,
        };

        let mut file = File::open(path).await.map_err(open_err)?;
        let offset = file
            .seek(SeekFrom::End(0))
            .await
            .map_err(|source| Error::DeviceLogSeek {
                path: path.display().to_string(),
                source,
            })?;

        tracing::info!(path = %path.display(), offset, "Attached to device log");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset,
            poll_interval,
            lines: LineAssembler::new(),
        })
    }

    /// Run the follow loop on its own task
    pub fn spawn(self, tx: mpsc::Sender<String>) -> TailerHandle {
        TailerHandle::from_task(tokio::spawn(self.run(tx)))
    }

    async fn run(mut self, tx: mpsc::Sender<String>) -> Result<()> {
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            let n = self.file.read(&mut buf).await.map_err(|e| {
                tracing::error!(path = %self.path.display(), error = %e, "Device log read failed");
                Error::DeviceLogRead(e)
            })?;

            if n == 0 {
                if tx.is_closed() {
                    tracing::debug!("Line receiver dropped, tailer stopping");
                    return Ok(());
                }
                tokio::time::sleep(self.poll_interval).await;
                self.reopen_if_truncated().await;
                continue;
            }

            self.offset += n as u64;
            for line in self.lines.push(&buf[..n]) {
                tracing::trace!(line = %line, "Device line");
                // Blocks while the channel is full; lines are never dropped
                if tx.send(line).await.is_err() {
                    tracing::debug!("Line receiver dropped, tailer stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Start over from the beginning when the file shrank under us
    async fn reopen_if_truncated(&mut self) {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                // Mid-rotation the path may briefly not exist
                tracing::debug!(path = %self.path.display(), error = %e, "Device log unavailable");
                return;
            }
        };

        if len >= self.offset {
            return;
        }

        match File::open(&self.path).await {
            Ok(file) => {
                tracing::warn!(
                    path = %self.path.display(),
                    previous_offset = self.offset,
                    len,
                    "Device log truncated or rotated, following from start"
                );
                self.file = file;
                self.offset = 0;
                self.lines.reset();
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Reopen failed, retrying");
            }
        }
    }
}

/// Handle to a running tailer task
#[derive(Debug)]
pub struct TailerHandle {
    task: JoinHandle<Result<()>>,
    joined: bool,
}

impl TailerHandle {
    pub(crate) fn from_task(task: JoinHandle<Result<()>>) -> Self {
        Self {
            task,
            joined: false,
        }
    }

    /// Stop following
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the tailer and return how it ended
    ///
    /// An aborted tailer counts as a clean stop. Only the first completed
    /// call sees the outcome; later calls return `Ok(())` at once.
    pub async fn join(&mut self) -> Result<()> {
        if self.joined {
            return Ok(());
        }
        let outcome = (&mut self.task).await;
        self.joined = true;
        match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(Error::Internal(format!("Log tailer panicked: {}", e))),
        }
    }

    /// Wait for the tailer to end and return why it stopped delivering lines
    pub async fn stopped(&mut self) -> Error {
        match self.join().await {
            Err(e) => e,
            Ok(()) => Error::LogStreamClosed,
        }
    }

    /// Fail with the tailer's error if it has already ended
    pub async fn check(&mut self) -> Result<()> {
        if self.joined || self.task.is_finished() {
            return Err(self.stopped().await);
        }
        Ok(())
    }
}

/// Lines from a followed device log and the task producing them
#[derive(Debug)]
pub struct DeviceLog {
    pub lines: mpsc::Receiver<String>,
    pub tailer: TailerHandle,
}

/// Attach to `path` and start following it
///
/// The returned line stream is shared by every expectation in the run.
pub async fn follow(path: &Path, poll_interval: Duration, capacity: usize) -> Result<DeviceLog> {
    let tailer = LogTailer::attach(path, poll_interval).await?;
    let (tx, lines) = mpsc::channel(capacity);
    Ok(DeviceLog {
        lines,
        tailer: tailer.spawn(tx),
    })
}
