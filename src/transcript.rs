//! Run transcript
//!
//! An append-only text file recording every command, every device line seen
//! while waiting for an expectation, and every pass/fail boundary. Commands
//! write their stdout and stderr straight into the same file handle, so
//! records and command output interleave in the order they happened.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use crate::common::{Error, Result};

pub struct Transcript {
    file: File,
    path: PathBuf,
    started: Instant,
}

impl Transcript {
    /// Create (or truncate) the transcript at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::TranscriptCreate {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            started: Instant::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&mut self, tag: &str, text: &str) -> Result<()> {
        let elapsed = self.started.elapsed().as_secs_f64();
        writeln!(self.file, "[{:>9.3}s] {} {}", elapsed, tag, text)?;
        Ok(())
    }

    /// Section header for a group
    pub fn group(&mut self, name: &str, short: &str) -> Result<()> {
        self.record("==", &format!("group '{}' ({})", name, short))
    }

    /// Stage marker within a step
    pub fn stage(&mut self, step: usize, stage: &str) -> Result<()> {
        self.record("--", &format!("step {}: {}", step, stage))
    }

    /// A command about to run
    pub fn command(&mut self, command: &str) -> Result<()> {
        self.record("$", command)
    }

    /// A line observed on the device console
    pub fn device_line(&mut self, line: &str) -> Result<()> {
        self.record("<", line)
    }

    pub fn note(&mut self, text: &str) -> Result<()> {
        self.record("#", text)
    }

    pub fn pass(&mut self, what: &str) -> Result<()> {
        self.record("PASS", what)
    }

    pub fn fail(&mut self, what: &str) -> Result<()> {
        self.record("FAIL", what)
    }

    /// A handle a child process can write its output into
    pub fn child_stdio(&self) -> Result<Stdio> {
        Ok(Stdio::from(self.file.try_clone()?))
    }

    /// Flush and sync the transcript to disk
    pub fn finish(mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let mut transcript = Transcript::create(&path).unwrap();
        transcript.group("Good RSA", "goodrsa").unwrap();
        transcript.command("make flash_boot").unwrap();
        transcript.device_line("Hello World").unwrap();
        transcript.pass("step 1").unwrap();
        transcript.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("== group 'Good RSA' (goodrsa)"));
        assert!(lines[1].ends_with("$ make flash_boot"));
        assert!(lines[2].ends_with("< Hello World"));
        assert!(lines[3].ends_with("PASS step 1"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn test_create_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("run.log");
        assert!(matches!(
            Transcript::create(&path),
            Err(Error::TranscriptCreate { .. })
        ));
    }
}
