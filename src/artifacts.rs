//! Prebuilt firmware artifacts
//!
//! A zip archive holds one directory per test group, named by the group's
//! short identifier, containing the fixed set of artifact files:
//!
//! ```text
//! goodrsa/mcuboot.bin
//! goodrsa/signed-hello1.bin
//! overwrite/mcuboot.bin
//! ...
//! ```
//!
//! The package pass writes such an archive; the run pass extracts one group
//! at a time into the working directory instead of rebuilding.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::common::{Error, Result};

/// Source of prebuilt artifacts for a group
pub trait ArtifactSource: Send {
    /// Write the artifacts stored for `short` into `dest`, overwriting files
    /// of the same name
    fn extract(&mut self, short: &str, dest: &Path) -> Result<()>;
}

fn archive_err(e: zip::result::ZipError) -> Error {
    Error::Archive(e.to_string())
}

/// Read side of an artifact archive
pub struct ZipArtifacts {
    archive: ZipArchive<File>,
}

impl ZipArtifacts {
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |error: String| Error::ArchiveOpen {
            path: path.display().to_string(),
            error,
        };
        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        let archive = ZipArchive::new(file).map_err(|e| open_err(e.to_string()))?;

        tracing::info!(path = %path.display(), entries = archive.len(), "Opened artifact archive");
        Ok(Self { archive })
    }

    /// Indices and file names of the entries stored directly under `short/`
    fn entries_for(&mut self, short: &str) -> Result<Vec<(usize, String)>> {
        let prefix = format!("{}/", short);
        let mut found = Vec::new();

        for i in 0..self.archive.len() {
            let entry = self.archive.by_index(i).map_err(archive_err)?;
            if entry.is_dir() {
                continue;
            }
            let Some(name) = entry.name().strip_prefix(&prefix) else {
                continue;
            };
            if entry.enclosed_name().is_none() {
                return Err(Error::Archive(format!(
                    "unsafe entry path '{}'",
                    entry.name()
                )));
            }
            if name.is_empty() || name.contains('/') {
                tracing::debug!(entry = entry.name(), "Skipping nested archive entry");
                continue;
            }
            found.push((i, name.to_string()));
        }

        Ok(found)
    }
}

impl ArtifactSource for ZipArtifacts {
    fn extract(&mut self, short: &str, dest: &Path) -> Result<()> {
        let entries = self.entries_for(short)?;
        if entries.is_empty() {
            return Err(Error::MissingArtifact(short.to_string()));
        }

        for (index, name) in &entries {
            let mut entry = self.archive.by_index(*index).map_err(archive_err)?;
            let mut out = File::create(dest.join(name))?;
            std::io::copy(&mut entry, &mut out)?;
        }

        tracing::info!(
            group = short,
            files = ?entries.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>(),
            "Extracted artifacts"
        );
        Ok(())
    }
}

/// Write side of an artifact archive
///
/// The archive is written next to its destination as `<path>.partial` and
/// only moved into place by [`ArtifactPackager::finish`]. Dropping an
/// unfinished packager removes the partial file, so an existing archive at
/// `path` survives a failed package run.
pub struct ArtifactPackager {
    writer: Option<ZipWriter<File>>,
    path: PathBuf,
    partial: PathBuf,
    files: Vec<String>,
    captured: HashSet<String>,
    finished: bool,
}

impl ArtifactPackager {
    /// Start an archive for `path` capturing `files` for each group
    pub fn create(path: &Path, files: &[String]) -> Result<Self> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let file = File::create(&partial).map_err(|e| Error::ArchiveOpen {
            path: partial.display().to_string(),
            error: e.to_string(),
        })?;

        Ok(Self {
            writer: Some(ZipWriter::new(file)),
            path: path.to_path_buf(),
            partial,
            files: files.to_vec(),
            captured: HashSet::new(),
            finished: false,
        })
    }

    /// Store the artifact set currently in `src_dir` under `short/`
    pub fn capture(&mut self, short: &str, src_dir: &Path) -> Result<()> {
        if self.captured.contains(short) {
            return Err(Error::Archive(format!("group '{}' already captured", short)));
        }

        // Read everything first so a missing file leaves no partial group
        let mut contents = Vec::with_capacity(self.files.len());
        for name in &self.files {
            let path = src_dir.join(name);
            let data = std::fs::read(&path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            contents.push((name, data));
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Internal("artifact archive already closed".to_string()))?;
        writer
            .add_directory(format!("{}/", short), options)
            .map_err(archive_err)?;
        for (name, data) in contents {
            writer
                .start_file(format!("{}/{}", short, name), options)
                .map_err(archive_err)?;
            writer.write_all(&data)?;
        }

        self.captured.insert(short.to_string());
        tracing::info!(group = short, files = self.files.len(), "Captured artifacts");
        Ok(())
    }

    /// Write the central directory and move the archive into place
    pub fn finish(mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| Error::Internal("artifact archive already closed".to_string()))?;
        let mut file = writer.finish().map_err(archive_err)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&self.partial, &self.path).map_err(|e| {
            Error::Archive(format!(
                "cannot move '{}' to '{}': {}",
                self.partial.display(),
                self.path.display(),
                e
            ))
        })?;
        self.finished = true;

        tracing::info!(path = %self.path.display(), groups = self.captured.len(), "Wrote artifact archive");
        Ok(())
    }
}

impl Drop for ArtifactPackager {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Close the writer before removing what it wrote
        drop(self.writer.take());
        if let Err(e) = std::fs::remove_file(&self.partial) {
            tracing::debug!(path = %self.partial.display(), error = %e, "Could not remove partial archive");
        } else {
            tracing::warn!(path = %self.path.display(), "Package incomplete, archive left unchanged");
        }
    }
}
