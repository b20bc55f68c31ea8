//! Destinations for finished PDF bytes.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Receives the finished file. Called at most once per successful export.
pub trait FileSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()>;
}

fn check_filename(filename: &str) -> Result<()> {
    let path = Path::new(filename);
    let plain = path.components().count() == 1 && path.file_name().is_some();
    if filename.is_empty() || !plain {
        return Err(Error::InvalidInput(format!("not a plain file name: {:?}", filename)));
    }
    Ok(())
}

/// Writes files into a directory. The file appears under its final name only
/// once fully written.
#[derive(Debug, Clone)]
pub struct DiskSink {
    dir: PathBuf,
}

impl DiskSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DiskSink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        check_filename(filename)?;
        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(filename);
        // Unique per save, so concurrent saves of one name never share a partial file.
        let mut partial = NamedTempFile::new_in(&self.dir)?;
        partial.write_all(bytes)?;
        partial.as_file().sync_all()?;
        partial.persist(&target).map_err(|e| e.error)?;
        log::info!("saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

/// Keeps saved files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of saved files, in save order.
    pub fn filenames(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|f| f.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }

    /// Bytes of the most recent save under `filename`.
    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().ok()?;
        files.iter().rev().find(|(n, _)| n == filename).map(|(_, b)| b.clone())
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSink for MemorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        check_filename(filename)?;
        self.files
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("memory sink lock poisoned")))?
            .push((filename.to_string(), bytes.to_vec()));
        Ok(())
    }
}
