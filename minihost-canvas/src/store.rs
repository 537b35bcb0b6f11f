//! Host-managed temporary file storage.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CanvasResult;

/// Writes export results into a host-managed directory.
///
/// Each write goes to a uniquely named file that only appears under its
/// final name once fully flushed; a failed write leaves nothing behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFileStore {
    dir: PathBuf,
}

impl TempFileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new file with the given extension.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CanvasError::Io`] if the directory cannot be created
    /// or the file cannot be written.
    pub fn write(&self, bytes: &[u8], extension: &str) -> CanvasResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let suffix = format!(".{extension}");
        let mut file = tempfile::Builder::new()
            .prefix("snapshot-")
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;

        let (_, path) = file.keep().map_err(|e| e.error)?;
        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}
