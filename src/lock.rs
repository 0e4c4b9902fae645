//! Advisory file lock (C4): non-blocking, exclusive, per-path.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::RampError;

/// An acquired advisory lock on a single file. Release is idempotent and
/// happens automatically on drop if not called explicitly.
pub struct Lock {
    path: PathBuf,
    file: Option<File>,
}

impl Lock {
    /// Attempt to acquire an exclusive, non-blocking lock on `path`.
    /// Creates the parent directory and the lock file itself if missing.
    /// Fails immediately (no waiting) if another holder has it.
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)?;

        file.try_lock_exclusive().map_err(|_| {
            RampError::conflict(
                "advisory lock",
                format!("{} is held by another process", path.display()),
            )
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and close the descriptor. Idempotent: calling this
    /// (or dropping the `Lock`) more than once is a no-op after the first.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        self.release();
    }
}
