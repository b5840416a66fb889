use fs2::FileExt;
use std::fs::{File, OpenOptions};

use crate::error::{Result, StoreError};
use crate::paths::VibelogPaths;

/// Exclusive workspace lock backed by `.vibelog/LOCK`.
/// Automatically released when dropped.
pub struct WorkspaceLock {
    _file: File,
}

impl WorkspaceLock {
    /// Try to acquire the workspace lock (non-blocking).
    /// Returns `StoreError::Locked` if another process holds it.
    pub fn acquire(paths: &VibelogPaths) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&paths.lock_file)
            .map_err(StoreError::io(&paths.lock_file))?;

        file.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(paths.lock_file.clone()))?;

        Ok(Self { _file: file })
    }
}
