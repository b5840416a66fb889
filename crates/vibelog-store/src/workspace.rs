use std::path::PathBuf;

use tracing::debug;
use vibelog_core::LogEntry;

use crate::checkpoints::CheckpointStore;
use crate::config::{load_config, save_config, VibeConfig};
use crate::error::{Result, StoreError};
use crate::lock::WorkspaceLock;
use crate::logs::LogStore;
use crate::paths::VibelogPaths;
use crate::queue::OfflineQueue;

/// An opened `.vibelog/` workspace.
pub struct Workspace {
    pub paths: VibelogPaths,
}

impl Workspace {
    /// Open an existing workspace. Fails if `.vibelog/` has not been set up.
    /// Repairs the watermark if a previous run crashed between writing a
    /// checkpoint and updating the config, but only when no other process
    /// holds the workspace lock; the holder repairs it in `lock` instead.
    pub fn open(project_root: impl Into<PathBuf>) -> Result<Self> {
        let paths = VibelogPaths::discover(project_root);
        if !paths.is_initialized() {
            return Err(StoreError::NotInitialized(paths.root.clone()));
        }
        paths
            .ensure_layout()
            .map_err(StoreError::io(&paths.vibelog_dir))?;
        let ws = Self { paths };
        match WorkspaceLock::acquire(&ws.paths) {
            Ok(_guard) => {
                ws.checkpoints().reconcile()?;
            }
            Err(StoreError::Locked(path)) => {
                debug!(lock = %path.display(), "workspace busy; skipping config repair");
            }
            Err(e) => return Err(e),
        }
        Ok(ws)
    }

    /// Create the layout and config. An existing config is kept as is.
    pub fn init(project_root: impl Into<PathBuf>, subject: &str, network: &str) -> Result<Self> {
        let paths = VibelogPaths::discover(project_root);
        paths
            .ensure_layout()
            .map_err(StoreError::io(&paths.vibelog_dir))?;
        if !paths.is_initialized() {
            save_config(&paths, &VibeConfig::new(subject, network))?;
        }
        Ok(Self { paths })
    }

    pub fn config(&self) -> Result<VibeConfig> {
        load_config(&self.paths)
    }

    pub fn save_config(&self, config: &VibeConfig) -> Result<()> {
        save_config(&self.paths, config)
    }

    pub fn watermark(&self) -> Result<u64> {
        Ok(self.config()?.watermark())
    }

    pub fn logs(&self) -> LogStore<'_> {
        LogStore::new(&self.paths)
    }

    pub fn checkpoints(&self) -> CheckpointStore<'_> {
        CheckpointStore::new(&self.paths)
    }

    pub fn queue(&self) -> OfflineQueue<'_> {
        OfflineQueue::new(&self.paths)
    }

    /// Logs newer than the watermark.
    pub fn pending_logs(&self) -> Result<Vec<LogEntry>> {
        self.logs().pending()
    }

    /// Exclusive lock for commands that mutate the workspace. The config is
    /// reconciled with the checkpoint files once the lock is held.
    pub fn lock(&self) -> Result<WorkspaceLock> {
        let guard = WorkspaceLock::acquire(&self.paths)?;
        self.checkpoints().reconcile()?;
        Ok(guard)
    }
}
