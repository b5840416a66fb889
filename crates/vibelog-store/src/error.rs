use std::path::PathBuf;

use vibelog_core::QueueStatus;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vibelog is not initialized ({}/.vibelog not found). Run `vibe init` first.", .0.display())]
    NotInitialized(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("workspace is locked by another process ({})", .0.display())]
    Locked(PathBuf),

    #[error("checkpoint {0} already exists")]
    DuplicateCheckpoint(String),

    #[error("queue item not found: {0}")]
    QueueItemNotFound(String),

    #[error("invalid queue transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: QueueStatus,
        to: QueueStatus,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Json { path, source }
    }
}
