pub mod atomic;
pub mod checkpoints;
pub mod config;
pub mod error;
pub mod lock;
pub mod logs;
pub mod paths;
pub mod queue;
pub mod workspace;

pub use atomic::write_atomic;
pub use checkpoints::CheckpointStore;
pub use config::{FeeConfig, RateLimitConfig, Stats, VibeConfig};
pub use error::{Result, StoreError};
pub use lock::WorkspaceLock;
pub use logs::LogStore;
pub use paths::VibelogPaths;
pub use queue::OfflineQueue;
pub use workspace::Workspace;
