pub mod checkpoint;
pub mod connect;
pub mod error;
pub mod sync;
pub mod verify;

pub use checkpoint::{
    anchor, create_checkpoint, ensure_no_backlog, prepare, CheckpointOptions, CheckpointOutcome,
    FailurePolicy, FeeWait, Prepared,
};
pub use connect::connect;
pub use error::AnchorError;
pub use sync::{sync_queue, SyncReport};
pub use verify::{verify, Aggregate, VerificationEntry, VerificationReport, Verdict};
