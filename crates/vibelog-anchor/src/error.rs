use vibelog_chain::GatewayError;
use vibelog_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("ledger submission failed: {0}")]
    Submission(#[from] GatewayError),

    #[error("{count} queued checkpoint(s) must be synced before a new checkpoint is created; run `vibe sync`")]
    QueueBacklog { count: usize },

    #[error("network `{0}` is not supported by this build (only `local` is)")]
    UnsupportedNetwork(String),
}
