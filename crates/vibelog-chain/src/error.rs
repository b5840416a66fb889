/// Failure reported at the ledger boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("ledger call timed out after {0}s")]
    Timeout(u64),

    #[error("submission rate limit reached for {0}")]
    RateLimited(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the payload itself; resubmitting it unchanged
    /// cannot succeed.
    #[error("ledger rejected the attestation: {0}")]
    Rejected(String),

    #[error("no ledger entry at index {index} for {subject}")]
    NotFound { subject: String, index: u64 },
}

impl GatewayError {
    /// Whether the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_)
            | GatewayError::Timeout(_)
            | GatewayError::RateLimited(_)
            | GatewayError::Unavailable(_) => true,
            GatewayError::Rejected(_) | GatewayError::NotFound { .. } => false,
        }
    }
}
