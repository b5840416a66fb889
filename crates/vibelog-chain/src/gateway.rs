use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vibelog_core::sanitize::MAX_SUMMARY_CHARS;
use vibelog_core::{ContentHash, Receipt};

use crate::error::GatewayError;

/// Gas figure used when the ledger cannot produce an estimate.
pub const DEFAULT_GAS_ESTIMATE: u64 = 100_000;

/// One attestation as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub hash: String,
    pub summary: String,
    pub timestamp: u64,
    /// Number of attestations the subject had once this one was appended.
    pub batch_size: u64,
}

/// Abstract boundary to the attestation ledger.
///
/// Records for a subject are indexed from zero in submission order.
/// `submit` is not idempotent: a call that fails after the ledger accepted
/// the attestation leaves a record behind.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Subject key that `submit` records under.
    fn subject(&self) -> &str;

    async fn estimate_cost(&self, summary: &str, hash: &ContentHash) -> Result<u64, GatewayError>;

    async fn submit(&self, summary: &str, hash: &ContentHash) -> Result<Receipt, GatewayError>;

    async fn count(&self, subject: &str) -> Result<u64, GatewayError>;

    async fn lookup(&self, subject: &str, index: u64) -> Result<LedgerRecord, GatewayError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u64, GatewayError>;
}

/// Checks every ledger applies before accepting an attestation.
pub fn validate_attestation(summary: &str, hash: &ContentHash) -> Result<(), GatewayError> {
    if summary.trim().is_empty() {
        return Err(GatewayError::Rejected("summary is empty".into()));
    }
    if summary.chars().count() > MAX_SUMMARY_CHARS {
        return Err(GatewayError::Rejected(format!(
            "summary exceeds {MAX_SUMMARY_CHARS} characters"
        )));
    }
    if hash.is_zero() {
        return Err(GatewayError::Rejected("hash must be non-zero".into()));
    }
    Ok(())
}

/// Gas charged by the bundled ledgers for one attestation.
pub(crate) fn attestation_gas(summary: &str) -> u64 {
    45_000 + 16 * summary.len() as u64
}

/// Native-token cost of `gas` units at `price_wei`.
pub fn gas_cost(gas: u64, price_wei: u64) -> f64 {
    (gas as f64) * (price_wei as f64) / 1e18
}

/// Estimate, falling back to [`DEFAULT_GAS_ESTIMATE`] when the ledger
/// cannot answer.
pub async fn estimate_or_default(
    gateway: &dyn LedgerGateway,
    summary: &str,
    hash: &ContentHash,
) -> u64 {
    match gateway.estimate_cost(summary, hash).await {
        Ok(gas) => gas,
        Err(e) => {
            warn!(error = %e, fallback = DEFAULT_GAS_ESTIMATE, "gas estimate unavailable");
            DEFAULT_GAS_ESTIMATE
        }
    }
}
