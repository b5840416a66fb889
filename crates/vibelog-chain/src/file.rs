use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vibelog_core::hash::sha256_hex;
use vibelog_core::{ContentHash, Receipt};
use vibelog_store::atomic::{read_json, write_json};
use vibelog_store::StoreError;

use crate::error::GatewayError;
use crate::gateway::{attestation_gas, gas_cost, validate_attestation, LedgerGateway, LedgerRecord};

/// Fixed price charged by the file ledger: 1 gwei.
pub const FILE_LEDGER_GAS_PRICE: u64 = 1_000_000_000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChainState {
    height: u64,
    #[serde(default)]
    subjects: BTreeMap<String, Vec<LedgerRecord>>,
}

/// Ledger persisted to a single JSON file, used by the `local` network.
///
/// Each call re-reads the file, so several workspaces may share one
/// ledger file as long as they do not submit concurrently.
pub struct FileLedger {
    path: PathBuf,
    subject: String,
}

fn unavailable(e: StoreError) -> GatewayError {
    GatewayError::Unavailable(e.to_string())
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>, subject: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subject: subject.into(),
        }
    }

    fn load(&self) -> Result<ChainState, GatewayError> {
        if !self.path.exists() {
            return Ok(ChainState::default());
        }
        read_json(&self.path).map_err(unavailable)
    }

    fn records(&self, subject: &str) -> Result<Vec<LedgerRecord>, GatewayError> {
        Ok(self.load()?.subjects.remove(subject).unwrap_or_default())
    }
}

#[async_trait]
impl LedgerGateway for FileLedger {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn estimate_cost(&self, summary: &str, hash: &ContentHash) -> Result<u64, GatewayError> {
        validate_attestation(summary, hash)?;
        Ok(attestation_gas(summary))
    }

    async fn submit(&self, summary: &str, hash: &ContentHash) -> Result<Receipt, GatewayError> {
        validate_attestation(summary, hash)?;
        let mut chain = self.load()?;
        chain.height += 1;
        let height = chain.height;

        let records = chain.subjects.entry(self.subject.clone()).or_default();
        let index = records.len() as u64;
        records.push(LedgerRecord {
            hash: hash.as_str().to_string(),
            summary: summary.to_string(),
            timestamp: vibelog_core::clock::now_unix(),
            batch_size: index + 1,
        });
        write_json(&self.path, &chain).map_err(unavailable)?;

        let tx_id = format!(
            "0x{}",
            sha256_hex(format!("{}:{index}:{}:{height}", self.subject, hash).as_bytes())
        );
        debug!(%tx_id, height, index, "attestation appended to file ledger");
        let gas = attestation_gas(summary);
        Ok(Receipt {
            tx_id,
            block_ref: height,
            gas_used: gas,
            cost: gas_cost(gas, FILE_LEDGER_GAS_PRICE),
        })
    }

    async fn count(&self, subject: &str) -> Result<u64, GatewayError> {
        Ok(self.records(subject)?.len() as u64)
    }

    async fn lookup(&self, subject: &str, index: u64) -> Result<LedgerRecord, GatewayError> {
        self.records(subject)?
            .into_iter()
            .nth(index as usize)
            .ok_or_else(|| GatewayError::NotFound {
                subject: subject.to_string(),
                index,
            })
    }

    async fn gas_price(&self) -> Result<u64, GatewayError> {
        Ok(FILE_LEDGER_GAS_PRICE)
    }
}
