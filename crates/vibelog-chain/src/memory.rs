use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use vibelog_core::{ContentHash, Receipt};

use crate::error::GatewayError;
use crate::gateway::{attestation_gas, gas_cost, validate_attestation, LedgerGateway, LedgerRecord};

const DEFAULT_GAS_PRICE: u64 = 3_000_000_000;

/// In-process ledger with failure injection, for tests and dry runs.
pub struct MemoryLedger {
    subject: String,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    records: HashMap<String, Vec<LedgerRecord>>,
    submit_failures: VecDeque<GatewayError>,
    lookup_failures: HashMap<u64, GatewayError>,
    count_failure: Option<GatewayError>,
    estimate_failure: Option<GatewayError>,
    gas_prices: VecDeque<u64>,
    submit_calls: u64,
    height: u64,
}

impl MemoryLedger {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next `submit` fails with `err`. Calls stack up in order.
    pub fn fail_next_submit(&self, err: GatewayError) {
        self.state().submit_failures.push_back(err);
    }

    pub fn fail_lookup(&self, index: u64, err: GatewayError) {
        self.state().lookup_failures.insert(index, err);
    }

    pub fn fail_count(&self, err: GatewayError) {
        self.state().count_failure = Some(err);
    }

    pub fn fail_estimates(&self, err: GatewayError) {
        self.state().estimate_failure = Some(err);
    }

    /// Prices returned by successive `gas_price` calls; the last one repeats.
    pub fn set_gas_prices(&self, prices: impl IntoIterator<Item = u64>) {
        self.state().gas_prices = prices.into_iter().collect();
    }

    /// Append a record as if another client had attested it.
    pub fn push_record(&self, subject: &str, hash: &str, summary: &str) {
        let mut state = self.state();
        state.height += 1;
        let timestamp = state.height;
        let records = state.records.entry(subject.to_string()).or_default();
        let batch_size = records.len() as u64 + 1;
        records.push(LedgerRecord {
            hash: hash.to_string(),
            summary: summary.to_string(),
            timestamp,
            batch_size,
        });
    }

    /// Overwrite the hash stored at `index`.
    pub fn tamper(&self, subject: &str, index: u64, hash: &str) {
        if let Some(record) = self
            .state()
            .records
            .get_mut(subject)
            .and_then(|r| r.get_mut(index as usize))
        {
            record.hash = hash.to_string();
        }
    }

    pub fn records(&self, subject: &str) -> Vec<LedgerRecord> {
        self.state().records.get(subject).cloned().unwrap_or_default()
    }

    /// Number of `submit` calls, including failed ones.
    pub fn submit_calls(&self) -> u64 {
        self.state().submit_calls
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn estimate_cost(&self, summary: &str, hash: &ContentHash) -> Result<u64, GatewayError> {
        if let Some(err) = self.state().estimate_failure.clone() {
            return Err(err);
        }
        validate_attestation(summary, hash)?;
        Ok(attestation_gas(summary))
    }

    async fn submit(&self, summary: &str, hash: &ContentHash) -> Result<Receipt, GatewayError> {
        let mut state = self.state();
        let price = state.gas_prices.front().copied().unwrap_or(DEFAULT_GAS_PRICE);
        state.submit_calls += 1;
        if let Some(err) = state.submit_failures.pop_front() {
            return Err(err);
        }
        validate_attestation(summary, hash)?;

        state.height += 1;
        let height = state.height;
        let records = state.records.entry(self.subject.clone()).or_default();
        let batch_size = records.len() as u64 + 1;
        records.push(LedgerRecord {
            hash: hash.as_str().to_string(),
            summary: summary.to_string(),
            timestamp: vibelog_core::clock::now_unix(),
            batch_size,
        });
        let gas = attestation_gas(summary);
        Ok(Receipt {
            tx_id: format!("0xmem{height:060x}"),
            block_ref: height,
            gas_used: gas,
            cost: gas_cost(gas, price),
        })
    }

    async fn count(&self, subject: &str) -> Result<u64, GatewayError> {
        let state = self.state();
        if let Some(err) = state.count_failure.clone() {
            return Err(err);
        }
        Ok(state.records.get(subject).map_or(0, |r| r.len() as u64))
    }

    async fn lookup(&self, subject: &str, index: u64) -> Result<LedgerRecord, GatewayError> {
        let state = self.state();
        if let Some(err) = state.lookup_failures.get(&index) {
            return Err(err.clone());
        }
        state
            .records
            .get(subject)
            .and_then(|r| r.get(index as usize))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                subject: subject.to_string(),
                index,
            })
    }

    async fn gas_price(&self) -> Result<u64, GatewayError> {
        let mut state = self.state();
        let price = if state.gas_prices.len() > 1 {
            state.gas_prices.pop_front()
        } else {
            state.gas_prices.front().copied()
        };
        Ok(price.unwrap_or(DEFAULT_GAS_PRICE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(tag: &str) -> ContentHash {
        ContentHash::of_bytes(tag.as_bytes())
    }

    #[tokio::test]
    async fn submit_appends_in_order() {
        let ledger = MemoryLedger::new("0xme");
        let r1 = ledger.submit("one", &hash("1")).await.unwrap();
        let r2 = ledger.submit("two", &hash("2")).await.unwrap();
        assert!(r2.block_ref > r1.block_ref);
        assert_ne!(r1.tx_id, r2.tx_id);
        assert_eq!(r1.gas_used, attestation_gas("one"));

        assert_eq!(ledger.count("0xme").await.unwrap(), 2);
        assert_eq!(ledger.count("0xother").await.unwrap(), 0);
        let rec = ledger.lookup("0xme", 1).await.unwrap();
        assert_eq!(rec.hash, hash("2").as_str());
        assert_eq!(rec.batch_size, 2);
        assert!(matches!(
            ledger.lookup("0xme", 2).await,
            Err(GatewayError::NotFound { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn injected_submit_failures_are_consumed_once() {
        let ledger = MemoryLedger::new("0xme");
        ledger.fail_next_submit(GatewayError::Timeout(30));
        assert_eq!(
            ledger.submit("one", &hash("1")).await,
            Err(GatewayError::Timeout(30))
        );
        assert!(ledger.submit("one", &hash("1")).await.is_ok());
        assert_eq!(ledger.submit_calls(), 2);
        assert_eq!(ledger.records("0xme").len(), 1);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_without_recording() {
        let ledger = MemoryLedger::new("0xme");
        let err = ledger.submit("", &hash("1")).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(ledger.records("0xme").is_empty());
    }

    #[tokio::test]
    async fn tamper_and_lookup_failure() {
        let ledger = MemoryLedger::new("0xme");
        ledger.submit("one", &hash("1")).await.unwrap();
        ledger.tamper("0xme", 0, "0xdead");
        assert_eq!(ledger.lookup("0xme", 0).await.unwrap().hash, "0xdead");

        ledger.fail_lookup(0, GatewayError::Network("reset".into()));
        assert!(ledger.lookup("0xme", 0).await.is_err());
    }

    #[tokio::test]
    async fn scripted_gas_prices_repeat_the_last() {
        let ledger = MemoryLedger::new("0xme");
        assert_eq!(ledger.gas_price().await.unwrap(), DEFAULT_GAS_PRICE);
        ledger.set_gas_prices([9, 7]);
        assert_eq!(ledger.gas_price().await.unwrap(), 9);
        assert_eq!(ledger.gas_price().await.unwrap(), 7);
        assert_eq!(ledger.gas_price().await.unwrap(), 7);
    }
}
