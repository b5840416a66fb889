use vibelog_chain::{FileLedger, LedgerGateway, RateLimiter, Throttled};
use vibelog_store::config::LOCAL_NETWORK;
use vibelog_store::{VibeConfig, Workspace};

use crate::error::AnchorError;

/// Build the gateway for the configured network, throttled per the
/// workspace's rate limit.
pub fn connect(ws: &Workspace, config: &VibeConfig) -> Result<Box<dyn LedgerGateway>, AnchorError> {
    if config.network != LOCAL_NETWORK {
        return Err(AnchorError::UnsupportedNetwork(config.network.clone()));
    }
    let ledger = FileLedger::new(&ws.paths.local_ledger_json, config.subject.clone());
    let limiter = RateLimiter::new(
        config.rate_limit.max_submissions,
        config.rate_limit.window_secs,
    );
    Ok(Box::new(Throttled::new(ledger, limiter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_network_connects() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), "0xme", "local").unwrap();
        let mut cfg = ws.config().unwrap();
        let gw = connect(&ws, &cfg).unwrap();
        assert_eq!(gw.subject(), "0xme");

        cfg.network = "sepolia".into();
        assert!(matches!(
            connect(&ws, &cfg),
            Err(AnchorError::UnsupportedNetwork(n)) if n == "sepolia"
        ));
    }
}
