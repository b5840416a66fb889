use std::fmt;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::gateway::LedgerGateway;

pub const GWEI: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for FeeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeeLevel::Low => "low",
            FeeLevel::Medium => "medium",
            FeeLevel::High => "high",
        })
    }
}

/// Classify a gas price: under 5 gwei is low, under 10 medium.
pub fn recommend(gas_price_wei: u64) -> FeeLevel {
    if gas_price_wei < 5 * GWEI {
        FeeLevel::Low
    } else if gas_price_wei < 10 * GWEI {
        FeeLevel::Medium
    } else {
        FeeLevel::High
    }
}

pub fn format_gwei(wei: u64) -> String {
    format!("{:.2} gwei", wei as f64 / GWEI as f64)
}

/// Poll the gas price until it drops to `max_price_wei` or `limit` runs
/// out. Returns whether the target was met. A failed price query counts
/// as "not yet". A limit too large to represent as an instant means no
/// deadline.
pub async fn wait_for_fee_window(
    gateway: &dyn LedgerGateway,
    max_price_wei: u64,
    limit: Duration,
    interval: Duration,
) -> bool {
    let deadline = Instant::now().checked_add(limit);
    loop {
        let price = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match timeout(remaining, gateway.gas_price()).await {
                    Ok(price) => price,
                    Err(_) => return false,
                }
            }
            None => gateway.gas_price().await,
        };
        match price {
            Ok(price) if price <= max_price_wei => return true,
            Ok(price) => debug!(price = %format_gwei(price), "gas above target"),
            Err(e) => debug!(error = %e, "gas price query failed"),
        }
        let pause = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                interval.min(remaining)
            }
            None => interval,
        };
        sleep(pause).await;
    }
}
