use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::warn;
use vibelog_core::{ContentHash, Receipt};

use crate::error::GatewayError;
use crate::gateway::{LedgerGateway, LedgerRecord};

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self(AtomicU64::new(start_millis))
    }

    pub fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Fixed-window counter per key. Windows older than the previous one are
/// dropped on every check, so memory stays bounded by the active keys.
pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    max: u32,
    window_ms: u64,
    windows: Mutex<HashMap<String, (u64, u32)>>,
}

impl RateLimiter<SystemClock> {
    pub fn new(max: u32, window_secs: u64) -> Self {
        Self::with_clock(SystemClock, max, window_secs)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C, max: u32, window_secs: u64) -> Self {
        Self {
            clock,
            max,
            window_ms: window_secs.saturating_mul(1000).max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Take one slot for `key`. Returns false when the window is full.
    pub fn try_acquire(&self, key: &str) -> bool {
        let window = self.clock.now_millis() / self.window_ms;
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.retain(|_, (w, _)| *w + 1 >= window);

        let slot = windows.entry(key.to_string()).or_insert((window, 0));
        if slot.0 != window {
            *slot = (window, 0);
        }
        if slot.1 >= self.max {
            return false;
        }
        slot.1 += 1;
        true
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Gateway decorator that refuses submissions over the rate limit before
/// they reach the ledger. Reads pass straight through.
pub struct Throttled<G, C: Clock = SystemClock> {
    inner: G,
    limiter: RateLimiter<C>,
}

impl<G: LedgerGateway, C: Clock> Throttled<G, C> {
    pub fn new(inner: G, limiter: RateLimiter<C>) -> Self {
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: LedgerGateway, C: Clock> LedgerGateway for Throttled<G, C> {
    fn subject(&self) -> &str {
        self.inner.subject()
    }

    async fn estimate_cost(&self, summary: &str, hash: &ContentHash) -> Result<u64, GatewayError> {
        self.inner.estimate_cost(summary, hash).await
    }

    async fn submit(&self, summary: &str, hash: &ContentHash) -> Result<Receipt, GatewayError> {
        let subject = self.inner.subject();
        if !self.limiter.try_acquire(subject) {
            warn!(%subject, "submission rate limit reached");
            return Err(GatewayError::RateLimited(subject.to_string()));
        }
        self.inner.submit(summary, hash).await
    }

    async fn count(&self, subject: &str) -> Result<u64, GatewayError> {
        self.inner.count(subject).await
    }

    async fn lookup(&self, subject: &str, index: u64) -> Result<LedgerRecord, GatewayError> {
        self.inner.lookup(subject, index).await
    }

    async fn gas_price(&self) -> Result<u64, GatewayError> {
        self.inner.gas_price().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use std::sync::Arc;

    #[test]
    fn limits_within_a_window_and_resets_after() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::with_clock(clock.clone(), 2, 60);
        assert!(limiter.try_acquire("a"));
        assert!(limiter.try_acquire("a"));
        assert!(!limiter.try_acquire("a"));
        assert!(limiter.try_acquire("b"));

        clock.advance(60_000);
        assert!(limiter.try_acquire("a"));
    }

    #[test]
    fn stale_windows_are_dropped() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::with_clock(clock.clone(), 1, 1);
        for i in 0..50 {
            limiter.try_acquire(&format!("key-{i}"));
        }
        assert_eq!(limiter.tracked_keys(), 50);
        clock.advance(5_000);
        limiter.try_acquire("fresh");
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn throttled_submit_is_refused_before_the_ledger() {
        let clock = Arc::new(ManualClock::new(0));
        let gw = Throttled::new(
            MemoryLedger::new("0xme"),
            RateLimiter::with_clock(clock.clone(), 1, 60),
        );
        let hash = ContentHash::of_bytes(b"x");
        gw.submit("one", &hash).await.unwrap();
        let err = gw.submit("two", &hash).await.unwrap_err();
        assert_eq!(err, GatewayError::RateLimited("0xme".into()));
        assert!(err.is_retryable());
        assert_eq!(gw.inner().submit_calls(), 1);
        assert_eq!(gw.count("0xme").await.unwrap(), 1);

        clock.advance(60_000);
        assert!(gw.submit("two", &hash).await.is_ok());
    }
}
