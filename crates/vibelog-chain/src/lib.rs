pub mod error;
pub mod fee;
pub mod file;
pub mod gateway;
pub mod memory;
pub mod rate_limit;

pub use error::GatewayError;
pub use file::FileLedger;
pub use gateway::{estimate_or_default, validate_attestation, LedgerGateway, LedgerRecord};
pub use memory::MemoryLedger;
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock, Throttled};
