pub mod clock;
pub mod fingerprint;
pub mod hash;
pub mod sanitize;
pub mod types;

pub use fingerprint::fingerprint;
pub use hash::{ContentHash, HashParseError};
pub use types::*;
