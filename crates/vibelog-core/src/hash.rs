use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content hash {0:?}: expected 0x followed by 64 hex characters")]
pub struct HashParseError(pub String);

/// A 256-bit content fingerprint in its conventional text form: `0x` + 64 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Number of characters shown in diagnostic prefixes (`0x` + 16 hex).
    pub const SHORT_LEN: usize = 18;

    /// Hash arbitrary bytes with SHA-256.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", sha256_hex(bytes)))
    }

    /// Accepts either case and either prefix spelling; stores `0x` plus
    /// lowercase hex.
    pub fn parse(s: &str) -> Result<Self, HashParseError> {
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| HashParseError(s.to_string()))?;
        if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashParseError(s.to_string()));
        }
        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The all-zero digest, which the ledger refuses to anchor.
    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    /// Leading characters for display.
    pub fn short(&self) -> &str {
        &self.0[..Self::SHORT_LEN]
    }

    /// Case-insensitive exact comparison against a ledger-reported hash.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    /// Raw 32 bytes of the digest.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Validated on construction.
        if let Ok(decoded) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&decoded);
        }
        out
    }
}

impl TryFrom<String> for ContentHash {
    type Error = HashParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// First `ContentHash::SHORT_LEN` characters of any hash-like string.
pub fn short_prefix(s: &str) -> String {
    s.chars().take(ContentHash::SHORT_LEN).collect()
}
