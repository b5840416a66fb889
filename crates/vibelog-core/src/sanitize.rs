use regex::Regex;
use std::sync::OnceLock;

/// Longest summary the ledger accepts, in characters.
pub const MAX_SUMMARY_CHARS: usize = 200;

pub const REDACTED: &str = "[REDACTED]";

/// Summary text after redaction and length capping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    /// True when at least one sensitive token was replaced.
    pub redacted: bool,
}

fn sensitive_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"sk_[a-zA-Z0-9_]{20,}",
            r"pk_[a-zA-Z0-9_]{20,}",
            r"[\w.-]+@[\w.-]+\.\w+",
            r"0x[a-fA-F0-9]{64}",
            r"ghp_[a-zA-Z0-9]{36}",
            r"AIza[a-zA-Z0-9_-]{35}",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static redaction pattern must compile"))
        .collect()
    })
}

/// Redact secrets and personal data from a summary that is about to be
/// published, then cap it at `MAX_SUMMARY_CHARS`.
pub fn sanitize_summary(input: &str) -> Sanitized {
    let mut text = input.trim().to_string();
    let mut redacted = false;
    for pattern in sensitive_patterns() {
        let replaced = pattern.replace_all(&text, REDACTED);
        if replaced != text {
            redacted = true;
            text = replaced.into_owned();
        }
    }
    if text.chars().count() > MAX_SUMMARY_CHARS {
        text = text.chars().take(MAX_SUMMARY_CHARS).collect();
    }
    Sanitized { text, redacted }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_passes_through() {
        let s = sanitize_summary("  Implemented the login flow  ");
        assert_eq!(s.text, "Implemented the login flow");
        assert!(!s.redacted);
    }

    #[test]
    fn api_keys_are_redacted() {
        let s = sanitize_summary("key sk_live_abcdefghijklmnopqrstuv leaked");
        assert_eq!(s.text, "key [REDACTED] leaked");
        assert!(s.redacted);

        let token = format!("ghp_{}", "a".repeat(36));
        let s = sanitize_summary(&format!("token {token}"));
        assert_eq!(s.text, "token [REDACTED]");
    }

    #[test]
    fn emails_and_long_hex_are_redacted() {
        let s = sanitize_summary("ping dev@example.com about 0x");
        assert_eq!(s.text, "ping [REDACTED] about 0x");
        let key = format!("0x{}", "ab".repeat(32));
        let s = sanitize_summary(&format!("pk {key}"));
        assert_eq!(s.text, "pk [REDACTED]");
        assert!(s.redacted);
    }

    #[test]
    fn capped_at_max_chars() {
        let s = sanitize_summary(&"é".repeat(300));
        assert_eq!(s.text.chars().count(), MAX_SUMMARY_CHARS);
        assert!(!s.redacted);
    }
}
