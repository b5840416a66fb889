use std::fmt;

use serde::Serialize;
use tracing::warn;
use vibelog_chain::{GatewayError, LedgerGateway};
use vibelog_core::hash::short_prefix;
use vibelog_core::{Checkpoint, CheckpointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Verified,
    HashMismatch,
    /// The ledger holds fewer records than this index.
    NotFound,
    /// The record may exist but could not be read.
    VerificationError,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Verified => "VERIFIED",
            Verdict::HashMismatch => "HASH_MISMATCH",
            Verdict::NotFound => "NOT_FOUND",
            Verdict::VerificationError => "VERIFICATION_ERROR",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregate {
    Confirmed,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationEntry {
    pub index: u64,
    pub checkpoint_id: CheckpointId,
    pub local_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_hash: Option<String>,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-checkpoint comparison of local history against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub subject: String,
    pub local_count: u64,
    pub ledger_count: u64,
    /// Ledger records past the last local checkpoint. Informational.
    pub extra_on_ledger: u64,
    pub entries: Vec<VerificationEntry>,
    pub aggregate: Aggregate,
}

impl VerificationReport {
    pub fn is_confirmed(&self) -> bool {
        self.aggregate == Aggregate::Confirmed
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.entries.iter().filter(|e| e.verdict == verdict).count()
    }

    pub fn has_mismatch(&self) -> bool {
        self.count(Verdict::HashMismatch) > 0
    }
}

/// Compare `checkpoints` (in recorded order) with the ledger records for
/// `subject`. Read-only on both sides. Fails only when the ledger count
/// cannot be read.
pub async fn verify(
    gateway: &dyn LedgerGateway,
    checkpoints: &[Checkpoint],
    subject: &str,
) -> Result<VerificationReport, GatewayError> {
    let ledger_count = gateway.count(subject).await?;
    let mut entries = Vec::with_capacity(checkpoints.len());

    for (i, checkpoint) in checkpoints.iter().enumerate() {
        let index = i as u64;
        let mut entry = VerificationEntry {
            index,
            checkpoint_id: checkpoint.id.clone(),
            local_hash: checkpoint.content_hash.short().to_string(),
            ledger_hash: None,
            verdict: Verdict::NotFound,
            detail: None,
        };
        if index < ledger_count {
            match gateway.lookup(subject, index).await {
                Ok(record) => {
                    entry.ledger_hash = Some(short_prefix(&record.hash));
                    entry.verdict = if checkpoint.content_hash.matches(&record.hash) {
                        Verdict::Verified
                    } else {
                        warn!(
                            checkpoint = %checkpoint.id,
                            index,
                            local = %checkpoint.content_hash,
                            ledger = %record.hash,
                            "hash mismatch between local checkpoint and ledger"
                        );
                        Verdict::HashMismatch
                    };
                }
                Err(e) => {
                    entry.verdict = Verdict::VerificationError;
                    entry.detail = Some(e.to_string());
                }
            }
        }
        entries.push(entry);
    }

    let aggregate = if entries.iter().all(|e| e.verdict == Verdict::Verified) {
        Aggregate::Confirmed
    } else {
        Aggregate::Incomplete
    };
    let local_count = checkpoints.len() as u64;
    Ok(VerificationReport {
        subject: subject.to_string(),
        local_count,
        ledger_count,
        extra_on_ledger: ledger_count.saturating_sub(local_count),
        entries,
        aggregate,
    })
}
