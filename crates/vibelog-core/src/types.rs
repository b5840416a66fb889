use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Log id format: `log_<unix-seconds>` with an optional `_<n>` collision suffix.
pub type LogId = String;

/// Checkpoint id format: `checkpoint_<nnn>` (at least three digits).
pub type CheckpointId = String;

/// Commit this log entry was written against. Informational only; the
/// fingerprint covers `hash` and ignores `message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRef {
    pub hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Working-tree change counters attached to a log entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeStats {
    pub files_changed: u32,
    pub lines_added: u64,
    pub lines_deleted: u64,
    #[serde(default)]
    pub files: Vec<String>,
}

/// A single build-log entry (one JSON file under `.vibelog/logs/`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub id: LogId,
    pub timestamp: u64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<ChangeStats>,
}

impl LogEntry {
    /// Ordering key: creation second, then collision suffix.
    pub fn order_key(&self) -> (u64, u32) {
        (self.timestamp, log_id_suffix(&self.id))
    }
}

/// Build the id for a log created at `timestamp`; `suffix` 0 means no suffix.
pub fn log_id(timestamp: u64, suffix: u32) -> LogId {
    if suffix == 0 {
        format!("log_{timestamp}")
    } else {
        format!("log_{timestamp}_{suffix}")
    }
}

fn log_id_suffix(id: &str) -> u32 {
    id.strip_prefix("log_")
        .and_then(|rest| rest.split_once('_'))
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(0)
}

/// Caller-supplied content for a new log entry; id and timestamp are
/// assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct LogDraft {
    pub message: String,
    pub commit: Option<CommitRef>,
    pub diff: Option<ChangeStats>,
}

impl LogDraft {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_commit(mut self, commit: CommitRef) -> Self {
        self.commit = Some(commit);
        self
    }

    pub fn with_diff(mut self, diff: ChangeStats) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn into_entry(self, id: LogId, timestamp: u64) -> LogEntry {
        LogEntry {
            id,
            timestamp,
            message: self.message,
            commit: self.commit,
            diff: self.diff,
        }
    }
}

/// Confirmation data returned by the ledger for an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub tx_id: String,
    pub block_ref: u64,
    pub gas_used: u64,
    /// Fee paid, in the ledger's native unit.
    pub cost: f64,
}

/// A recorded checkpoint (one JSON file under `.vibelog/checkpoints/`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub created_at: u64,
    pub summary: String,
    pub content_hash: ContentHash,
    pub included_log_ids: Vec<LogId>,
    /// Timestamp of the last included log; the watermark moves here.
    pub batch_cutoff: u64,
    pub receipt: Receipt,
}

impl Checkpoint {
    pub fn sequence(&self) -> Option<u32> {
        checkpoint_sequence(&self.id)
    }
}

/// Build `checkpoint_<n>` zero-padded to three digits.
pub fn checkpoint_id(sequence: u32) -> CheckpointId {
    format!("checkpoint_{sequence:03}")
}

/// Parse the sequence number back out of a checkpoint id.
pub fn checkpoint_sequence(id: &str) -> Option<u32> {
    id.strip_prefix("checkpoint_")?.parse().ok()
}

/// Lifecycle of an offline-queue item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Enqueued, never attempted (or recovered after an interrupted attempt).
    Pending,
    /// A submission is in flight.
    Syncing,
    /// Last attempt failed with a retryable error.
    Failed,
    /// The ledger refused the payload; retrying cannot succeed.
    Rejected,
}

impl QueueStatus {
    /// Whether `sync` should attempt this item.
    pub fn is_replayable(self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::Failed)
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Pending => write!(f, "pending"),
            QueueStatus::Syncing => write!(f, "syncing"),
            QueueStatus::Failed => write!(f, "failed"),
            QueueStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A checkpoint whose ledger submission has not succeeded yet. Holds the
/// full log entries so the batch can be re-hashed and resubmitted later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedCheckpoint {
    pub id: String,
    pub created_at: u64,
    pub summary: String,
    pub included_logs: Vec<LogEntry>,
    pub status: QueueStatus,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedCheckpoint {
    pub fn log_ids(&self) -> Vec<LogId> {
        self.included_logs.iter().map(|l| l.id.clone()).collect()
    }
}

/// Aggregate figures over a batch of logs, for previews and status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub count: usize,
    pub first_timestamp: Option<u64>,
    pub last_timestamp: Option<u64>,
    pub span_secs: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

impl BatchStats {
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let first = entries.first().map(|e| e.timestamp);
        let last = entries.last().map(|e| e.timestamp);
        let (lines_added, lines_deleted) = entries
            .iter()
            .filter_map(|e| e.diff.as_ref())
            .fold((0, 0), |(a, d), s| (a + s.lines_added, d + s.lines_deleted));
        Self {
            count: entries.len(),
            first_timestamp: first,
            last_timestamp: last,
            span_secs: match (first, last) {
                (Some(f), Some(l)) => l.saturating_sub(f),
                _ => 0,
            },
            lines_added,
            lines_deleted,
        }
    }

    /// Span rendered as `1h 5m` / `12m`.
    pub fn span_display(&self) -> String {
        let minutes = (self.span_secs + 30) / 60;
        let (h, m) = (minutes / 60, minutes % 60);
        if h > 0 {
            format!("{h}h {m}m")
        } else {
            format!("{m}m")
        }
    }
}
