//! Content fingerprint over an ordered batch of log entries.
//!
//! Each entry is projected onto `{id, timestamp, message, commit, diff}`,
//! where `commit` is the commit hash alone. Fields outside the projection
//! (commit messages, anything added later) never affect the digest. The
//! projections are serialized as compact JSON in declaration order and
//! hashed with SHA-256.

use serde::Serialize;

use crate::hash::ContentHash;
use crate::types::LogEntry;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffProjection<'a> {
    files_changed: u32,
    lines_added: u64,
    lines_deleted: u64,
    files: &'a [String],
}

#[derive(Serialize)]
struct EntryProjection<'a> {
    id: &'a str,
    timestamp: u64,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<DiffProjection<'a>>,
}

impl<'a> From<&'a LogEntry> for EntryProjection<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        Self {
            id: &entry.id,
            timestamp: entry.timestamp,
            message: &entry.message,
            commit: entry.commit.as_ref().map(|c| c.hash.as_str()),
            diff: entry.diff.as_ref().map(|d| DiffProjection {
                files_changed: d.files_changed,
                lines_added: d.lines_added,
                lines_deleted: d.lines_deleted,
                files: &d.files,
            }),
        }
    }
}

/// Serialized form that the fingerprint is computed over.
pub fn canonical_batch_bytes(entries: &[LogEntry]) -> Vec<u8> {
    let projections: Vec<EntryProjection<'_>> = entries.iter().map(Into::into).collect();
    serde_json::to_vec(&projections).expect("batch projection serialization should not fail")
}

/// Deterministic digest of an ordered batch.
pub fn fingerprint(entries: &[LogEntry]) -> ContentHash {
    ContentHash::of_bytes(&canonical_batch_bytes(entries))
}
