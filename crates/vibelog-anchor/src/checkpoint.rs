use std::time::Duration;

use tracing::{info, warn};
use vibelog_chain::fee::wait_for_fee_window;
use vibelog_chain::{validate_attestation, GatewayError, LedgerGateway};
use vibelog_core::sanitize::{sanitize_summary, Sanitized};
use vibelog_core::{fingerprint, BatchStats, Checkpoint, ContentHash, LogEntry, LogId, Receipt};
use vibelog_store::Workspace;

use crate::error::AnchorError;

/// A batch of pending logs ready to be attested.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub logs: Vec<LogEntry>,
    pub summary: Sanitized,
    pub hash: ContentHash,
    pub stats: BatchStats,
}

impl Prepared {
    pub fn log_ids(&self) -> Vec<LogId> {
        self.logs.iter().map(|l| l.id.clone()).collect()
    }

    /// Timestamp of the newest log in the batch.
    pub fn cutoff(&self) -> u64 {
        self.logs.last().map_or(0, |l| l.timestamp)
    }
}

/// What to do when the ledger refuses or cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Queue,
    Abort,
}

/// Bounded wait for a cheaper fee window before submitting.
#[derive(Debug, Clone)]
pub struct FeeWait {
    pub max_price_wei: u64,
    pub timeout: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CheckpointOptions {
    pub policy: FailurePolicy,
    /// Queue the batch without contacting the ledger.
    pub offline: bool,
    pub fee_wait: Option<FeeWait>,
}

#[derive(Debug)]
pub enum CheckpointOutcome {
    Recorded(Checkpoint),
    /// Held in the offline queue. `reason` is `None` for offline mode.
    Queued {
        queue_id: String,
        reason: Option<GatewayError>,
    },
    NothingPending,
}

/// Refuse to start a new batch while earlier batches wait for replay.
pub fn ensure_no_backlog(ws: &Workspace) -> Result<(), AnchorError> {
    let count = ws.queue().pending_count()?;
    if count > 0 {
        return Err(AnchorError::QueueBacklog { count });
    }
    Ok(())
}

/// Select the pending logs and fingerprint them. `None` when nothing is
/// pending.
pub fn prepare(ws: &Workspace, summary: &str) -> Result<Option<Prepared>, AnchorError> {
    let logs = ws.pending_logs()?;
    if logs.is_empty() {
        return Ok(None);
    }
    Ok(Some(Prepared {
        hash: fingerprint(&logs),
        stats: BatchStats::from_entries(&logs),
        summary: sanitize_summary(summary),
        logs,
    }))
}

/// Record a checkpoint for an accepted submission.
pub(crate) fn record_receipt(
    ws: &Workspace,
    summary: &str,
    hash: ContentHash,
    logs: &[LogEntry],
    receipt: Receipt,
) -> Result<Checkpoint, AnchorError> {
    let checkpoint = Checkpoint {
        id: ws.checkpoints().next_id()?,
        created_at: vibelog_core::clock::now_unix(),
        summary: summary.to_string(),
        content_hash: hash,
        included_log_ids: logs.iter().map(|l| l.id.clone()).collect(),
        batch_cutoff: logs.last().map_or(0, |l| l.timestamp),
        receipt,
    };
    ws.checkpoints().record(&checkpoint)?;
    Ok(checkpoint)
}

/// Submit a prepared batch and record the result.
pub async fn anchor(
    gateway: &dyn LedgerGateway,
    ws: &Workspace,
    prepared: Prepared,
    options: &CheckpointOptions,
) -> Result<CheckpointOutcome, AnchorError> {
    validate_attestation(&prepared.summary.text, &prepared.hash)?;

    if options.offline {
        let queue_id = ws.queue().enqueue(&prepared.summary.text, prepared.logs)?;
        return Ok(CheckpointOutcome::Queued {
            queue_id,
            reason: None,
        });
    }

    if let Some(fee) = &options.fee_wait {
        if !wait_for_fee_window(gateway, fee.max_price_wei, fee.timeout, fee.interval).await {
            warn!(
                max_price_wei = fee.max_price_wei,
                "fee window not reached before timeout; submitting at current price"
            );
        }
    }

    match gateway.submit(&prepared.summary.text, &prepared.hash).await {
        Ok(receipt) => {
            let checkpoint = record_receipt(
                ws,
                &prepared.summary.text,
                prepared.hash,
                &prepared.logs,
                receipt,
            )?;
            info!(id = %checkpoint.id, tx = %checkpoint.receipt.tx_id, "checkpoint anchored");
            Ok(CheckpointOutcome::Recorded(checkpoint))
        }
        Err(e) if options.policy == FailurePolicy::Queue && e.is_retryable() => {
            warn!(error = %e, "submission failed; queueing checkpoint");
            let queue_id = ws.queue().enqueue(&prepared.summary.text, prepared.logs)?;
            Ok(CheckpointOutcome::Queued {
                queue_id,
                reason: Some(e),
            })
        }
        Err(e) => Err(AnchorError::Submission(e)),
    }
}

/// Full checkpoint flow: backlog check, batch selection, submission.
pub async fn create_checkpoint(
    gateway: &dyn LedgerGateway,
    ws: &Workspace,
    summary: &str,
    options: &CheckpointOptions,
) -> Result<CheckpointOutcome, AnchorError> {
    ensure_no_backlog(ws)?;
    match prepare(ws, summary)? {
        Some(prepared) => anchor(gateway, ws, prepared, options).await,
        None => Ok(CheckpointOutcome::NothingPending),
    }
}
