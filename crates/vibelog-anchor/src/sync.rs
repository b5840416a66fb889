use tracing::{info, warn};
use vibelog_chain::LedgerGateway;
use vibelog_core::{fingerprint, CheckpointId};
use vibelog_store::Workspace;

use crate::checkpoint::record_receipt;
use crate::error::AnchorError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items found in `syncing` from an interrupted run.
    pub recovered: usize,
    pub synced: Vec<CheckpointId>,
    pub failed: usize,
    pub rejected: usize,
    /// Items already recorded locally; dequeued without resubmitting.
    pub skipped_duplicates: usize,
    /// Items left untouched after a retryable failure stopped the run.
    pub deferred: usize,
}

/// Replay the offline queue, oldest first, one submission at a time.
///
/// A retryable failure stops the run so later items are not submitted
/// ahead of an earlier one. A permanent failure moves the item to
/// `rejected` and the run continues.
pub async fn sync_queue(gateway: &dyn LedgerGateway, ws: &Workspace) -> Result<SyncReport, AnchorError> {
    let queue = ws.queue();
    let mut report = SyncReport {
        recovered: queue.recover_interrupted()?,
        ..Default::default()
    };

    let items = queue.list_pending()?;
    let total = items.len();
    for (pos, item) in items.into_iter().enumerate() {
        let hash = fingerprint(&item.included_logs);
        if let Some(existing) = ws.checkpoints().find_batch(&hash, &item.log_ids())? {
            info!(id = %item.id, checkpoint = %existing.id, "queued batch already recorded; dropping");
            queue.dequeue(&item.id)?;
            report.skipped_duplicates += 1;
            continue;
        }

        queue.mark_syncing(&item.id)?;
        match gateway.submit(&item.summary, &hash).await {
            Ok(receipt) => {
                let checkpoint =
                    record_receipt(ws, &item.summary, hash, &item.included_logs, receipt)?;
                queue.dequeue(&item.id)?;
                info!(id = %item.id, checkpoint = %checkpoint.id, "queued checkpoint synced");
                report.synced.push(checkpoint.id);
            }
            Err(e) if e.is_retryable() => {
                warn!(id = %item.id, error = %e, "sync attempt failed");
                queue.mark_failed(&item.id, &e.to_string())?;
                report.failed += 1;
                report.deferred = total - pos - 1;
                break;
            }
            Err(e) => {
                warn!(id = %item.id, error = %e, "ledger rejected queued checkpoint");
                queue.mark_rejected(&item.id, &e.to_string())?;
                report.rejected += 1;
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibelog_chain::{GatewayError, MemoryLedger};
    use vibelog_core::{LogDraft, QueueStatus};

    fn setup() -> (tempfile::TempDir, Workspace) {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), "0xme", "local").unwrap();
        (tmp, ws)
    }

    fn queue_batch(ws: &Workspace, summary: &str, ts: &[u64]) -> String {
        let logs: Vec<_> = ts
            .iter()
            .map(|t| ws.logs().append_at(LogDraft::new(format!("at {t}")), *t).unwrap())
            .collect();
        ws.queue().enqueue(summary, logs).unwrap()
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let (_tmp, ws) = setup();
        let ledger = MemoryLedger::new("0xme");
        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn success_records_checkpoint_and_dequeues() {
        let (_tmp, ws) = setup();
        queue_batch(&ws, "offline work", &[100, 200]);
        let ledger = MemoryLedger::new("0xme");

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report.synced, ["checkpoint_001"]);
        assert!(ws.queue().list().unwrap().is_empty());
        assert_eq!(ws.watermark().unwrap(), 200);
        let cp = ws.checkpoints().latest().unwrap().unwrap();
        assert_eq!(cp.included_log_ids, ["log_100", "log_200"]);
        assert_eq!(ledger.records("0xme")[0].hash, cp.content_hash.as_str());
    }

    #[tokio::test]
    async fn retryable_failure_marks_failed_and_stops() {
        let (_tmp, ws) = setup();
        let first = queue_batch(&ws, "first", &[100]);
        queue_batch(&ws, "second", &[200]);
        let ledger = MemoryLedger::new("0xme");
        ledger.fail_next_submit(GatewayError::Network("down".into()));

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.deferred, 1);
        assert_eq!(ledger.submit_calls(), 1);
        let item = ws.queue().get(&first).unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
        assert_eq!(item.retry_count, 1);

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report.synced.len(), 2);
        assert!(ws.queue().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn permanent_failure_is_rejected_and_not_retried() {
        let (_tmp, ws) = setup();
        let id = queue_batch(&ws, "bad", &[100]);
        let ledger = MemoryLedger::new("0xme");
        ledger.fail_next_submit(GatewayError::Rejected("summary too long".into()));

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report.rejected, 1);
        let item = ws.queue().get(&id).unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Rejected);

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(ledger.submit_calls(), 1);
    }

    #[tokio::test]
    async fn interrupted_item_is_recovered_and_retried() {
        let (_tmp, ws) = setup();
        let id = queue_batch(&ws, "work", &[100]);
        ws.queue().mark_syncing(&id).unwrap();
        let ledger = MemoryLedger::new("0xme");

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report.recovered, 1);
        assert_eq!(report.synced.len(), 1);
    }

    #[tokio::test]
    async fn already_recorded_batch_is_not_resubmitted() {
        let (_tmp, ws) = setup();
        let id = queue_batch(&ws, "work", &[100]);
        let item = ws.queue().get(&id).unwrap().unwrap();
        let ledger = MemoryLedger::new("0xme");
        // Crash after recording, before dequeue.
        let receipt = ledger
            .submit(&item.summary, &fingerprint(&item.included_logs))
            .await
            .unwrap();
        record_receipt(
            &ws,
            &item.summary,
            fingerprint(&item.included_logs),
            &item.included_logs,
            receipt,
        )
        .unwrap();

        let report = sync_queue(&ledger, &ws).await.unwrap();
        assert_eq!(report.skipped_duplicates, 1);
        assert!(report.synced.is_empty());
        assert_eq!(ledger.submit_calls(), 1);
        assert!(ws.queue().list().unwrap().is_empty());
    }
}
