use vibelog_anchor::{
    create_checkpoint, sync_queue, verify, Aggregate, CheckpointOptions, CheckpointOutcome, Verdict,
};
use vibelog_chain::{FileLedger, GatewayError, LedgerGateway, MemoryLedger};
use vibelog_core::{fingerprint, ContentHash, LogDraft, QueueStatus};
use vibelog_store::Workspace;

fn workspace() -> (tempfile::TempDir, Workspace) {
    let tmp = tempfile::tempdir().unwrap();
    let ws = Workspace::init(tmp.path(), "0xbuilder", "local").unwrap();
    (tmp, ws)
}

#[tokio::test]
async fn watermark_moves_to_last_log_of_the_batch() {
    let (_tmp, ws) = workspace();
    ws.logs().append_at(LogDraft::new("a"), 100).unwrap();
    ws.logs().append_at(LogDraft::new("b"), 200).unwrap();
    let ledger = MemoryLedger::new("0xbuilder");

    let out = create_checkpoint(&ledger, &ws, "both", &CheckpointOptions::default())
        .await
        .unwrap();
    let CheckpointOutcome::Recorded(cp) = out else {
        panic!("expected a recorded checkpoint");
    };
    assert_eq!(cp.included_log_ids, ["log_100", "log_200"]);
    assert_eq!(ws.watermark().unwrap(), 200);

    let late = ws.logs().append_at(LogDraft::new("c"), 250).unwrap();
    assert_eq!(ws.logs().since(200).unwrap(), vec![late]);
}

#[tokio::test]
async fn no_log_is_attested_twice_across_checkpoints() {
    let (_tmp, ws) = workspace();
    let ledger = MemoryLedger::new("0xbuilder");
    let mut seen = Vec::new();
    for round in 0..3u64 {
        for i in 0..2 {
            ws.logs()
                .append_at(LogDraft::new(format!("r{round} #{i}")), 100 * (round + 1) + i)
                .unwrap();
        }
        let out = create_checkpoint(&ledger, &ws, "round", &CheckpointOptions::default())
            .await
            .unwrap();
        let CheckpointOutcome::Recorded(cp) = out else {
            panic!("expected a recorded checkpoint");
        };
        for id in &cp.included_log_ids {
            assert!(!seen.contains(id), "{id} attested twice");
        }
        seen.extend(cp.included_log_ids);
    }
    assert_eq!(seen.len(), 6);
    assert!(ws.pending_logs().unwrap().is_empty());
}

#[tokio::test]
async fn ledger_shorter_than_local_history_is_incomplete() {
    let (_tmp, ws) = workspace();
    let ledger = MemoryLedger::new("0xbuilder");
    for ts in [100, 200] {
        ws.logs().append_at(LogDraft::new("x"), ts).unwrap();
        create_checkpoint(&ledger, &ws, "work", &CheckpointOptions::default())
            .await
            .unwrap();
    }
    let local = ws.checkpoints().all().unwrap();
    assert_eq!(local.len(), 2);

    // A fresh ledger that only ever saw the first attestation.
    let partial = MemoryLedger::new("0xbuilder");
    partial.push_record("0xbuilder", local[0].content_hash.as_str(), "work");

    let report = verify(&partial, &local, "0xbuilder").await.unwrap();
    assert_eq!(report.ledger_count, 1);
    assert_eq!(report.entries[0].verdict, Verdict::Verified);
    assert_eq!(report.entries[1].verdict, Verdict::NotFound);
    assert_eq!(report.aggregate, Aggregate::Incomplete);
}

#[tokio::test]
async fn flipped_local_hash_is_reported_at_its_index() {
    let (_tmp, ws) = workspace();
    let ledger = MemoryLedger::new("0xbuilder");
    for ts in [100, 200, 300] {
        ws.logs().append_at(LogDraft::new("x"), ts).unwrap();
        create_checkpoint(&ledger, &ws, "work", &CheckpointOptions::default())
            .await
            .unwrap();
    }
    let mut local = ws.checkpoints().all().unwrap();
    assert!(verify(&ledger, &local, "0xbuilder").await.unwrap().is_confirmed());

    let mut bytes = local[1].content_hash.to_bytes();
    bytes[0] ^= 0x01;
    local[1].content_hash = ContentHash::parse(&format!("0x{}", hex::encode(bytes))).unwrap();

    let report = verify(&ledger, &local, "0xbuilder").await.unwrap();
    assert_eq!(report.entries[1].verdict, Verdict::HashMismatch);
    assert_eq!(report.count(Verdict::Verified), 2);
    assert_eq!(report.aggregate, Aggregate::Incomplete);
}

#[tokio::test]
async fn network_failure_queues_then_a_failed_retry_counts_once() {
    let (_tmp, ws) = workspace();
    ws.logs().append_at(LogDraft::new("a"), 100).unwrap();
    let ledger = MemoryLedger::new("0xbuilder");
    ledger.fail_next_submit(GatewayError::Network("connection refused".into()));

    let out = create_checkpoint(&ledger, &ws, "offline", &CheckpointOptions::default())
        .await
        .unwrap();
    let CheckpointOutcome::Queued { queue_id, .. } = out else {
        panic!("expected the batch to be queued");
    };
    let item = ws.queue().get(&queue_id).unwrap().unwrap();
    assert_eq!(item.status, QueueStatus::Pending);
    assert_eq!(item.retry_count, 0);

    ledger.fail_next_submit(GatewayError::Network("still offline".into()));
    sync_queue(&ledger, &ws).await.unwrap();
    let item = ws.queue().get(&queue_id).unwrap().unwrap();
    assert_eq!(item.status, QueueStatus::Failed);
    assert_eq!(item.retry_count, 1);
    assert_eq!(item.last_error.as_deref(), Some("network error: still offline"));

    let report = sync_queue(&ledger, &ws).await.unwrap();
    assert_eq!(report.synced.len(), 1);
    assert!(ws.queue().get(&queue_id).unwrap().is_none());
    assert!(ws.pending_logs().unwrap().is_empty());
    assert!(verify(&ledger, &ws.checkpoints().all().unwrap(), "0xbuilder")
        .await
        .unwrap()
        .is_confirmed());
}

#[tokio::test]
async fn queued_batch_hashes_identically_after_replay() {
    let (_tmp, ws) = workspace();
    ws.logs().append_at(LogDraft::new("a"), 100).unwrap();
    let expected = fingerprint(&ws.pending_logs().unwrap());
    let ledger = MemoryLedger::new("0xbuilder");
    let opts = CheckpointOptions {
        offline: true,
        ..Default::default()
    };
    create_checkpoint(&ledger, &ws, "later", &opts).await.unwrap();
    sync_queue(&ledger, &ws).await.unwrap();
    assert_eq!(ledger.records("0xbuilder")[0].hash, expected.as_str());
}

#[tokio::test]
async fn log_written_while_a_batch_is_queued_is_attested_later() {
    let (_tmp, ws) = workspace();
    let ledger = MemoryLedger::new("0xbuilder");
    // Queued batch ends at a second the clock has not reached yet.
    let t = vibelog_core::clock::now_unix() + 10_000;
    let a = ws.logs().append_at(LogDraft::new("a"), t).unwrap();
    let opts = CheckpointOptions {
        offline: true,
        ..Default::default()
    };
    create_checkpoint(&ledger, &ws, "offline", &opts).await.unwrap();

    let b = ws.logs().append(LogDraft::new("b")).unwrap();
    assert!(b.timestamp > a.timestamp);

    let report = sync_queue(&ledger, &ws).await.unwrap();
    assert_eq!(report.synced.len(), 1);
    assert_eq!(ws.watermark().unwrap(), t);
    assert_eq!(ws.pending_logs().unwrap(), vec![b.clone()]);

    let out = create_checkpoint(&ledger, &ws, "catch up", &CheckpointOptions::default())
        .await
        .unwrap();
    let CheckpointOutcome::Recorded(cp) = out else {
        panic!("expected a recorded checkpoint");
    };
    assert_eq!(cp.included_log_ids, [b.id]);
    let attested: Vec<_> = ws
        .checkpoints()
        .all()
        .unwrap()
        .into_iter()
        .flat_map(|cp| cp.included_log_ids)
        .collect();
    assert_eq!(attested, [a.id, cp.included_log_ids[0].clone()]);
}

#[tokio::test]
async fn local_file_ledger_round_trip() {
    let (_tmp, ws) = workspace();
    let ledger = FileLedger::new(&ws.paths.local_ledger_json, "0xbuilder");
    ws.logs().append_at(LogDraft::new("a"), 100).unwrap();
    create_checkpoint(&ledger, &ws, "work", &CheckpointOptions::default())
        .await
        .unwrap();
    assert_eq!(ledger.count("0xbuilder").await.unwrap(), 1);

    // Reopen everything from disk.
    let ws = Workspace::open(&ws.paths.root).unwrap();
    let ledger = FileLedger::new(&ws.paths.local_ledger_json, "0xbuilder");
    let report = verify(&ledger, &ws.checkpoints().all().unwrap(), "0xbuilder")
        .await
        .unwrap();
    assert!(report.is_confirmed());
}
