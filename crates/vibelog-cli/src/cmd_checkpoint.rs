use std::path::Path;
use std::time::Duration;

use vibelog_anchor::{
    anchor, connect, ensure_no_backlog, prepare, CheckpointOptions, CheckpointOutcome,
    FailurePolicy, FeeWait,
};
use vibelog_chain::estimate_or_default;
use vibelog_chain::fee::{format_gwei, recommend, GWEI};
use vibelog_store::Workspace;

pub struct CheckpointParams<'a> {
    pub repo_root: &'a Path,
    pub summary: &'a str,
    pub offline: bool,
    pub abort_on_failure: bool,
    pub max_gas_gwei: Option<u64>,
    pub wait_secs: Option<u64>,
}

const FEE_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub fn execute(p: CheckpointParams<'_>) -> anyhow::Result<()> {
    let ws = Workspace::open(p.repo_root)?;
    let _lock = ws.lock()?;
    let config = ws.config()?.with_env_overrides();

    ensure_no_backlog(&ws)?;
    let Some(prepared) = prepare(&ws, p.summary)? else {
        println!("No pending logs since the last checkpoint. Nothing to do.");
        return Ok(());
    };

    let stats = &prepared.stats;
    println!("Batch: {} log(s) over {}", stats.count, stats.span_display());
    if stats.lines_added > 0 || stats.lines_deleted > 0 {
        println!("  +{} -{} lines", stats.lines_added, stats.lines_deleted);
    }
    println!("  hash: {}", prepared.hash);
    println!("  summary: {}", prepared.summary.text);
    if prepared.summary.redacted {
        println!("  note: sensitive tokens were redacted from the summary");
    }

    let max_gwei = p.max_gas_gwei.or(config.fee.max_gas_price_gwei);
    let options = CheckpointOptions {
        policy: if p.abort_on_failure {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Queue
        },
        offline: p.offline,
        fee_wait: max_gwei.map(|gwei| FeeWait {
            max_price_wei: gwei.saturating_mul(GWEI),
            timeout: Duration::from_secs(p.wait_secs.unwrap_or(config.fee.wait_timeout_secs)),
            interval: FEE_POLL_INTERVAL,
        }),
    };

    let gateway = connect(&ws, &config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        if !options.offline {
            let gas = estimate_or_default(gateway.as_ref(), &prepared.summary.text, &prepared.hash).await;
            if let Ok(price) = gateway.gas_price().await {
                println!(
                    "  estimated gas: {gas} at {} ({} fees)",
                    format_gwei(price),
                    recommend(price)
                );
            }
        }
        anchor(gateway.as_ref(), &ws, prepared, &options).await
    })?;

    match outcome {
        CheckpointOutcome::Recorded(cp) => {
            println!("Checkpoint {} anchored", cp.id);
            println!("  tx: {}", cp.receipt.tx_id);
            println!("  block: {}", cp.receipt.block_ref);
            println!("  cost: {:.6}", cp.receipt.cost);
        }
        CheckpointOutcome::Queued { queue_id, reason } => {
            match reason {
                Some(e) => println!("Submission failed ({e}); queued as {queue_id}"),
                None => println!("Queued as {queue_id}"),
            }
            println!("Run `vibe sync` to submit it later.");
        }
        CheckpointOutcome::NothingPending => {
            println!("No pending logs since the last checkpoint. Nothing to do.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibelog_core::LogDraft;

    fn params(root: &Path) -> CheckpointParams<'_> {
        CheckpointParams {
            repo_root: root,
            summary: "first batch",
            offline: false,
            abort_on_failure: false,
            max_gas_gwei: None,
            wait_secs: None,
        }
    }

    #[test]
    fn checkpoint_against_local_ledger() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), "0xme", "local").unwrap();
        ws.logs().append_at(LogDraft::new("a"), 100).unwrap();
        execute(params(tmp.path())).unwrap();

        let ws = Workspace::open(tmp.path()).unwrap();
        assert_eq!(ws.checkpoints().count().unwrap(), 1);
        assert_eq!(ws.watermark().unwrap(), 100);
        assert!(ws.paths.local_ledger_json.exists());

        // Nothing pending: a no-op, not an error.
        execute(params(tmp.path())).unwrap();
        assert_eq!(ws.checkpoints().count().unwrap(), 1);
    }

    #[test]
    fn offline_checkpoint_blocks_the_next_one() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), "0xme", "local").unwrap();
        ws.logs().append_at(LogDraft::new("a"), 100).unwrap();
        execute(CheckpointParams {
            offline: true,
            ..params(tmp.path())
        })
        .unwrap();
        assert_eq!(ws.queue().pending_count().unwrap(), 1);
        assert!(execute(params(tmp.path())).is_err());
    }
}
