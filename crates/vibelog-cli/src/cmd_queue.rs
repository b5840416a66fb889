use std::path::Path;

use clap::Subcommand;
use vibelog_anchor::{connect, sync_queue};
use vibelog_core::clock::unix_to_rfc3339;
use vibelog_store::Workspace;

#[derive(Subcommand)]
pub enum QueueCmd {
    /// List queued checkpoints
    List,
    /// Drop a queued checkpoint; its logs become pending again
    Discard {
        /// Queue item id (offline-...)
        id: String,
    },
}

pub fn run(cmd: QueueCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        QueueCmd::List => list(repo_root),
        QueueCmd::Discard { id } => discard(repo_root, &id),
    }
}

/// `vibe queue list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let items = ws.queue().list()?;
    if items.is_empty() {
        println!("Offline queue is empty.");
        return Ok(());
    }
    for item in &items {
        println!(
            "{}  {:<8}  {} log(s)  retries={}  {}",
            item.id,
            item.status.to_string(),
            item.included_logs.len(),
            item.retry_count,
            unix_to_rfc3339(item.created_at),
        );
        println!("    {}", item.summary);
        if let Some(e) = &item.last_error {
            println!("    last error: {e}");
        }
    }
    Ok(())
}

/// `vibe queue discard <id>`
pub fn discard(repo_root: &Path, id: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let _lock = ws.lock()?;
    let removed = ws.queue().dequeue(id)?;
    println!(
        "Discarded {} ({} log(s) are pending again)",
        removed.id,
        removed.included_logs.len()
    );
    Ok(())
}

/// `vibe sync`
pub fn sync(repo_root: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let _lock = ws.lock()?;
    let config = ws.config()?.with_env_overrides();
    let gateway = connect(&ws, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(sync_queue(gateway.as_ref(), &ws))?;

    if report.recovered > 0 {
        println!("Recovered {} interrupted submission(s)", report.recovered);
    }
    for id in &report.synced {
        println!("Synced {id}");
    }
    if report.skipped_duplicates > 0 {
        println!(
            "Dropped {} item(s) already recorded locally",
            report.skipped_duplicates
        );
    }
    if report.rejected > 0 {
        println!(
            "{} item(s) rejected by the ledger; see `vibe queue list`",
            report.rejected
        );
    }
    if report.failed > 0 {
        println!(
            "Sync stopped after a failed attempt; {} item(s) not attempted",
            report.deferred
        );
    }
    if report.synced.is_empty() && report.failed == 0 && report.rejected == 0 {
        println!("Nothing to sync.");
    }
    Ok(())
}
