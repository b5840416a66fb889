use std::path::Path;

use vibelog_core::clock::unix_to_rfc3339;
use vibelog_core::BatchStats;
use vibelog_store::Workspace;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let config = ws.config()?.with_env_overrides();
    let pending = ws.pending_logs()?;
    let queue = ws.queue().list()?;

    println!("Subject: {} ({})", config.subject, config.network);
    match config.last_checkpoint {
        Some(ts) => println!("Watermark: {}", unix_to_rfc3339(ts)),
        None => println!("Watermark: (no checkpoints yet)"),
    }
    match ws.checkpoints().latest()? {
        Some(cp) => println!(
            "Last checkpoint: {} {} \"{}\"",
            cp.id, cp.content_hash.short(), cp.summary
        ),
        None => println!("Last checkpoint: (none)"),
    }

    let stats = BatchStats::from_entries(&pending);
    if stats.count > 0 {
        println!(
            "Pending logs: {} over {} (+{} -{} lines)",
            stats.count,
            stats.span_display(),
            stats.lines_added,
            stats.lines_deleted
        );
    } else {
        println!("Pending logs: 0");
    }

    let replayable = queue.iter().filter(|q| q.status.is_replayable()).count();
    println!(
        "Offline queue: {} item(s), {replayable} awaiting sync",
        queue.len()
    );
    println!(
        "Totals: {} logs, {} checkpoints, {} gas, {:.6} spent",
        config.stats.total_logs,
        config.stats.total_checkpoints,
        config.stats.total_gas_used,
        config.stats.total_cost
    );
    Ok(())
}
