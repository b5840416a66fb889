use std::path::Path;

use vibelog_anchor::{connect, verify, VerificationReport, Verdict};
use vibelog_store::Workspace;

pub fn execute(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let config = ws.config()?.with_env_overrides();
    let checkpoints = ws.checkpoints().all()?;
    let gateway = connect(&ws, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(verify(gateway.as_ref(), &checkpoints, &config.subject))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.has_mismatch() {
        anyhow::bail!(
            "{} checkpoint(s) do not match the ledger; local history or ledger records may have been altered",
            report.count(Verdict::HashMismatch)
        );
    }
    if !report.is_confirmed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &VerificationReport) {
    if report.entries.is_empty() {
        println!("No local checkpoints to verify.");
    }
    for e in &report.entries {
        let ledger = e.ledger_hash.as_deref().unwrap_or("-");
        println!(
            "[{}] {:<16} local={} ledger={} {}",
            e.index, e.checkpoint_id, e.local_hash, ledger, e.verdict
        );
        if let Some(detail) = &e.detail {
            println!("      {detail}");
        }
    }
    println!();
    println!(
        "Local: {}  Ledger: {}  Verified: {}",
        report.local_count,
        report.ledger_count,
        report.count(Verdict::Verified)
    );
    if report.extra_on_ledger > 0 {
        println!(
            "Note: {} ledger record(s) have no local checkpoint",
            report.extra_on_ledger
        );
    }
    if report.is_confirmed() {
        println!("CONFIRMED: local history matches the ledger");
    } else {
        println!("INCOMPLETE: local history is not fully anchored");
    }
}
