use std::path::Path;

use vibelog_store::config::LOCAL_NETWORK;
use vibelog_store::{VibelogPaths, Workspace};

/// Subject used by the local ledger when none is given.
const DEFAULT_LOCAL_SUBJECT: &str = "local-builder";

pub fn execute(repo_root: &Path, subject: Option<&str>, network: &str) -> anyhow::Result<()> {
    let paths = VibelogPaths::discover(repo_root);
    if paths.is_initialized() {
        Workspace::init(repo_root, "", network)?;
        println!("Already initialized at {}", paths.vibelog_dir.display());
        return Ok(());
    }

    let subject = match subject {
        Some(s) if !s.trim().is_empty() => s.trim(),
        Some(_) => anyhow::bail!("--subject must not be empty"),
        None if network == LOCAL_NETWORK => DEFAULT_LOCAL_SUBJECT,
        None => anyhow::bail!("--subject is required for network `{network}`"),
    };

    let ws = Workspace::init(repo_root, subject, network)?;
    println!("Initialized vibelog at {}", ws.paths.vibelog_dir.display());
    println!("  subject: {subject}");
    println!("  network: {network}");
    if network != LOCAL_NETWORK {
        println!("  note: only `{LOCAL_NETWORK}` is reachable from this build");
    }
    Ok(())
}
