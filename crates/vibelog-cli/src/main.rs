mod cmd_checkpoint;
mod cmd_config;
mod cmd_init;
mod cmd_log;
mod cmd_queue;
mod cmd_status;
mod cmd_verify;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vibelog_store::VibelogPaths;

#[derive(Parser)]
#[command(
    name = "vibe",
    version,
    about = "Local build log with ledger-anchored checkpoints"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .vibelog/ workspace
    Init {
        /// Ledger subject key checkpoints are attested under
        #[arg(long)]
        subject: Option<String>,
        /// Ledger network (only `local` is reachable from this build)
        #[arg(long, default_value = "local")]
        network: String,
    },
    /// Record a build log entry
    Log {
        /// What was done
        message: String,
        /// Commit hash this entry refers to
        #[arg(long)]
        commit: Option<String>,
        /// Commit message (stored, not hashed)
        #[arg(long)]
        commit_message: Option<String>,
        /// Changed file (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Lines added
        #[arg(long, default_value_t = 0)]
        added: u64,
        /// Lines deleted
        #[arg(long, default_value_t = 0)]
        deleted: u64,
    },
    /// Anchor all pending log entries as one checkpoint
    Checkpoint {
        /// Public summary of the batch (sanitized before submission)
        summary: String,
        /// Queue the checkpoint without contacting the ledger
        #[arg(long)]
        offline: bool,
        /// Fail instead of queueing when the submission fails
        #[arg(long)]
        abort_on_failure: bool,
        /// Wait for the gas price to drop to this many gwei first
        #[arg(long)]
        max_gas_gwei: Option<u64>,
        /// Longest wait for the gas target, in seconds
        #[arg(long)]
        wait_secs: Option<u64>,
    },
    /// Submit queued checkpoints, oldest first
    Sync,
    /// Inspect or prune the offline queue
    Queue {
        #[command(subcommand)]
        cmd: cmd_queue::QueueCmd,
    },
    /// Compare local checkpoints with the ledger
    Verify {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show workspace status
    Status,
    /// Manage workspace config
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VIBELOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let repo_root = VibelogPaths::find_root(&cwd).unwrap_or(cwd);
    tracing::debug!(root = %repo_root.display(), "resolved workspace root");

    match cli.cmd {
        Command::Init { subject, network } => {
            cmd_init::execute(&repo_root, subject.as_deref(), &network)
        }
        Command::Log {
            message,
            commit,
            commit_message,
            files,
            added,
            deleted,
        } => cmd_log::execute(cmd_log::LogParams {
            repo_root: &repo_root,
            message: &message,
            commit: commit.as_deref(),
            commit_message: commit_message.as_deref(),
            files,
            added,
            deleted,
        }),
        Command::Checkpoint {
            summary,
            offline,
            abort_on_failure,
            max_gas_gwei,
            wait_secs,
        } => cmd_checkpoint::execute(cmd_checkpoint::CheckpointParams {
            repo_root: &repo_root,
            summary: &summary,
            offline,
            abort_on_failure,
            max_gas_gwei,
            wait_secs,
        }),
        Command::Sync => cmd_queue::sync(&repo_root),
        Command::Queue { cmd } => cmd_queue::run(cmd, &repo_root),
        Command::Verify { json } => cmd_verify::execute(&repo_root, json),
        Command::Status => cmd_status::execute(&repo_root),
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
    }
}
