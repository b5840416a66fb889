use std::path::Path;

use vibelog_core::{ChangeStats, CommitRef, LogDraft};
use vibelog_store::Workspace;

pub struct LogParams<'a> {
    pub repo_root: &'a Path,
    pub message: &'a str,
    pub commit: Option<&'a str>,
    pub commit_message: Option<&'a str>,
    pub files: Vec<String>,
    pub added: u64,
    pub deleted: u64,
}

pub fn execute(p: LogParams<'_>) -> anyhow::Result<()> {
    let message = p.message.trim();
    if message.is_empty() {
        anyhow::bail!("log message must not be empty");
    }
    let ws = Workspace::open(p.repo_root)?;
    let _lock = ws.lock()?;

    let mut draft = LogDraft::new(message);
    if let Some(hash) = p.commit {
        draft = draft.with_commit(CommitRef {
            hash: hash.to_string(),
            message: p.commit_message.unwrap_or_default().to_string(),
        });
    }
    if !p.files.is_empty() || p.added > 0 || p.deleted > 0 {
        draft = draft.with_diff(ChangeStats {
            files_changed: p.files.len() as u32,
            lines_added: p.added,
            lines_deleted: p.deleted,
            files: p.files,
        });
    }

    let entry = ws.logs().append(draft)?;
    let pending = ws.pending_logs()?.len();
    println!("Logged {} ({pending} pending)", entry.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_with_diff_and_commit() {
        let tmp = tempfile::tempdir().unwrap();
        Workspace::init(tmp.path(), "0xme", "local").unwrap();
        execute(LogParams {
            repo_root: tmp.path(),
            message: "  wired the parser  ",
            commit: Some("abc123"),
            commit_message: None,
            files: vec!["src/parse.rs".into()],
            added: 40,
            deleted: 2,
        })
        .unwrap();

        let ws = Workspace::open(tmp.path()).unwrap();
        let logs = ws.logs().all().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "wired the parser");
        assert_eq!(logs[0].commit.as_ref().unwrap().hash, "abc123");
        let diff = logs[0].diff.as_ref().unwrap();
        assert_eq!((diff.files_changed, diff.lines_added), (1, 40));
    }

    #[test]
    fn empty_message_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        Workspace::init(tmp.path(), "0xme", "local").unwrap();
        let err = execute(LogParams {
            repo_root: tmp.path(),
            message: "   ",
            commit: None,
            commit_message: None,
            files: vec![],
            added: 0,
            deleted: 0,
        });
        assert!(err.is_err());
    }
}
