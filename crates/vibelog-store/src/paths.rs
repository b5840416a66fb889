use std::path::{Path, PathBuf};

/// All well-known paths under `.vibelog/`.
#[derive(Debug, Clone)]
pub struct VibelogPaths {
    pub root: PathBuf,
    pub vibelog_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub checkpoints_dir: PathBuf,
    pub config_json: PathBuf,
    pub queue_json: PathBuf,
    pub local_ledger_json: PathBuf,
    pub lock_file: PathBuf,
}

impl VibelogPaths {
    /// Derive all paths from a project root. Pure computation, no I/O.
    pub fn discover(project_root: impl Into<PathBuf>) -> Self {
        let root = project_root.into();
        let vibelog_dir = root.join(".vibelog");
        Self {
            logs_dir: vibelog_dir.join("logs"),
            checkpoints_dir: vibelog_dir.join("checkpoints"),
            config_json: vibelog_dir.join("config.json"),
            queue_json: vibelog_dir.join("offline-queue.json"),
            local_ledger_json: vibelog_dir.join("local-ledger.json"),
            lock_file: vibelog_dir.join("LOCK"),
            vibelog_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [&self.vibelog_dir, &self.logs_dir, &self.checkpoints_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// A workspace counts as initialized once its config has been written.
    pub fn is_initialized(&self) -> bool {
        self.config_json.is_file()
    }

    pub fn log_path(&self, id: &str) -> PathBuf {
        self.logs_dir.join(format!("{id}.json"))
    }

    pub fn checkpoint_path(&self, id: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{id}.json"))
    }

    /// Walk up from `start` looking for a directory containing `.vibelog/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".vibelog").join("config.json").is_file() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}
