use std::fs;

use tracing::debug;
use vibelog_core::{log_id, LogDraft, LogEntry};

use crate::atomic::{read_json, write_json};
use crate::config::{load_config, save_config};
use crate::error::{Result, StoreError};
use crate::paths::VibelogPaths;
use crate::queue::OfflineQueue;

/// Append-only collection of log entries, one JSON file each.
pub struct LogStore<'a> {
    paths: &'a VibelogPaths,
}

impl<'a> LogStore<'a> {
    pub fn new(paths: &'a VibelogPaths) -> Self {
        Self { paths }
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.paths.logs_dir.is_dir() {
            return Err(StoreError::NotInitialized(self.paths.root.clone()));
        }
        Ok(())
    }

    /// Store a new entry stamped with the current time. The timestamp is
    /// kept strictly above the watermark and above every queued batch, so
    /// replaying that batch later cannot move the watermark past the entry.
    pub fn append(&self, draft: LogDraft) -> Result<LogEntry> {
        let now = vibelog_core::clock::now_unix();
        let timestamp = match self.timestamp_floor()? {
            Some(floor) => now.max(floor + 1),
            None => now,
        };
        self.append_at(draft, timestamp)
    }

    /// Newest time an entry must not share: the watermark, or the last log
    /// of any batch still sitting in the offline queue.
    fn timestamp_floor(&self) -> Result<Option<u64>> {
        let watermark = load_config(self.paths)?.last_checkpoint;
        let queued = OfflineQueue::new(self.paths)
            .list()?
            .iter()
            .flat_map(|item| item.included_logs.iter().map(|e| e.timestamp))
            .max();
        Ok(watermark.max(queued))
    }

    /// Store a new entry with an explicit creation time.
    pub fn append_at(&self, draft: LogDraft, timestamp: u64) -> Result<LogEntry> {
        self.ensure_initialized()?;
        let mut suffix = 0u32;
        let id = loop {
            let candidate = log_id(timestamp, suffix);
            if !self.paths.log_path(&candidate).exists() {
                break candidate;
            }
            suffix += 1;
        };

        let entry = draft.into_entry(id, timestamp);
        write_json(&self.paths.log_path(&entry.id), &entry)?;

        let mut config = load_config(self.paths)?;
        config.stats.total_logs += 1;
        save_config(self.paths, &config)?;

        debug!(id = %entry.id, timestamp, "log appended");
        Ok(entry)
    }

    /// Every entry in creation order.
    pub fn all(&self) -> Result<Vec<LogEntry>> {
        self.ensure_initialized()?;
        let dir = &self.paths.logs_dir;
        let mut entries = Vec::new();
        for item in fs::read_dir(dir).map_err(StoreError::io(dir))? {
            let path = item.map_err(StoreError::io(dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            entries.push(read_json::<LogEntry>(&path)?);
        }
        entries.sort_by_key(|e| e.order_key());
        Ok(entries)
    }

    /// Entries strictly newer than `watermark`, oldest first.
    pub fn since(&self, watermark: u64) -> Result<Vec<LogEntry>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.timestamp > watermark)
            .collect())
    }

    /// Entries not yet covered by a recorded checkpoint.
    pub fn pending(&self) -> Result<Vec<LogEntry>> {
        let watermark = load_config(self.paths)?.watermark();
        self.since(watermark)
    }

    pub fn get(&self, id: &str) -> Result<Option<LogEntry>> {
        self.ensure_initialized()?;
        let path = self.paths.log_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }
}
