use std::fs;

use tracing::{info, warn};
use vibelog_core::{LogEntry, QueueStatus, QueuedCheckpoint};

use crate::atomic::write_json;
use crate::error::{Result, StoreError};
use crate::paths::VibelogPaths;

const VALID_TRANSITIONS: &[(QueueStatus, &[QueueStatus])] = &[
    (
        QueueStatus::Pending,
        &[QueueStatus::Syncing, QueueStatus::Failed],
    ),
    (
        QueueStatus::Syncing,
        &[
            QueueStatus::Failed,
            QueueStatus::Rejected,
            QueueStatus::Pending, // interrupted-attempt recovery
        ],
    ),
    (QueueStatus::Failed, &[QueueStatus::Syncing]), // retry
                                                    // Rejected is terminal
];

fn is_valid_transition(from: QueueStatus, to: QueueStatus) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

/// Durable holding area for checkpoints whose ledger submission failed.
/// Backed by `.vibelog/offline-queue.json`; every mutation is written
/// atomically before returning.
pub struct OfflineQueue<'a> {
    paths: &'a VibelogPaths,
}

impl<'a> OfflineQueue<'a> {
    pub fn new(paths: &'a VibelogPaths) -> Self {
        Self { paths }
    }

    /// Load the queue. An unreadable file is moved aside and treated as
    /// empty so a damaged queue never takes the whole tool down.
    fn load(&self) -> Result<Vec<QueuedCheckpoint>> {
        let path = &self.paths.queue_json;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).map_err(StoreError::io(path))?;
        match serde_json::from_str(&content) {
            Ok(items) => Ok(items),
            Err(e) => {
                let aside = path.with_extension(format!(
                    "json.corrupt-{}",
                    vibelog_core::clock::now_unix()
                ));
                warn!(
                    error = %e,
                    moved_to = %aside.display(),
                    "offline queue is unreadable; treating it as empty"
                );
                fs::rename(path, &aside).map_err(StoreError::io(path))?;
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, items: &[QueuedCheckpoint]) -> Result<()> {
        if !self.paths.vibelog_dir.is_dir() {
            return Err(StoreError::NotInitialized(self.paths.root.clone()));
        }
        write_json(&self.paths.queue_json, items)
    }

    /// Add a batch with status `pending`. Returns the new item's id.
    pub fn enqueue(&self, summary: &str, logs: Vec<LogEntry>) -> Result<String> {
        let mut items = self.load()?;
        let id = format!("offline-{}", ulid::Ulid::new().to_string().to_lowercase());
        items.push(QueuedCheckpoint {
            id: id.clone(),
            created_at: vibelog_core::clock::now_unix(),
            summary: summary.to_string(),
            included_logs: logs,
            status: QueueStatus::Pending,
            retry_count: 0,
            last_error: None,
        });
        self.save(&items)?;
        info!(%id, "checkpoint queued for later submission");
        Ok(id)
    }

    /// Every item, oldest first. Items enqueued in the same second keep
    /// their insertion order.
    pub fn list(&self) -> Result<Vec<QueuedCheckpoint>> {
        let mut items = self.load()?;
        items.sort_by_key(|q| q.created_at);
        Ok(items)
    }

    /// Items eligible for replay (`pending` or `failed`), oldest first.
    pub fn list_pending(&self) -> Result<Vec<QueuedCheckpoint>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|q| q.status.is_replayable())
            .collect())
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.list_pending()?.len())
    }

    pub fn get(&self, id: &str) -> Result<Option<QueuedCheckpoint>> {
        Ok(self.load()?.into_iter().find(|q| q.id == id))
    }

    pub fn mark_syncing(&self, id: &str) -> Result<()> {
        self.transition(id, QueueStatus::Syncing, None)
    }

    /// Record a retryable failure; `retry_count` goes up by one.
    pub fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        self.transition(id, QueueStatus::Failed, Some(error))
    }

    /// Record a permanent failure; the item is never replayed again.
    pub fn mark_rejected(&self, id: &str, error: &str) -> Result<()> {
        self.transition(id, QueueStatus::Rejected, Some(error))
    }

    /// Remove an item (after a successful submission, or to discard it).
    pub fn dequeue(&self, id: &str) -> Result<QueuedCheckpoint> {
        let mut items = self.load()?;
        let pos = items
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| StoreError::QueueItemNotFound(id.to_string()))?;
        let removed = items.remove(pos);
        self.save(&items)?;
        Ok(removed)
    }

    /// Reset items left in `syncing` by a crashed run back to `pending`.
    /// A `syncing` item with no attempt in flight cannot be told apart
    /// from a crash, so it is retried.
    pub fn recover_interrupted(&self) -> Result<usize> {
        let mut items = self.load()?;
        let mut recovered = 0;
        for item in items.iter_mut().filter(|q| q.status == QueueStatus::Syncing) {
            warn!(id = %item.id, "recovering interrupted submission");
            item.status = QueueStatus::Pending;
            item.last_error = Some("interrupted".to_string());
            recovered += 1;
        }
        if recovered > 0 {
            self.save(&items)?;
        }
        Ok(recovered)
    }

    fn transition(&self, id: &str, to: QueueStatus, error: Option<&str>) -> Result<()> {
        let mut items = self.load()?;
        let item = items
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| StoreError::QueueItemNotFound(id.to_string()))?;
        if !is_valid_transition(item.status, to) {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: item.status,
                to,
            });
        }
        item.status = to;
        if let Some(e) = error {
            item.last_error = Some(e.to_string());
        }
        if matches!(to, QueueStatus::Failed | QueueStatus::Rejected) {
            item.retry_count += 1;
        }
        self.save(&items)
    }
}
