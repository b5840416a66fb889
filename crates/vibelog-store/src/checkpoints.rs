use std::fs;

use tracing::{info, warn};
use vibelog_core::{checkpoint_id, Checkpoint, CheckpointId, ContentHash};

use crate::atomic::{read_json, write_json};
use crate::config::{load_config, save_config, VibeConfig};
use crate::error::{Result, StoreError};
use crate::paths::VibelogPaths;

/// Append-only collection of recorded checkpoints, one JSON file each.
///
/// The checkpoint files are the source of truth. The watermark and
/// counters in the config are derived from them: `record` writes the
/// checkpoint first and the config second, and `reconcile` repairs the
/// config if a crash landed between the two writes.
pub struct CheckpointStore<'a> {
    paths: &'a VibelogPaths,
}

impl<'a> CheckpointStore<'a> {
    pub fn new(paths: &'a VibelogPaths) -> Self {
        Self { paths }
    }

    /// All checkpoints in sequence order.
    pub fn all(&self) -> Result<Vec<Checkpoint>> {
        let dir = &self.paths.checkpoints_dir;
        if !dir.is_dir() {
            return Err(StoreError::NotInitialized(self.paths.root.clone()));
        }
        let mut checkpoints = Vec::new();
        for item in fs::read_dir(dir).map_err(StoreError::io(dir))? {
            let path = item.map_err(StoreError::io(dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            checkpoints.push(read_json::<Checkpoint>(&path)?);
        }
        checkpoints.sort_by_key(|c| (c.sequence().unwrap_or(u32::MAX), c.created_at));
        Ok(checkpoints)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }

    pub fn latest(&self) -> Result<Option<Checkpoint>> {
        Ok(self.all()?.pop())
    }

    /// Next sequential id. Equal to `checkpoint_{count+1}` while the
    /// sequence has no gaps; skips past the highest existing sequence
    /// otherwise so it can never collide.
    pub fn next_id(&self) -> Result<CheckpointId> {
        let all = self.all()?;
        let highest = all.iter().filter_map(|c| c.sequence()).max().unwrap_or(0);
        let next = (all.len() as u32).max(highest) + 1;
        Ok(checkpoint_id(next))
    }

    /// Persist a checkpoint, then advance the watermark and counters.
    pub fn record(&self, checkpoint: &Checkpoint) -> Result<()> {
        let path = self.paths.checkpoint_path(&checkpoint.id);
        if path.exists() {
            return Err(StoreError::DuplicateCheckpoint(checkpoint.id.clone()));
        }
        let mut config = load_config(self.paths)?;
        write_json(&path, checkpoint)?;

        config.advance_watermark(checkpoint.batch_cutoff);
        config.stats.total_checkpoints += 1;
        config.stats.total_gas_used += checkpoint.receipt.gas_used;
        config.stats.total_cost += checkpoint.receipt.cost;
        save_config(self.paths, &config)?;

        info!(
            id = %checkpoint.id,
            hash = %checkpoint.content_hash,
            logs = checkpoint.included_log_ids.len(),
            watermark = config.watermark(),
            "checkpoint recorded"
        );
        Ok(())
    }

    /// Find a checkpoint attesting exactly this batch.
    pub fn find_batch(&self, hash: &ContentHash, log_ids: &[String]) -> Result<Option<Checkpoint>> {
        Ok(self
            .all()?
            .into_iter()
            .find(|c| c.content_hash.matches(hash.as_str()) && c.included_log_ids == log_ids))
    }

    /// Bring the config's watermark and counters in line with the
    /// checkpoint files. Returns true when the config was repaired.
    pub fn reconcile(&self) -> Result<bool> {
        let checkpoints = self.all()?;
        let mut config = load_config(self.paths)?;
        let before = config.clone();
        repair_config(&mut config, &checkpoints);
        if config == before {
            return Ok(false);
        }
        warn!(
            watermark_before = before.watermark(),
            watermark_after = config.watermark(),
            checkpoints = checkpoints.len(),
            "config disagreed with checkpoint records; repaired"
        );
        save_config(self.paths, &config)?;
        Ok(true)
    }
}

fn repair_config(config: &mut VibeConfig, checkpoints: &[Checkpoint]) {
    if let Some(cutoff) = checkpoints.iter().map(|c| c.batch_cutoff).max() {
        config.advance_watermark(cutoff);
    }
    let count = checkpoints.len() as u64;
    if config.stats.total_checkpoints != count {
        config.stats.total_checkpoints = count;
        config.stats.total_gas_used = checkpoints.iter().map(|c| c.receipt.gas_used).sum();
        config.stats.total_cost = checkpoints.iter().map(|c| c.receipt.cost).sum();
    }
}
