use std::path::Path;

use clap::Subcommand;
use serde_json::Value;
use vibelog_store::{VibeConfig, Workspace};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key, dotted for nested fields (e.g. rate_limit.max_submissions)
        key: String,
        /// Config value (true/false/number/string, `null` to unset)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

/// Keys maintained by vibe itself.
const MANAGED_KEYS: &[&str] = &["version", "initialized", "last_checkpoint", "stats"];

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Helpers ──

fn pointer(key: &str) -> String {
    format!("/{}", key.replace('.', "/"))
}

/// Parse a string value into an appropriate JSON value (bool/number/string).
fn parse_value(s: &str) -> Value {
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                Value::String(s.to_string())
            }
        }
    }
}

/// Write `value` at `key` and check the result still forms a valid config
/// that carries the new value.
fn apply(config: &VibeConfig, key: &str, value: Value) -> Option<VibeConfig> {
    let path = pointer(key);
    let mut doc = serde_json::to_value(config).ok()?;
    match doc.pointer_mut(&path) {
        Some(slot) if slot.is_object() => return None,
        Some(slot) => *slot = value.clone(),
        None => {
            let (parent, leaf) = path.rsplit_once('/')?;
            doc.pointer_mut(parent)?
                .as_object_mut()?
                .insert(leaf.to_string(), value.clone());
        }
    }
    let updated: VibeConfig = serde_json::from_value(doc).ok()?;
    let stored = serde_json::to_value(&updated).ok()?;
    match stored.pointer(&path) {
        Some(v) if *v == value => Some(updated),
        None if value.is_null() => Some(updated),
        _ => None,
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
        }
        other => out.push((prefix.to_string(), other.clone())),
    }
}

// ── Command Implementations ──

/// `vibe config set <key> <value>`
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let root_key = key.split('.').next().unwrap_or(key);
    if MANAGED_KEYS.contains(&root_key) {
        anyhow::bail!("`{root_key}` is maintained by vibe and cannot be set");
    }
    let ws = Workspace::open(repo_root)?;
    let _lock = ws.lock()?;
    let config = ws.config()?;

    let parsed = parse_value(value);
    let updated = apply(&config, key, parsed.clone())
        .or_else(|| match parsed {
            Value::String(_) | Value::Null => None,
            _ => apply(&config, key, Value::String(value.to_string())),
        })
        .ok_or_else(|| anyhow::anyhow!("`{key}` is not a settable config key or `{value}` is not valid for it"))?;

    ws.save_config(&updated)?;
    println!("{key} = {value}");
    Ok(())
}

/// `vibe config get <key>`
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let doc = serde_json::to_value(ws.config()?)?;
    match doc.pointer(&pointer(key)) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `vibe config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open(repo_root)?;
    let doc = serde_json::to_value(ws.config()?)?;
    let mut entries = Vec::new();
    flatten("", &doc, &mut entries);
    for (k, v) in &entries {
        println!("{k} = {v}");
    }
    Ok(())
}
