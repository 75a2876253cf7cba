//! Durable storage for strategies and their runtime state
//!
//! Both stores are single JSON files written atomically: the payload
//! goes to a sibling temp file which is then renamed over the target, so
//! a crash mid-write never leaves a half-written file. A missing or
//! corrupt file loads as an empty store; the process keeps running.

pub mod state_store;
pub mod strategy_store;

pub use state_store::StateStore;
pub use strategy_store::StrategyStore;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Write `value` as pretty JSON via temp-file-then-rename.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let payload = serde_json::to_string_pretty(value).context("failed to encode state")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, payload)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Load JSON from `path`, falling back to the default on a missing or
/// unreadable file. Corruption is logged, never fatal.
pub(crate) fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read store, starting empty");
            return T::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
            T::default()
        }
    }
}
