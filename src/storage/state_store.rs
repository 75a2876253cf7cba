//! Persistence for per-strategy runtime state

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::trading::strategy::PositionState;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    positions: BTreeMap<String, PositionState>,
}

/// JSON-file store mapping strategy id to [`PositionState`]. Every state
/// transition is flushed through here before the engine moves on to the
/// next strategy, so a crash never loses a completed action.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load all position state. Missing or corrupt files yield an empty
    /// map rather than failing the process.
    pub fn load(&self) -> BTreeMap<String, PositionState> {
        let file: StateFile = super::load_json_or_default(&self.path);
        file.positions
    }

    /// Atomically replace the stored state map
    pub fn save(&self, positions: &BTreeMap<String, PositionState>) -> Result<()> {
        let file = StateFile {
            positions: positions.clone(),
        };
        super::save_json(&self.path, &file)?;
        tracing::debug!(
            count = file.positions.len(),
            path = %self.path.display(),
            "position state saved"
        );
        Ok(())
    }
}
