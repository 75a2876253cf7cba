//! Persistence for configured strategies

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::trading::strategy::Strategy;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StrategyFile {
    strategies: Vec<Strategy>,
}

/// JSON-file store for strategy configurations. The engine re-reads it
/// at the start of every tick, so external edits (an operator adding or
/// removing a strategy) take effect on the next tick.
#[derive(Debug, Clone)]
pub struct StrategyStore {
    path: PathBuf,
}

impl StrategyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load all strategies keyed by id. Missing or corrupt files yield
    /// an empty map. Iteration order is deterministic (sorted by id).
    pub fn load(&self) -> BTreeMap<String, Strategy> {
        let file: StrategyFile = super::load_json_or_default(&self.path);
        file.strategies
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect()
    }

    /// Atomically replace the stored strategy set
    pub fn save(&self, strategies: &BTreeMap<String, Strategy>) -> Result<()> {
        let file = StrategyFile {
            strategies: strategies.values().cloned().collect(),
        };
        super::save_json(&self.path, &file)?;
        tracing::debug!(
            count = file.strategies.len(),
            path = %self.path.display(),
            "strategies saved"
        );
        Ok(())
    }
}
