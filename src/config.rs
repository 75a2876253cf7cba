//! Configuration management
//!
//! Credentials and paths come from environment variables (optionally via a
//! `.env` file loaded by the CLI). The private key is never serialized.

use std::path::PathBuf;

use anyhow::{bail, Result};

/// Default production API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://trading.robinhood.com";

/// Runtime settings for the trading agent
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key id issued by the exchange
    pub api_key: String,
    /// Base64-encoded private key material
    pub private_key_b64: String,
    /// Base URL of the trading API
    pub api_base_url: String,
    /// Directory for strategy/state files and logs
    pub data_dir: PathBuf,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// Required: `ROBINHOOD_API_KEY`, `ROBINHOOD_PRIVATE_KEY`.
    /// Optional: `ROBINHOOD_API_BASE_URL`, `ROBINHOOD_DATA_DIR`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ROBINHOOD_API_KEY").unwrap_or_default();
        let private_key_b64 = std::env::var("ROBINHOOD_PRIVATE_KEY").unwrap_or_default();
        let api_base_url = std::env::var("ROBINHOOD_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let data_dir = std::env::var("ROBINHOOD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let settings = Settings {
            api_key,
            private_key_b64,
            api_base_url,
            data_dir,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            bail!("ROBINHOOD_API_KEY is not set");
        }
        if self.private_key_b64.is_empty() {
            bail!("ROBINHOOD_PRIVATE_KEY is not set");
        }
        Ok(())
    }

    /// Path of the strategy configuration file
    pub fn strategies_path(&self) -> PathBuf {
        self.data_dir.join("strategies.json")
    }

    /// Path of the runtime position-state file
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}
