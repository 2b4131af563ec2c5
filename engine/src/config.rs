//! Application configuration.

use serde::Deserialize;

use crate::error::AppError;

/// Settings fixed for the lifetime of an [`App`](crate::app::App).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Chain this node executes; every block header and signature is bound
    /// to it.
    pub chain_id: String,

    /// Largest accepted transaction encoding, in bytes.
    /// Default: 64 KiB.
    pub max_tx_bytes: usize,

    /// Most signatures a single transaction may carry.
    pub max_signatures: usize,

    /// Register the cross-chain message kinds. When false they fail to
    /// decode.
    pub enable_ibc: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain_id: "keel-test".to_string(),
            max_tx_bytes: 64 * 1024, // 64 KiB
            max_signatures: 8,
            enable_ibc: true,
        }
    }
}

impl AppConfig {
    /// Default settings for `chain_id`.
    pub fn for_chain(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            ..Self::default()
        }
    }

    /// Parse from TOML; missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(s).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chain_id.is_empty() {
            return Err(AppError::Config("chain_id must not be empty".into()));
        }
        if self.max_tx_bytes == 0 {
            return Err(AppError::Config("max_tx_bytes must be positive".into()));
        }
        if self.max_signatures == 0 {
            return Err(AppError::Config("max_signatures must be positive".into()));
        }
        Ok(())
    }
}
