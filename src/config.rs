//! Engine configuration
//!
//! Loaded from an optional JSON file; a missing file yields the defaults.

use crate::host::local::DEFAULT_CHAIN_ID;
use crate::multisig::{DEFAULT_FEE_PERCENTAGE, MAX_FEE_PERCENTAGE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Fee percentage {0} exceeds the maximum of {max}", max = MAX_FEE_PERCENTAGE)]
    FeePercentageTooHigh(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain identifier bound into every digest
    pub chain_id: u64,
    /// Share of pulled revenue paid to the first approver and again to the executor
    pub fee_percentage: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            fee_percentage: DEFAULT_FEE_PERCENTAGE,
        }
    }
}

impl EngineConfig {
    /// Both fixed shares must fit inside the revenue
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_percentage > MAX_FEE_PERCENTAGE {
            return Err(ConfigError::FeePercentageTooHigh(self.fee_percentage));
        }
        Ok(())
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.fee_percentage, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(&temp_dir.path().join("none.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "chain_id": 31337 }"#).unwrap();

        let config = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.fee_percentage, 20);
    }

    #[test]
    fn test_fee_percentage_cap() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "fee_percentage": 51 }"#).unwrap();

        assert!(matches!(
            EngineConfig::load_or_default(&path),
            Err(ConfigError::FeePercentageTooHigh(51))
        ));

        let at_cap = EngineConfig {
            fee_percentage: 50,
            ..Default::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            EngineConfig::load_or_default(&path),
            Err(ConfigError::ParseError(_))
        ));
    }
}
