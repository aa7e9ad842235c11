//! Scan configuration.
//!
//! One TOML file covers strategy toggles, per-strategy thresholds, and the
//! position cache location. Every section is optional; omitted sections fall
//! back to the defaults documented on each config struct.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::{
    CoveredCallConfig, CreditSpreadConfig, IronCondorConfig, PmccConfig, VerticalSpreadConfig,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which strategies run. All enabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyToggles {
    pub iron_condor: bool,
    pub credit_spread: bool,
    pub vertical_spread: bool,
    pub covered_call: bool,
    pub pmcc: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            iron_condor: true,
            credit_spread: true,
            vertical_spread: true,
            covered_call: true,
            pmcc: true,
        }
    }
}

/// Top-level scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Where the position cache persists between runs.
    pub cache_path: PathBuf,

    pub strategies: StrategyToggles,
    pub iron_condor: IronCondorConfig,
    pub credit_spread: CreditSpreadConfig,
    pub vertical_spread: VerticalSpreadConfig,
    pub covered_call: CoveredCallConfig,
    pub pmcc: PmccConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("positions.json"),
            strategies: StrategyToggles::default(),
            iron_condor: IronCondorConfig::default(),
            credit_spread: CreditSpreadConfig::default(),
            vertical_spread: VerticalSpreadConfig::default(),
            covered_call: CoveredCallConfig::default(),
            pmcc: PmccConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ScanConfig = toml::from_str("").unwrap();
        assert!(config.strategies.iron_condor);
        assert_eq!(config.iron_condor.min_dte, 21);
        assert_eq!(config.cache_path, PathBuf::from("positions.json"));
    }

    #[test]
    fn test_partial_override() {
        let config: ScanConfig = toml::from_str(
            r#"
            cache_path = "/tmp/positions.json"

            [strategies]
            pmcc = false

            [iron_condor]
            target_delta = 0.2
            "#,
        )
        .unwrap();
        assert!(!config.strategies.pmcc);
        assert!(config.strategies.covered_call);
        assert!((config.iron_condor.target_delta - 0.2).abs() < f64::EPSILON);
        // Unspecified fields inside an overridden section keep defaults.
        assert_eq!(config.iron_condor.max_expiries_per_symbol, 3);
    }
}
