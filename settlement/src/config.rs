//! Configuration for settlement engine

use crate::conversion::{DEFAULT_CONVERSION_SCALE, MAX_SCALE};
use crate::optimizer::MatchOrder;
use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reporting currency (ISO 4217), used in logs and reports
    pub reporting_currency: String,

    /// Currency conversion configuration
    pub conversion: ConversionConfig,

    /// Optimizer configuration
    pub optimizer: OptimizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reporting_currency: "JPY".to_string(),
            conversion: ConversionConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// Currency conversion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Fractional digits kept for intermediate conversions (default: 7)
    pub scale: u32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_CONVERSION_SCALE,
        }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Heap priority for matching debtors and creditors
    pub match_order: MatchOrder,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(currency) = std::env::var("SETTLEMENT_REPORTING_CURRENCY") {
            config.reporting_currency = currency;
        }

        if let Ok(scale) = std::env::var("SETTLEMENT_CONVERSION_SCALE") {
            config.conversion.scale = scale.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid SETTLEMENT_CONVERSION_SCALE: {}", e))
            })?;
        }

        if let Ok(order) = std::env::var("SETTLEMENT_MATCH_ORDER") {
            config.optimizer.match_order = order.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> crate::Result<()> {
        if self.reporting_currency.trim().is_empty() {
            return Err(crate::Error::Config(
                "reporting_currency must not be empty".to_string(),
            ));
        }

        if self.conversion.scale > MAX_SCALE {
            return Err(crate::Error::Config(format!(
                "conversion.scale {} exceeds maximum {}",
                self.conversion.scale, MAX_SCALE
            )));
        }

        Ok(())
    }
}
