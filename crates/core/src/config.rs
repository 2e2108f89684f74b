use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Anomalies are flagged strictly above this many standard deviations.
const MIN_Z_THRESHOLD: f64 = 2.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Tunables for every engine in the workspace. Missing keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub categorization: CategorizationConfig,
    pub insights: InsightsConfig,
    pub allocation: AllocationConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorizationConfig {
    pub max_suggestions: usize,
    pub max_pattern_suggestions: usize,
    /// A keyword cluster needs at least this many expenses to become a pattern.
    pub min_cluster_size: usize,
    pub max_keywords: usize,
    pub historical_confidence_cap: f32,
    pub ocr_hint_confidence_cap: f32,
    pub io_timeout_ms: u64,
}

impl Default for CategorizationConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            max_pattern_suggestions: 5,
            min_cluster_size: 2,
            max_keywords: 10,
            historical_confidence_cap: 0.8,
            ocr_hint_confidence_cap: 0.7,
            io_timeout_ms: 5_000,
        }
    }
}

impl CategorizationConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub lookback_months: usize,
    pub min_baseline_months: usize,
    pub z_threshold: f64,
    pub trend_slope_threshold_cents: f64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            lookback_months: 6,
            min_baseline_months: 3,
            z_threshold: 2.0,
            trend_slope_threshold_cents: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Allowed distance of the percentage sum from 100.
    pub tolerance: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub max_receipts: usize,
    pub io_timeout_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { max_receipts: 3, io_timeout_ms: 10_000 }
    }
}

impl OcrConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.categorization.max_suggestions == 0 {
            return Err(ConfigError::Invalid {
                key: "categorization.max_suggestions",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.categorization.max_keywords == 0 {
            return Err(ConfigError::Invalid {
                key: "categorization.max_keywords",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.categorization.min_cluster_size < 2 {
            return Err(ConfigError::Invalid {
                key: "categorization.min_cluster_size",
                reason: "a single expense is not a pattern".to_string(),
            });
        }
        if self.insights.min_baseline_months < 2 {
            return Err(ConfigError::Invalid {
                key: "insights.min_baseline_months",
                reason: "need at least two months for a deviation".to_string(),
            });
        }
        if self.insights.z_threshold.is_nan() || self.insights.z_threshold < MIN_Z_THRESHOLD {
            return Err(ConfigError::Invalid {
                key: "insights.z_threshold",
                reason: format!("must be at least {MIN_Z_THRESHOLD}"),
            });
        }
        if self.allocation.tolerance.is_nan() || self.allocation.tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                key: "allocation.tolerance",
                reason: "must be a non-negative number".to_string(),
            });
        }
        if self.ocr.max_receipts == 0 {
            return Err(ConfigError::Invalid {
                key: "ocr.max_receipts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
