//! Scoring configuration.
//!
//! Comparator thresholds are configuration, not literals, so boundary
//! behavior can be exercised directly. Recognized TOML options:
//!
//! ```toml
//! tolerance = 0.05                  # relative numeric tolerance
//! similarity_threshold = 0.90       # fuzzy-string / alignment threshold
//! zero_epsilon = 0.01               # absolute tolerance when expected == 0
//! hygiene_penalty_per_defect = 2.5  # points removed per schema defect
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_TOLERANCE: f64 = 0.05;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.90;
pub const DEFAULT_ZERO_EPSILON: f64 = 0.01;
pub const DEFAULT_HYGIENE_PENALTY: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub tolerance: f64,
    pub similarity_threshold: f64,
    pub zero_epsilon: f64,
    pub hygiene_penalty_per_defect: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            zero_epsilon: DEFAULT_ZERO_EPSILON,
            hygiene_penalty_per_defect: DEFAULT_HYGIENE_PENALTY,
        }
    }
}

impl ScoringConfig {
    /// Parse and validate a TOML document. `origin` is only used in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validated()
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Check every option against its domain.
    pub fn validated(self) -> Result<Self, ConfigError> {
        ensure_non_negative("tolerance", self.tolerance)?;
        ensure_non_negative("zero_epsilon", self.zero_epsilon)?;
        ensure_non_negative(
            "hygiene_penalty_per_defect",
            self.hygiene_penalty_per_defect,
        )?;
        let threshold = self.similarity_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::InvalidValue {
                option: "similarity_threshold",
                message: format!("must be in (0, 1], got {threshold}"),
            });
        }
        Ok(self)
    }
}

fn ensure_non_negative(option: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            option,
            message: format!("must be a finite non-negative number, got {value}"),
        })
    }
}
