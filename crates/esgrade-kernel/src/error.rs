//! Error types for esgrade kernel operations.
//!
//! Scoring a malformed candidate is never an error: defects are collected
//! and surface in the report. Only configuration problems and an unusable
//! expected record are raised.

use std::path::PathBuf;

/// Errors raised while loading or validating a [`crate::ScoringConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A recognized option holds a value outside its domain.
    #[error("invalid config value for `{option}`: {message}")]
    InvalidValue {
        option: &'static str,
        message: String,
    },
}

/// Errors raised by the scoring entry points.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// The reference record cannot be read as an ESG record at all.
    #[error("expected record is unusable: {0}")]
    InvalidExpected(String),
}
