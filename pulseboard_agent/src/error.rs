//! Startup-time errors. The running pipeline itself has no fallible operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Metric;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid threshold for {metric}: warning={warning}, critical={critical} (critical must be >= warning)")]
    InvalidThreshold {
        metric: Metric,
        warning: f64,
        critical: f64,
    },

    #[error("invalid value for {flag}: {reason}")]
    InvalidArgument { flag: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
