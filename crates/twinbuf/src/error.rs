//! # Driver Error Types
//!
//! Steady-state synchronization cannot fail. Everything here happens at the
//! outer surface: loading configuration and managing the worker thread.

use std::path::PathBuf;

use thiserror::Error;

/// Errors while loading or validating a [`RunConfig`](crate::RunConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors while running the worker/editor pair.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration was rejected before the run started.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The OS refused to start the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked.
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
