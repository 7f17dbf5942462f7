//! Error types for the conformance harness

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to load config {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Health check failed for {url}: {reason}")]
    HealthCheck { url: String, reason: String },

    #[error("Server failed to start within {timeout_ms}ms: {reason}")]
    StartupTimeout { timeout_ms: u64, reason: String },

    #[error("Server failed to start: {0}")]
    ServerSpawn(String),

    #[error("Manifest error in {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Test implementation not found: {0}")]
    ImplementationNotFound(String),

    #[error("Failed to create resource {path}: status {status}")]
    ResourceCreation { path: String, status: u16 },

    #[error("{format} reporter failed: {reason}")]
    Reporter { format: String, reason: String },

    #[error("Interrupted by {0}")]
    Interrupted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarnessError {
    /// Wrap any error raised while loading the run configuration.
    pub fn config_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn reporter(format: impl ToString, reason: impl ToString) -> Self {
        Self::Reporter {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
