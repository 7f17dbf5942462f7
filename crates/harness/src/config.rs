//! Run configuration
//!
//! One file per subject, `config/<subject>.config.json` by default. TOML is
//! accepted as well when the file ends in `.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Immutable configuration for a single conformance run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Name of the implementation under test
    #[serde(alias = "name")]
    pub subject_name: String,

    /// Subject release reported in EARL and JSON output
    #[serde(default = "default_version")]
    pub version: String,

    /// Project homepage of the subject
    #[serde(default)]
    pub homepage: Option<String>,

    /// Root URL every test path is resolved against
    pub base_url: String,

    #[serde(default)]
    pub authentication: Option<Authentication>,

    /// `managed` spawns the subject, `external` only probes it
    #[serde(default, rename = "type")]
    pub mode: Option<SubjectMode>,

    /// How to launch the subject in managed mode
    #[serde(default, alias = "server")]
    pub server_spec: Option<ServerSpec>,

    #[serde(default)]
    pub cleanup: CleanupConfig,
}

fn default_version() -> String {
    "0.0.1".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectMode {
    Managed,
    External,
}

/// Credentials attached to every request the test client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Authentication {
    Bearer { token: String },
    Cookie {
        #[serde(default)]
        cookie: Option<String>,
    },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Overlaid on top of the harness environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(
        default = "default_startup_timeout",
        rename = "startupTimeout",
        alias = "startupTimeoutMs"
    )]
    pub startup_timeout_ms: u64,

    #[serde(default)]
    pub health_check: Option<HealthCheck>,

    /// Working directory for the subject process
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

fn default_startup_timeout() -> u64 {
    30_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub url: String,

    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

fn default_expected_status() -> u16 {
    200
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupConfig {
    /// Scratch directory removed once the subject has stopped
    #[serde(default)]
    pub data_directory: Option<PathBuf>,
}

impl RunConfig {
    /// Conventional location of a subject's config file
    pub fn default_path(subject: &str) -> PathBuf {
        PathBuf::from("config").join(format!("{}.config.json", subject))
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::config_load(path, e))?;

        let is_toml = path
            .extension()
            .map(|ext| ext == "toml")
            .unwrap_or(false);

        let config = if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
        .map_err(|e| HarnessError::config_load(path, e))?;

        config
            .validate()
            .map_err(|e| HarnessError::config_load(path, e))?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> HarnessResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject configurations the lifecycle manager cannot act on
    pub fn validate(&self) -> HarnessResult<()> {
        if self.subject_name.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("subject name is empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(HarnessError::InvalidConfig("baseUrl is empty".into()));
        }
        if self.mode() == SubjectMode::Managed {
            match &self.server_spec {
                Some(spec) if !spec.command.trim().is_empty() => {}
                _ => {
                    return Err(HarnessError::InvalidConfig(
                        "managed subject requires server.command".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Effective mode; an explicit `type` wins, otherwise a `server` block implies managed
    pub fn mode(&self) -> SubjectMode {
        self.mode.unwrap_or(if self.server_spec.is_some() {
            SubjectMode::Managed
        } else {
            SubjectMode::External
        })
    }

    pub fn health_check(&self) -> HealthCheck {
        self.server_spec
            .as_ref()
            .and_then(|s| s.health_check.clone())
            .unwrap_or_else(|| HealthCheck {
                url: format!("{}/", self.base_url.trim_end_matches('/')),
                expected_status: default_expected_status(),
            })
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(
            self.server_spec
                .as_ref()
                .map(|s| s.startup_timeout_ms)
                .unwrap_or_else(default_startup_timeout),
        )
    }

    pub fn homepage(&self) -> String {
        self.homepage.clone().unwrap_or_else(|| {
            format!("https://github.com/linkedwebstorage/{}", self.subject_name)
        })
    }
}
