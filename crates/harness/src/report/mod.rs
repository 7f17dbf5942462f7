//! Report sinks - durable renderings of a run's results

mod earl;
mod html;
mod json;

pub use earl::EarlReporter;
pub use html::HtmlReporter;
pub use json::JsonReporter;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::RunConfig;
use crate::error::HarnessResult;
use crate::executor::TestResult;

/// A collaborator that accumulates results and flushes them to storage
#[async_trait]
pub trait ReportSink: Send {
    fn format(&self) -> ReportFormat;

    fn add_result(&mut self, result: &TestResult);

    /// Write the report to `output_path`, returning where it landed
    async fn generate_report(&self, output_path: &Path) -> HarnessResult<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    Earl,
    Html,
    Json,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Earl, ReportFormat::Html, ReportFormat::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Earl => "earl",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Earl => "ttl",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
        }
    }

    /// `<reports_dir>/<format>/<subject>.<ext>`
    pub fn output_path(&self, reports_dir: &Path, subject: &str) -> PathBuf {
        reports_dir
            .join(self.as_str())
            .join(format!("{}.{}", subject, self.extension()))
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earl" => Ok(ReportFormat::Earl),
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

/// Formats requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportSelection {
    #[default]
    All,
    Only(ReportFormat),
}

impl ReportSelection {
    /// Requested formats in generation order
    pub fn formats(&self) -> Vec<ReportFormat> {
        match self {
            ReportSelection::All => ReportFormat::ALL.to_vec(),
            ReportSelection::Only(format) => vec![*format],
        }
    }
}

impl FromStr for ReportSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(ReportSelection::All)
        } else {
            s.parse().map(ReportSelection::Only)
        }
    }
}

/// Identity of the implementation under test, as printed in reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectInfo {
    pub name: String,
    pub version: String,
    pub homepage: String,
}

impl SubjectInfo {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            name: config.subject_name.clone(),
            version: config.version.clone(),
            homepage: config.homepage(),
        }
    }
}

/// Build the stock sink for a format
pub fn create_sink(format: ReportFormat, subject: &SubjectInfo) -> Box<dyn ReportSink> {
    match format {
        ReportFormat::Earl => Box::new(EarlReporter::new(subject.clone())),
        ReportFormat::Html => Box::new(HtmlReporter::new(subject.clone())),
        ReportFormat::Json => Box::new(JsonReporter::new(subject.clone())),
    }
}

/// Write a rendered report, creating parent directories as needed
pub(crate) async fn write_report(output_path: &Path, content: &str) -> HarnessResult<PathBuf> {
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output_path, content).await?;
    Ok(output_path.to_path_buf())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::executor::Outcome;
    use crate::manifest::{ConformanceLevel, TestCase};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    pub(crate) fn subject() -> SubjectInfo {
        SubjectInfo {
            name: "lws-server".into(),
            version: "0.2.0".into(),
            homepage: "https://github.com/linkedwebstorage/lws-server".into(),
        }
    }

    pub(crate) fn result(
        id: &str,
        category: &str,
        outcome: Outcome,
        error: Option<&str>,
    ) -> TestResult {
        TestResult {
            test: Arc::new(TestCase {
                id: id.into(),
                name: format!("Test {}", id),
                comment: Some("MUST do the thing".into()),
                spec_section: Some("4.1.1".into()),
                conformance_level: ConformanceLevel::Must,
                category: category.into(),
                implementation_ref: format!("x#{}", id),
            }),
            outcome,
            duration_ms: 12,
            error: error.map(str::to_string),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }
}
