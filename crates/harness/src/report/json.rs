//! Machine-readable JSON report

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{write_report, ReportFormat, ReportSink, SubjectInfo};
use crate::error::HarnessResult;
use crate::executor::TestResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    subject: &'a SubjectInfo,
    test_date: DateTime<Utc>,
    results: Vec<JsonResult<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonResult<'a> {
    test_id: &'a str,
    name: &'a str,
    category: &'a str,
    level: &'a str,
    outcome: &'a str,
    duration: u64,
    error: Option<&'a str>,
}

pub struct JsonReporter {
    subject: SubjectInfo,
    results: Vec<TestResult>,
}

impl JsonReporter {
    pub fn new(subject: SubjectInfo) -> Self {
        Self {
            subject,
            results: Vec::new(),
        }
    }

    pub fn render(&self, test_date: DateTime<Utc>) -> HarnessResult<String> {
        let report = JsonReport {
            subject: &self.subject,
            test_date,
            results: self
                .results
                .iter()
                .map(|r| JsonResult {
                    test_id: &r.test.id,
                    name: &r.test.name,
                    category: &r.test.category,
                    level: r.test.conformance_level.as_str(),
                    outcome: r.outcome.as_str(),
                    duration: r.duration_ms,
                    error: r.error.as_deref(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

#[async_trait]
impl ReportSink for JsonReporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn add_result(&mut self, result: &TestResult) {
        self.results.push(result.clone());
    }

    async fn generate_report(&self, output_path: &Path) -> HarnessResult<PathBuf> {
        let json = self.render(Utc::now())?;
        write_report(output_path, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Outcome;
    use crate::report::fixtures::{result, subject};

    #[tokio::test]
    async fn test_json_report_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = JsonReporter::new(subject());
        reporter.add_result(&result("test-get-resource", "HTTP Methods", Outcome::Passed, None));
        reporter.add_result(&result("test-get-404", "HTTP Methods", Outcome::Failed, Some("boom")));

        let path = ReportFormat::Json.output_path(dir.path(), "lws-server");
        let written = reporter.generate_report(&path).await.unwrap();
        assert_eq!(written, path);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["subject"]["name"], "lws-server");
        assert_eq!(value["subject"]["version"], "0.2.0");
        assert!(value["testDate"].is_string());

        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["testId"], "test-get-resource");
        assert_eq!(results[0]["level"], "MUST");
        assert_eq!(results[0]["outcome"], "passed");
        assert_eq!(results[0]["duration"], 12);
        assert!(results[0]["error"].is_null());
        assert_eq!(results[1]["outcome"], "failed");
        assert_eq!(results[1]["error"], "boom");
        assert_eq!(results[1]["category"], "HTTP Methods");
    }
}
