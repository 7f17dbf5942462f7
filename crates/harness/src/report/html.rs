//! Self-contained HTML conformance report

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::{write_report, ReportFormat, ReportSink, SubjectInfo};
use crate::aggregate::{group_by_category, summarize};
use crate::error::HarnessResult;
use crate::executor::{Outcome, TestResult};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 1200px; margin: 0 auto; padding: 20px; background: #f5f5f5; color: #333; }
.panel { background: #fff; padding: 20px; border-radius: 8px; margin-bottom: 20px; box-shadow: 0 2px 4px rgba(0,0,0,.1); }
.tiles { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 15px; margin: 20px 0; }
.tile { background: #fff; padding: 15px; border-radius: 8px; text-align: center; box-shadow: 0 2px 4px rgba(0,0,0,.1); }
.tile-value { font-size: 2em; font-weight: bold; margin: 10px 0; }
.tile-label { color: #666; font-size: .9em; }
.pass-rate { font-size: 3em; font-weight: bold; }
table { width: 100%; border-collapse: collapse; margin-top: 15px; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #eee; }
th { background: #f8f8f8; }
tr.passed { background: #d4edda; color: #155724; }
tr.failed { background: #f8d7da; color: #721c24; }
tr.inapplicable { background: #fff3cd; color: #856404; }
.error { padding: 10px; border-left: 3px solid #dc3545; font-family: monospace; font-size: .85em; white-space: pre-wrap; }
.muted { color: #666; font-size: .85em; }
"#;

const GREEN: &str = "#28a745";
const AMBER: &str = "#ffc107";
const RED: &str = "#dc3545";

pub struct HtmlReporter {
    subject: SubjectInfo,
    results: Vec<TestResult>,
}

impl HtmlReporter {
    pub fn new(subject: SubjectInfo) -> Self {
        Self {
            subject,
            results: Vec::new(),
        }
    }

    pub fn render(&self, test_date: DateTime<Utc>) -> String {
        let summary = summarize(&self.results);
        let name = escape_html(&self.subject.name);
        let mut out = String::new();

        let _ = write!(
            out,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <title>LWS Conformance Report: {}</title>\n<style>{}</style>\n</head>\n<body>\n",
            name, STYLE
        );

        let version = if self.subject.version.is_empty() {
            String::new()
        } else {
            format!(" v{}", escape_html(&self.subject.version))
        };
        let _ = write!(
            out,
            "<div class=\"panel\">\n<h1>LWS Protocol Conformance Report</h1>\n\
             <p><strong>Implementation:</strong> {}{}</p>\n\
             <p class=\"muted\"><strong>Test Date:</strong> {}</p>\n</div>\n",
            name,
            version,
            test_date.to_rfc3339()
        );

        out.push_str("<div class=\"tiles\">\n");
        let _ = writeln!(
            out,
            "<div class=\"tile\"><div class=\"pass-rate\" style=\"color: {}\">{:.1}%</div>\
             <div class=\"tile-label\">Pass Rate</div></div>",
            pass_rate_color(summary.pass_rate),
            summary.pass_percent()
        );
        for (label, value, color) in [
            ("Total Tests", summary.total, None),
            ("Passed", summary.passed, Some(GREEN)),
            ("Failed", summary.failed, Some(RED)),
            ("Skipped", summary.skipped, Some(AMBER)),
        ] {
            let style = color
                .map(|c| format!(" style=\"color: {}\"", c))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "<div class=\"tile\"><div class=\"tile-value\"{}>{}</div>\
                 <div class=\"tile-label\">{}</div></div>",
                style, value, label
            );
        }
        out.push_str("</div>\n");

        for (category, results) in group_by_category(&self.results).iter() {
            let _ = write!(
                out,
                "<div class=\"panel\">\n<h2>{}</h2>\n<table>\n<thead><tr>\
                 <th>Result</th><th>Test Name</th><th>Requirement</th>\
                 <th>Spec</th><th>Duration</th>\
                 </tr></thead>\n<tbody>\n",
                escape_html(category)
            );
            for result in results {
                let test = &result.test;
                let _ = writeln!(
                    out,
                    "<tr class=\"{}\"><td>{}</td><td>{}</td>\
                     <td>{}</td><td>{}</td><td>{}ms</td></tr>",
                    result.outcome.as_str(),
                    outcome_icon(result.outcome),
                    escape_html(&test.name),
                    escape_html(test.comment.as_deref().unwrap_or("-")),
                    escape_html(test.spec_section.as_deref().unwrap_or("-")),
                    result.duration_ms
                );
                if let Some(error) = &result.error {
                    let _ = writeln!(
                        out,
                        "<tr><td colspan=\"5\"><div class=\"error\">{}</div></td></tr>",
                        escape_html(error)
                    );
                }
            }
            out.push_str("</tbody>\n</table>\n</div>\n");
        }

        out.push_str("</body>\n</html>\n");
        out
    }
}

#[async_trait]
impl ReportSink for HtmlReporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn add_result(&mut self, result: &TestResult) {
        self.results.push(result.clone());
    }

    async fn generate_report(&self, output_path: &Path) -> HarnessResult<PathBuf> {
        write_report(output_path, &self.render(Utc::now())).await
    }
}

fn pass_rate_color(pass_rate: f64) -> &'static str {
    if pass_rate >= 0.9 {
        GREEN
    } else if pass_rate >= 0.7 {
        AMBER
    } else {
        RED
    }
}

fn outcome_icon(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Passed => "✓",
        Outcome::Failed => "✗",
        Outcome::Inapplicable => "○",
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}
