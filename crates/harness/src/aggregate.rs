//! Reductions over a run's results

use serde::Serialize;
use std::collections::HashMap;

use crate::executor::{Outcome, TestResult};
use crate::manifest::DEFAULT_CATEGORY;

/// Aggregate counts, recomputable from the result list at any time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `passed / total`, 0 for an empty run
    pub pass_rate: f64,
}

impl RunSummary {
    pub fn pass_percent(&self) -> f64 {
        self.pass_rate * 100.0
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mut summary = RunSummary {
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            pass_rate: 0.0,
        };

        for outcome in outcomes {
            summary.total += 1;
            match outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Inapplicable => summary.skipped += 1,
            }
        }

        if summary.total > 0 {
            summary.pass_rate = summary.passed as f64 / summary.total as f64;
        }
        summary
    }
}

pub fn summarize(results: &[TestResult]) -> RunSummary {
    RunSummary::from_outcomes(results.iter().map(|r| r.outcome))
}

/// Results partitioned by category, in first-seen category order
#[derive(Debug, Default)]
pub struct CategoryGroups<'a> {
    groups: Vec<(String, Vec<&'a TestResult>)>,
}

impl<'a> CategoryGroups<'a> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[&'a TestResult])> {
        self.groups
            .iter()
            .map(|(category, results)| (category.as_str(), results.as_slice()))
    }

    pub fn get(&self, category: &str) -> Option<&[&'a TestResult]> {
        self.groups
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, results)| results.as_slice())
    }

    pub fn categories(&self) -> Vec<&str> {
        self.groups.iter().map(|(c, _)| c.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub fn group_by_category(results: &[TestResult]) -> CategoryGroups<'_> {
    let mut groups: Vec<(String, Vec<&TestResult>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for result in results {
        let category = match result.test.category.trim() {
            "" => DEFAULT_CATEGORY,
            category => category,
        };

        let slot = *index.entry(category).or_insert_with(|| {
            groups.push((category.to_string(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(result);
    }

    CategoryGroups { groups }
}
