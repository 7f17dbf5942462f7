//! Declarative YAML test manifests
//!
//! A manifest lists test entries and may include other manifests:
//!
//! ```yaml
//! label: LWS HTTP methods
//! include:
//!   - etag.yaml
//! entries:
//!   - id: test-get-resource
//!     name: GET existing resource
//!     comment: MUST return 200 for existing resources
//!     specSection: "4.1.1"
//!     conformanceLevel: MUST
//!     category: HTTP Methods
//!     implementation: http-methods/get#resource
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{HarnessError, HarnessResult};

/// Category assigned to entries that do not declare one
pub const DEFAULT_CATEGORY: &str = "General";

/// Requirement strictness, strictest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConformanceLevel {
    Must,
    Should,
    May,
}

impl ConformanceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConformanceLevel::Must => "MUST",
            ConformanceLevel::Should => "SHOULD",
            ConformanceLevel::May => "MAY",
        }
    }

    /// Whether a test at `level` is selected by this filter level
    pub fn includes(&self, level: ConformanceLevel) -> bool {
        level <= *self
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConformanceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MUST" => Ok(ConformanceLevel::Must),
            "SHOULD" => Ok(ConformanceLevel::Should),
            "MAY" => Ok(ConformanceLevel::May),
            other => Err(format!("unknown conformance level: {}", other)),
        }
    }
}

/// A single test descriptor, immutable once parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub name: String,
    pub comment: Option<String>,
    pub spec_section: Option<String>,
    pub conformance_level: ConformanceLevel,
    pub category: String,
    /// Key into the test registry
    pub implementation_ref: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    spec_section: Option<String>,
    #[serde(default)]
    conformance_level: Option<ConformanceLevel>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    implementation: Option<String>,
}

impl ManifestEntry {
    fn into_test_case(self) -> Option<TestCase> {
        let Some(implementation_ref) = self.implementation.filter(|i| !i.trim().is_empty())
        else {
            warn!("Test {} has no implementation", self.id);
            return None;
        };

        Some(TestCase {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            comment: self.comment,
            spec_section: self.spec_section,
            conformance_level: self.conformance_level.unwrap_or(ConformanceLevel::Must),
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            implementation_ref,
        })
    }
}

/// Loads a root manifest and everything it includes
pub struct ManifestParser {
    path: PathBuf,
}

impl ManifestParser {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ordered test cases: a manifest's own entries, then its includes in order
    pub fn parse(&self) -> HarnessResult<Vec<Arc<TestCase>>> {
        let mut tests = Vec::new();
        let mut visited = HashSet::new();
        let mut seen_ids = HashSet::new();

        self.load(&self.path, &mut visited, &mut seen_ids, &mut tests)?;
        Ok(tests)
    }

    /// Parse a single manifest document; includes are ignored
    pub fn parse_str(yaml: &str) -> HarnessResult<Vec<Arc<TestCase>>> {
        let document: ManifestDocument = serde_yaml::from_str(yaml)?;
        let mut seen_ids = HashSet::new();
        let mut tests = Vec::new();
        push_entries(document.entries, &mut seen_ids, &mut tests);
        Ok(tests)
    }

    fn load(
        &self,
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        seen_ids: &mut HashSet<String>,
        tests: &mut Vec<Arc<TestCase>>,
    ) -> HarnessResult<()> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(key) {
            debug!("Skipping already loaded manifest {}", path.display());
            return Ok(());
        }

        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let document: ManifestDocument =
            serde_yaml::from_str(&content).map_err(|e| HarnessError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(
            "Loaded manifest {} ({} entries)",
            document.label.as_deref().unwrap_or(&path.display().to_string()),
            document.entries.len()
        );

        push_entries(document.entries, seen_ids, tests);

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        for include in &document.include {
            self.load(&dir.join(include), visited, seen_ids, tests)?;
        }

        Ok(())
    }
}

fn push_entries(
    entries: Vec<ManifestEntry>,
    seen_ids: &mut HashSet<String>,
    tests: &mut Vec<Arc<TestCase>>,
) {
    for entry in entries {
        if let Some(test) = entry.into_test_case() {
            if !seen_ids.insert(test.id.clone()) {
                warn!("Duplicate test id {}, keeping the first definition", test.id);
                continue;
            }
            tests.push(Arc::new(test));
        }
    }
}

/// Keep tests at `level` or stricter; `None` keeps everything
pub fn filter_by_level(
    tests: &[Arc<TestCase>],
    level: Option<ConformanceLevel>,
) -> Vec<Arc<TestCase>> {
    match level {
        None => tests.to_vec(),
        Some(level) => tests
            .iter()
            .filter(|t| level.includes(t.conformance_level))
            .cloned()
            .collect(),
    }
}
