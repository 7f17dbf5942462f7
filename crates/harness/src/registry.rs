//! Static registry binding manifest implementation refs to assertion bodies

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::client::TestClient;
use crate::error::{HarnessError, HarnessResult};
use crate::manifest::TestCase;

/// What an assertion body returns; any error fails the test
pub type CheckResult = anyhow::Result<()>;

pub type CheckFuture<'a> = BoxFuture<'a, CheckResult>;

/// A registered assertion body
pub type CheckFn = dyn for<'a> Fn(&'a TestClient) -> CheckFuture<'a> + Send + Sync;

/// Returned by a body when the test does not apply to the subject.
///
/// Recorded as `inapplicable` rather than `failed`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Inapplicable(pub String);

#[derive(Default, Clone)]
pub struct TestRegistry {
    checks: HashMap<String, Arc<CheckFn>>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `implementation_ref` to a body, replacing any previous binding
    pub fn register<F>(&mut self, implementation_ref: impl Into<String>, check: F) -> &mut Self
    where
        F: for<'a> Fn(&'a TestClient) -> CheckFuture<'a> + Send + Sync + 'static,
    {
        self.checks.insert(implementation_ref.into(), Arc::new(check));
        self
    }

    pub fn resolve(&self, implementation_ref: &str) -> HarnessResult<Arc<CheckFn>> {
        self.checks
            .get(implementation_ref)
            .cloned()
            .ok_or_else(|| HarnessError::ImplementationNotFound(implementation_ref.to_string()))
    }

    pub fn contains(&self, implementation_ref: &str) -> bool {
        self.checks.contains_key(implementation_ref)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Tests whose implementation ref has no binding
    pub fn unresolved<'t>(&self, tests: &'t [Arc<TestCase>]) -> Vec<&'t TestCase> {
        tests
            .iter()
            .filter(|t| !self.contains(&t.implementation_ref))
            .map(|t| t.as_ref())
            .collect()
    }
}
