//! Sequential test execution with per-test failure isolation

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::client::TestClient;
use crate::console;
use crate::context::RunContext;
use crate::manifest::TestCase;
use crate::registry::{Inapplicable, TestRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Inapplicable,
}

impl Outcome {
    /// Lowercase name, also the EARL outcome local name
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Inapplicable => "inapplicable",
        }
    }
}

/// Result of running a single test, created once and never mutated
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub test: Arc<TestCase>,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    fn new(test: Arc<TestCase>, outcome: Outcome, duration_ms: u64, error: Option<String>) -> Self {
        Self {
            test,
            outcome,
            duration_ms,
            error,
            timestamp: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Runs test bodies one at a time against the shared subject
pub struct TestExecutor {
    registry: Arc<TestRegistry>,
    context: RunContext,
}

impl TestExecutor {
    pub fn new(registry: Arc<TestRegistry>, context: RunContext) -> Self {
        Self { registry, context }
    }

    /// Execute every test in order; `results[i]` belongs to `tests[i]`
    pub async fn execute_all(
        &self,
        tests: &[Arc<TestCase>],
        client: &TestClient,
    ) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(tests.len());

        for test in tests {
            let result = self.execute_one(test, client).await;
            console::print_progress(&result, &self.context);
            results.push(result);
        }

        if !tests.is_empty() {
            console::finish_progress(&self.context);
        }
        results
    }

    /// Execute one test; nothing the body does escapes as an error
    pub async fn execute_one(&self, test: &Arc<TestCase>, client: &TestClient) -> TestResult {
        debug!("Running test: {}", test.id);
        let start = Instant::now();

        let check = match self.registry.resolve(&test.implementation_ref) {
            Ok(check) => check,
            Err(e) => {
                return TestResult::new(
                    test.clone(),
                    Outcome::Failed,
                    elapsed_ms(start),
                    Some(e.to_string()),
                )
            }
        };

        let outcome = AssertUnwindSafe(check(client)).catch_unwind().await;
        let duration_ms = elapsed_ms(start);

        match outcome {
            Ok(Ok(())) => TestResult::new(test.clone(), Outcome::Passed, duration_ms, None),
            Ok(Err(e)) => match e.downcast_ref::<Inapplicable>() {
                Some(reason) => TestResult::new(
                    test.clone(),
                    Outcome::Inapplicable,
                    duration_ms,
                    Some(reason.0.clone()),
                ),
                None => TestResult::new(
                    test.clone(),
                    Outcome::Failed,
                    duration_ms,
                    Some(format!("{:#}", e)),
                ),
            },
            Err(panic) => TestResult::new(
                test.clone(),
                Outcome::Failed,
                duration_ms,
                Some(panic_message(panic.as_ref())),
            ),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "test panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestParser;
    use crate::registry::CheckResult;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    fn tests_for(refs: &[&str]) -> Vec<Arc<TestCase>> {
        let yaml: String = refs
            .iter()
            .enumerate()
            .map(|(i, r)| format!("  - id: t{}\n    implementation: \"{}\"\n", i, r))
            .collect();
        ManifestParser::parse_str(&format!("entries:\n{}", yaml)).unwrap()
    }

    fn offline_client() -> TestClient {
        TestClient::new("http://127.0.0.1:1", None, RunContext::default())
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_run() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TestRegistry::new();
        for name in ["a", "c"] {
            let order = order.clone();
            registry.register(format!("t#{}", name), move |_client| {
                let order = order.clone();
                Box::pin(async move {
                    order.lock().push(name);
                    CheckResult::Ok(())
                })
            });
        }
        {
            let order = order.clone();
            registry.register("t#b", move |_client| {
                let order = order.clone();
                Box::pin(async move {
                    order.lock().push("b");
                    CheckResult::Err(anyhow!("boom"))
                })
            });
        }

        let executor = TestExecutor::new(Arc::new(registry), RunContext::default());
        let tests = tests_for(&["t#a", "t#b", "t#c"]);
        let results = executor.execute_all(&tests, &offline_client()).await;

        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
        let outcomes: Vec<_> = results.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Passed, Outcome::Failed, Outcome::Passed]);
        assert_eq!(results[1].error.as_deref(), Some("boom"));
        for (test, result) in tests.iter().zip(&results) {
            assert_eq!(test.id, result.test.id);
        }
    }

    #[tokio::test]
    async fn test_missing_implementation_is_captured() {
        let executor = TestExecutor::new(Arc::new(TestRegistry::new()), RunContext::default());
        let tests = tests_for(&["nowhere#test"]);

        let result = executor.execute_one(&tests[0], &offline_client()).await;

        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.error.unwrap().contains("nowhere#test"));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let mut registry = TestRegistry::new();
        registry.register("t#panic", |_client| {
            Box::pin(async {
                let status = 500;
                assert_eq!(status, 200, "Status should be 200");
                CheckResult::Ok(())
            })
        });
        let executor = TestExecutor::new(Arc::new(registry), RunContext::default());
        let tests = tests_for(&["t#panic"]);

        let result = executor.execute_one(&tests[0], &offline_client()).await;

        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.error.unwrap().contains("Status should be 200"));
    }

    #[tokio::test]
    async fn test_network_error_is_captured() {
        let mut registry = TestRegistry::new();
        registry.register("t#net", |client| {
            Box::pin(async move {
                client.get("/").send().await?;
                CheckResult::Ok(())
            })
        });
        let executor = TestExecutor::new(Arc::new(registry), RunContext::new(true));
        let tests = tests_for(&["t#net"]);

        let result = executor.execute_one(&tests[0], &offline_client()).await;

        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.error.unwrap().starts_with("HTTP error"));
    }

    #[tokio::test]
    async fn test_inapplicable_outcome() {
        let mut registry = TestRegistry::new();
        registry.register("t#skip", |_client| {
            Box::pin(async { CheckResult::Err(Inapplicable("no auth configured".into()).into()) })
        });
        let executor = TestExecutor::new(Arc::new(registry), RunContext::default());
        let tests = tests_for(&["t#skip"]);

        let result = executor.execute_one(&tests[0], &offline_client()).await;

        assert_eq!(result.outcome, Outcome::Inapplicable);
        assert_eq!(result.error.as_deref(), Some("no auth configured"));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let executor = TestExecutor::new(Arc::new(TestRegistry::new()), RunContext::default());
        assert!(executor.execute_all(&[], &offline_client()).await.is_empty());
    }
}
