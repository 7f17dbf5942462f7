//! LWS Conformance Harness
//!
//! This crate drives a conformance run against a Linked Web Storage server:
//! - Spawns the subject server as a subprocess (or attaches to a running one)
//! - Resolves manifest entries to registered assertion bodies
//! - Executes every selected test sequentially with per-test failure isolation
//! - Renders EARL, HTML and JSON conformance reports
//! - Tears down fixtures, the subject and scratch storage on every exit path
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ConformanceRunner                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ProcessLifecycleManager                                    │
//! │    ├── start(config) -> Ready | StartupTimeout | HealthCheck│
//! │    └── stop()  SIGTERM, 5s grace, SIGKILL                   │
//! │  TestExecutor                                               │
//! │    ├── execute_all(tests, client) -> Vec<TestResult>        │
//! │    └── execute_one(test, client)  failures become data      │
//! │  aggregate::summarize / group_by_category                   │
//! │  ReporterDispatch  earl -> html -> json                     │
//! │  CleanupCoordinator  fixtures -> subject -> data dir        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod console;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod registry;
pub mod report;
pub mod runner;
pub mod server;

#[cfg(test)]
mod testing;

pub use aggregate::{group_by_category, summarize, CategoryGroups, RunSummary};
pub use client::{HttpResponse, TestClient};
pub use config::RunConfig;
pub use context::RunContext;
pub use error::{HarnessError, HarnessResult};
pub use executor::{Outcome, TestExecutor, TestResult};
pub use manifest::{ConformanceLevel, ManifestParser, TestCase};
pub use registry::{CheckResult, Inapplicable, TestRegistry};
pub use report::{ReportFormat, ReportSelection, ReportSink};
pub use runner::{ConformanceRunner, RunOptions, RunOutcome};
pub use server::ProcessLifecycleManager;
