//! Conformance run orchestration: config, subject, tests, reports, teardown

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregate::{summarize, RunSummary};
use crate::cleanup::CleanupCoordinator;
use crate::client::TestClient;
use crate::config::RunConfig;
use crate::console;
use crate::context::RunContext;
use crate::dispatch::ReporterDispatch;
use crate::error::{HarnessError, HarnessResult};
use crate::executor::{TestExecutor, TestResult};
use crate::manifest::{filter_by_level, ConformanceLevel, ManifestParser};
use crate::registry::TestRegistry;
use crate::report::{ReportSelection, ReportSink, SubjectInfo};
use crate::server::ProcessLifecycleManager;

/// Everything a single run needs from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub subject: String,
    /// Overrides `config/<subject>.config.json`
    pub config_path: Option<PathBuf>,
    pub level: Option<ConformanceLevel>,
    pub report: ReportSelection,
    pub verbose: bool,
    pub decorated: bool,
    pub manifest_path: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            subject: "lws-server".to_string(),
            config_path: None,
            level: None,
            report: ReportSelection::All,
            verbose: false,
            decorated: false,
            manifest_path: PathBuf::from("manifests/manifest.yaml"),
            reports_dir: PathBuf::from("reports"),
        }
    }
}

impl RunOptions {
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| RunConfig::default_path(&self.subject))
    }

    pub fn context(&self) -> RunContext {
        RunContext::new(self.verbose).with_decorations(self.decorated)
    }
}

/// What a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<TestResult>,
    /// Present once test execution was reached
    pub summary: Option<RunSummary>,
    pub reports: Vec<PathBuf>,
    pub fatal: Option<HarnessError>,
}

impl RunOutcome {
    /// 0 only when tests ran, none failed, and nothing fatal happened
    pub fn exit_code(&self) -> i32 {
        match (&self.fatal, &self.summary) {
            (None, Some(summary)) if summary.all_passed() => 0,
            _ => 1,
        }
    }
}

/// State shared between the run and its teardown
struct Session {
    server: ProcessLifecycleManager,
    client: Option<TestClient>,
    data_directory: Option<PathBuf>,
    results: Vec<TestResult>,
    summary: Option<RunSummary>,
    reports: Vec<PathBuf>,
}

pub struct ConformanceRunner {
    options: RunOptions,
    registry: Arc<TestRegistry>,
    sinks: Option<Vec<Box<dyn ReportSink>>>,
}

impl ConformanceRunner {
    pub fn new(options: RunOptions, registry: TestRegistry) -> Self {
        Self {
            options,
            registry: Arc::new(registry),
            sinks: None,
        }
    }

    /// Replace the stock report sinks, ignoring the report selection
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn ReportSink>>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    /// Run until completion or until the process receives SIGINT/SIGTERM
    pub async fn run(self) -> RunOutcome {
        self.run_until(shutdown_signal()).await
    }

    /// Run, abandoning the in-flight step if `shutdown` resolves first.
    ///
    /// Teardown happens on every path, including interruption.
    pub async fn run_until<F>(mut self, shutdown: F) -> RunOutcome
    where
        F: Future<Output = String>,
    {
        let context = self.options.context();
        console::print_banner(&context);

        let mut session = Session {
            server: ProcessLifecycleManager::new(context),
            client: None,
            data_directory: None,
            results: Vec::new(),
            summary: None,
            reports: Vec::new(),
        };

        let fatal = {
            let run = self.execute(&mut session, context);
            tokio::pin!(run);
            tokio::select! {
                result = &mut run => result.err(),
                signal = shutdown => {
                    warn!("Received {}, shutting down", signal);
                    Some(HarnessError::Interrupted(signal))
                }
            }
        };

        if let Some(e) = &fatal {
            error!("Fatal error: {}", e);
        }

        let mut cleanup = CleanupCoordinator::new(session.data_directory.take());
        cleanup.run(session.client.as_ref(), &mut session.server).await;

        if session.summary.is_some() {
            console::print_summary(&session.results, &context);
        }

        RunOutcome {
            results: session.results,
            summary: session.summary,
            reports: session.reports,
            fatal,
        }
    }

    async fn execute(&mut self, session: &mut Session, context: RunContext) -> HarnessResult<()> {
        let config_path = self.options.config_path();
        info!("Loading config {}", config_path.display());
        let config = RunConfig::load(&config_path)?;
        session.data_directory = config.cleanup.data_directory.clone();

        session.server.start(&config).await?;
        let client = session.client.insert(TestClient::new(
            &config.base_url,
            config.authentication.clone(),
            context,
        ));

        let tests = ManifestParser::new(&self.options.manifest_path).parse()?;
        println!("Found {} tests", tests.len());

        let unresolved = self.registry.unresolved(&tests);
        if !unresolved.is_empty() {
            warn!(
                "{} tests have no registered implementation and will fail",
                unresolved.len()
            );
        }

        let selected = filter_by_level(&tests, self.options.level);
        println!("Running {} tests...\n", selected.len());

        let executor = TestExecutor::new(self.registry.clone(), context);
        let results = executor.execute_all(&selected, client).await;
        session.summary = Some(summarize(&results));
        session.results = results;

        println!("\nGenerating reports...");
        let mut dispatch = self.dispatch(&config);
        session.reports = dispatch.emit(&session.results).await?;
        Ok(())
    }

    fn dispatch(&mut self, config: &RunConfig) -> ReporterDispatch {
        let subject = SubjectInfo::from_config(config);
        match self.sinks.take() {
            Some(sinks) => {
                let mut dispatch =
                    ReporterDispatch::new(self.options.reports_dir.clone(), subject.name);
                for sink in sinks {
                    dispatch.push(sink);
                }
                dispatch
            }
            None => ReporterDispatch::for_selection(
                self.options.report,
                &subject,
                self.options.reports_dir.clone(),
            ),
        }
    }
}

/// Resolves with the signal name on Ctrl-C or SIGTERM
pub async fn shutdown_signal() -> String {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT".to_string(),
        _ = terminate => "SIGTERM".to_string(),
    }
}
