//! LWS Test - Main Entry Point
//!
//! Runs the Linked Web Storage protocol conformance suite against a subject
//! server and exits 0 only when every selected test passed.

use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use lws_harness::{ConformanceLevel, ConformanceRunner, ReportSelection, RunOptions};

/// W3C Linked Web Storage Protocol Conformance Test Suite
#[derive(Parser, Debug)]
#[command(name = "lws-test")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Test subject (lws-server, jss)
    #[arg(long, env = "LWS_SUBJECT", default_value = "lws-server")]
    subject: String,

    /// Custom config file path (default: config/<subject>.config.json)
    #[arg(long, env = "LWS_CONFIG")]
    config: Option<PathBuf>,

    /// Conformance level filter (MUST, SHOULD, MAY); stricter levels are included
    #[arg(long)]
    level: Option<ConformanceLevel>,

    /// Report format (earl, html, json, all)
    #[arg(long, default_value = "all")]
    report: ReportSelection,

    /// Verbose output with detailed test results
    #[arg(short, long)]
    verbose: bool,

    /// Root test manifest
    #[arg(long, default_value = "manifests/manifest.yaml")]
    manifest: PathBuf,

    /// Directory receiving earl/, html/ and json/ reports
    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,

    /// Disable colors and symbols even on a terminal
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let decorated = !cli.plain && std::io::stdout().is_terminal();
    if !decorated {
        colored::control::set_override(false);
    }

    let options = RunOptions {
        subject: cli.subject,
        config_path: cli.config,
        level: cli.level,
        report: cli.report,
        verbose: cli.verbose,
        decorated,
        manifest_path: cli.manifest,
        reports_dir: cli.reports_dir,
    };
    debug!("Run options: {:?}", options);

    let outcome = ConformanceRunner::new(options, lws_suite::registry())
        .run()
        .await;

    std::process::exit(outcome.exit_code());
}
