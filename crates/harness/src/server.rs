//! Subject process management - spawning, health checking and stopping the
//! server under test

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{HealthCheck, RunConfig, SubjectMode};
use crate::context::RunContext;
use crate::error::{HarnessError, HarnessResult};

/// Interval between readiness probes while the subject starts
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Time a subject gets to exit after SIGTERM before it is killed
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_millis(5000);

/// Upper bound on a single health request
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Starting,
    Ready,
    Failed,
    Stopping,
    Stopped,
}

enum ProcessHandle {
    Spawned {
        child: Child,
        drains: Vec<JoinHandle<()>>,
    },
    /// Subject is managed elsewhere; nothing to signal on stop
    External,
}

/// Owns the subject server for the duration of a run
pub struct ProcessLifecycleManager {
    context: RunContext,
    state: LifecycleState,
    process: Option<ProcessHandle>,
    poll_interval: Duration,
    grace_period: Duration,
    probe: reqwest::Client,
}

impl ProcessLifecycleManager {
    pub fn new(context: RunContext) -> Self {
        let probe = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            context,
            state: LifecycleState::NotStarted,
            process: None,
            poll_interval: HEALTH_POLL_INTERVAL,
            grace_period: SHUTDOWN_GRACE_PERIOD,
            probe,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// OS pid of the spawned subject, if one is owned
    pub fn pid(&self) -> Option<u32> {
        match &self.process {
            Some(ProcessHandle::Spawned { child, .. }) => child.id(),
            _ => None,
        }
    }

    /// Bring the subject to `Ready` or fail without leaving a process behind
    pub async fn start(&mut self, config: &RunConfig) -> HarnessResult<()> {
        if self.state == LifecycleState::Ready {
            return Ok(()); // Already running
        }

        self.state = LifecycleState::Starting;
        let health = config.health_check();

        match config.mode() {
            SubjectMode::External => self.attach(&health).await,
            SubjectMode::Managed => self.launch(config, &health).await,
        }
    }

    async fn attach(&mut self, health: &HealthCheck) -> HarnessResult<()> {
        info!("Checking external subject at {}", health.url);

        match self.probe_health(health).await {
            Ok(status) if status == health.expected_status => {
                info!("External server health check passed");
                self.process = Some(ProcessHandle::External);
                self.state = LifecycleState::Ready;
                Ok(())
            }
            Ok(status) => {
                self.state = LifecycleState::Failed;
                Err(HarnessError::HealthCheck {
                    url: health.url.clone(),
                    reason: format!(
                        "expected status {}, got {}",
                        health.expected_status, status
                    ),
                })
            }
            Err(e) => {
                self.state = LifecycleState::Failed;
                Err(HarnessError::HealthCheck {
                    url: health.url.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn launch(&mut self, config: &RunConfig, health: &HealthCheck) -> HarnessResult<()> {
        let spec = config.server_spec.as_ref().ok_or_else(|| {
            HarnessError::InvalidConfig("managed subject requires server.command".into())
        })?;

        info!("Starting server: {} {}", spec.command, spec.args.join(" "));

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| {
            self.state = LifecycleState::Failed;
            HarnessError::ServerSpawn(format!("failed to spawn {}: {}", spec.command, e))
        })?;

        // Pipes must be emptied or a chatty subject blocks on write
        let verbose = self.context.verbose;
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(drain_output(stdout, "stdout", verbose));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(drain_output(stderr, "stderr", verbose));
        }

        self.process = Some(ProcessHandle::Spawned { child, drains });

        let startup_timeout = config.startup_timeout();
        match self.wait_for_healthy(health, startup_timeout).await {
            Ok(()) => {
                info!("Server started successfully");
                self.state = LifecycleState::Ready;
                Ok(())
            }
            Err(reason) => {
                self.stop().await;
                self.state = LifecycleState::Failed;
                Err(HarnessError::StartupTimeout {
                    timeout_ms: startup_timeout.as_millis() as u64,
                    reason,
                })
            }
        }
    }

    /// Poll the health endpoint until it answers with the expected status
    async fn wait_for_healthy(
        &mut self,
        health: &HealthCheck,
        startup_timeout: Duration,
    ) -> Result<(), String> {
        let deadline = Instant::now() + startup_timeout;
        let mut attempts = 0usize;

        loop {
            attempts += 1;

            if let Some(ProcessHandle::Spawned { child, .. }) = &mut self.process {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(format!("subject exited before becoming ready ({})", status));
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match timeout(remaining, self.probe_health(health)).await {
                Ok(Ok(status)) if status == health.expected_status => return Ok(()),
                Ok(Ok(status)) => {
                    debug!("Health check returned {}", status);
                }
                Ok(Err(e)) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // Connection refused is expected while the subject binds
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
                Err(_) => break,
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            sleep(self.poll_interval.min(remaining)).await;
        }

        Err(format!(
            "{} did not return {} after {} attempts",
            health.url, health.expected_status, attempts
        ))
    }

    async fn probe_health(&self, health: &HealthCheck) -> Result<u16, reqwest::Error> {
        let resp = self.probe.get(&health.url).send().await?;
        Ok(resp.status().as_u16())
    }

    /// Stop the subject: SIGTERM, wait out the grace period, then SIGKILL.
    ///
    /// A no-op when nothing is owned. Never fails; problems are logged.
    pub async fn stop(&mut self) {
        let Some(handle) = self.process.take() else {
            return;
        };

        let (mut child, drains) = match handle {
            ProcessHandle::External => {
                self.state = LifecycleState::Stopped;
                return;
            }
            ProcessHandle::Spawned { child, drains } => (child, drains),
        };

        self.state = LifecycleState::Stopping;
        info!("Stopping server (pid: {:?})", child.id());

        if let Ok(Some(status)) = child.try_wait() {
            debug!("Server already exited ({})", status);
        } else {
            terminate(&mut child);

            match timeout(self.grace_period, child.wait()).await {
                Ok(Ok(status)) => info!("Server stopped ({})", status),
                Ok(Err(e)) => warn!("Failed waiting for server exit: {}", e),
                Err(_) => {
                    warn!(
                        "Server did not exit within {}ms, sending SIGKILL",
                        self.grace_period.as_millis()
                    );
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill server: {}", e);
                    }
                    // Reap if the kill lands promptly; kill_on_drop covers the rest
                    let _ = timeout(Duration::from_millis(500), child.wait()).await;
                }
            }
        }

        for drain in drains {
            drain.abort();
        }
        self.state = LifecycleState::Stopped;
    }
}

/// Ask the child to shut down gracefully
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!("Failed to send SIGTERM to {}: {}", pid, e);
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = child.start_kill() {
            warn!("Failed to stop server: {}", e);
        }
    }
}

fn drain_output<R>(stream: R, label: &'static str, verbose: bool) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if verbose {
                        debug!(target: "subject", stream = label, "{}", line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(target: "subject", stream = label, "output closed: {}", e);
                    break;
                }
            }
        }
    })
}
