//! Shared fixtures for orchestrator tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    http::{Method, StatusCode, Uri},
    routing::get,
    Router,
};
use lws_harness::report::ReportFormat;
use lws_harness::{HarnessError, HarnessResult, ReportSink, TestResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// External subject with a health route and a PUT/DELETE store
pub struct Subject {
    pub addr: SocketAddr,
    stored: Arc<Mutex<HashSet<String>>>,
    pub deleted: Arc<Mutex<Vec<String>>>,
}

impl Subject {
    pub async fn spawn() -> Self {
        let stored: Arc<Mutex<HashSet<String>>> = Arc::default();
        let deleted: Arc<Mutex<Vec<String>>> = Arc::default();

        let app = {
            let stored = stored.clone();
            let deleted = deleted.clone();
            Router::new()
                .route("/health", get(|| async { StatusCode::OK }))
                .fallback(move |method: Method, uri: Uri| {
                    let stored = stored.clone();
                    let deleted = deleted.clone();
                    async move {
                        let path = uri.path().to_string();
                        match method {
                            Method::PUT => {
                                stored.lock().insert(path);
                                StatusCode::CREATED
                            }
                            Method::DELETE if stored.lock().remove(&path) => {
                                deleted.lock().push(path);
                                StatusCode::NO_CONTENT
                            }
                            _ => StatusCode::NOT_FOUND,
                        }
                    }
                })
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            stored,
            deleted,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stored(&self) -> usize {
        self.stored.lock().len()
    }
}

/// Scratch workspace holding a config, a manifest and a data directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.path("data")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.path("reports")
    }

    /// Config for an already-running subject, with a populated data directory
    pub fn external_config(&self, base_url: &str) -> PathBuf {
        std::fs::create_dir_all(self.data_dir().join("pod")).unwrap();
        std::fs::write(self.data_dir().join("pod/resource.txt"), "x").unwrap();

        let config = serde_json::json!({
            "name": "fixture",
            "version": "1.0.0",
            "baseUrl": base_url,
            "type": "external",
            "server": {
                "command": "unused",
                "healthCheck": { "url": format!("{}/health", base_url), "expectedStatus": 200 }
            },
            "cleanup": { "dataDirectory": self.data_dir() }
        });
        self.write("fixture.config.json", &config.to_string())
    }

    /// Config that launches `sh -c script` and probes a port nobody listens on
    pub fn unreachable_managed_config(&self, script: &str, startup_timeout_ms: u64) -> PathBuf {
        std::fs::create_dir_all(self.data_dir()).unwrap();
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = serde_json::json!({
            "name": "fixture",
            "baseUrl": base_url,
            "server": {
                "command": "sh",
                "args": ["-c", script],
                "startupTimeout": startup_timeout_ms,
                "healthCheck": { "url": format!("{}/health", base_url) }
            },
            "cleanup": { "dataDirectory": self.data_dir() }
        });
        self.write("fixture.config.json", &config.to_string())
    }

    /// Manifest with one MUST entry per `(id, implementation)` pair
    pub fn manifest(&self, entries: &[(&str, &str)]) -> PathBuf {
        let mut yaml = String::from("label: fixture\nentries:\n");
        for (id, implementation) in entries {
            yaml.push_str(&format!(
                concat!(
                    "  - id: {id}\n    name: Test {id}\n    category: Fixture\n",
                    "    implementation: \"{implementation}\"\n",
                ),
                id = id,
                implementation = implementation,
            ));
        }
        if entries.is_empty() {
            yaml = "label: fixture\nentries: []\n".to_string();
        }
        self.write("manifest.yaml", &yaml)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// Sink that keeps results in memory, optionally failing on flush
pub struct MemorySink {
    format: ReportFormat,
    fail: bool,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            fail: false,
            seen: Arc::default(),
        }
    }

    pub fn failing(format: ReportFormat) -> Self {
        Self {
            fail: true,
            ..Self::new(format)
        }
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    fn format(&self) -> ReportFormat {
        self.format
    }

    fn add_result(&mut self, result: &TestResult) {
        self.seen.lock().push(result.test.id.clone());
    }

    async fn generate_report(&self, output_path: &Path) -> HarnessResult<PathBuf> {
        if self.fail {
            return Err(HarnessError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        Ok(output_path.to_path_buf())
    }
}
