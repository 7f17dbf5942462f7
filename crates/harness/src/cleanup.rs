//! Teardown run on every exit path: fixtures, then the subject, then scratch storage

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::client::TestClient;
use crate::server::ProcessLifecycleManager;

pub struct CleanupCoordinator {
    data_directory: Option<PathBuf>,
    runs: usize,
}

impl CleanupCoordinator {
    pub fn new(data_directory: Option<PathBuf>) -> Self {
        Self {
            data_directory,
            runs: 0,
        }
    }

    pub fn data_directory(&self) -> Option<&Path> {
        self.data_directory.as_deref()
    }

    /// Number of times `run` has completed
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Tear everything down. Safe to call any number of times; never fails.
    ///
    /// The data directory is only removed once the subject has stopped, so a
    /// managed subject cannot recreate files behind the removal.
    pub async fn run(&mut self, client: Option<&TestClient>, server: &mut ProcessLifecycleManager) {
        if self.runs > 0 {
            debug!("Cleanup already ran; repeating idempotently");
        }

        if let Some(client) = client {
            let deleted = client.cleanup().await;
            if deleted > 0 {
                info!("Deleted {} test resources", deleted);
            }
        }

        server.stop().await;

        if let Some(dir) = &self.data_directory {
            remove_data_directory(dir).await;
        }

        self.runs += 1;
    }
}

async fn remove_data_directory(dir: &Path) {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => info!("Removed data directory {}", dir.display()),
            Err(e) => warn!("Failed to remove data directory {}: {}", dir.display(), e),
        },
        Ok(_) => warn!("Data directory {} is not a directory; leaving it", dir.display()),
        Err(_) => debug!("Data directory {} does not exist", dir.display()),
    }
}
