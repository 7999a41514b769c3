use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::device::transport::DeviceTransport;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::layout::LayoutTree;

/// Owns the local copy of the pulled layout dump and deletes it when dropped.
pub struct LayoutArtifact {
    path: PathBuf,
}

impl LayoutArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes a previous pull so a failed transfer cannot be mistaken for a fresh one.
    fn clear(&self) -> DroidClawResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LayoutArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "layout artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "layout artifact cleanup failed"),
        }
    }
}

/// Dumps the device UI hierarchy, pulls it to the host and parses it.
pub struct LayoutFetcher {
    transport: Arc<dyn DeviceTransport>,
    remote_path: String,
    artifact: LayoutArtifact,
}

impl LayoutFetcher {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        remote_path: impl Into<String>,
        artifact: LayoutArtifact,
    ) -> Self {
        Self {
            transport,
            remote_path: remote_path.into(),
            artifact,
        }
    }

    /// Returns `None` on any failure. A missing layout is an ordinary outcome
    /// (the screen may be mid-transition) and must not stop the agent.
    pub async fn fetch(&self) -> Option<LayoutTree> {
        match self.try_fetch().await {
            Ok(tree) => Some(tree),
            Err(e) => {
                tracing::warn!(error = %e, "layout fetch failed; continuing without observation");
                None
            }
        }
    }

    async fn try_fetch(&self) -> DroidClawResult<LayoutTree> {
        self.artifact.clear()?;

        self.transport
            .run_device_command(&format!("shell uiautomator dump {}", self.remote_path))
            .await?;
        self.transport
            .run_device_command(&format!(
                "pull {} {}",
                self.remote_path,
                self.artifact.path().display()
            ))
            .await?;

        let xml = match tokio::fs::read_to_string(self.artifact.path()).await {
            Ok(xml) => xml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DroidClawError::Layout(format!(
                    "pulled layout not found at {}",
                    self.artifact.path().display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let tree = LayoutTree::parse(&xml)?;
        tracing::debug!(bytes = xml.len(), "layout dump parsed");
        Ok(tree)
    }
}
