use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DeviceConfig;
use crate::device::transport::DeviceTransport;
use crate::errors::{DroidClawError, DroidClawResult};

/// Runs commands through the `adb` binary on the host.
pub struct AdbTransport {
    pub adb_path: String,
    pub serial: Option<String>,
}

impl AdbTransport {
    pub fn new(adb_path: String, serial: Option<String>) -> Self {
        Self { adb_path, serial }
    }

    pub fn from_config(cfg: &DeviceConfig) -> Self {
        Self::new(cfg.adb_path.clone(), cfg.serial.clone())
    }

    fn args_for<'a>(&'a self, cmd: &'a str) -> Vec<&'a str> {
        let mut args = Vec::new();
        if let Some(serial) = &self.serial {
            args.push("-s");
            args.push(serial.as_str());
        }
        args.extend(cmd.split_whitespace());
        args
    }

    /// Fails unless `adb get-state` reports an attached, authorized device.
    pub async fn check_connection(&self) -> DroidClawResult<()> {
        let state = self.run_device_command("get-state").await?;
        if state.trim() == "device" {
            tracing::info!(serial = ?self.serial, "device connected");
            Ok(())
        } else {
            Err(DroidClawError::Transport(format!(
                "device not ready (state: {})",
                state.trim()
            )))
        }
    }
}

#[async_trait]
impl DeviceTransport for AdbTransport {
    async fn run_device_command(&self, cmd: &str) -> DroidClawResult<String> {
        let args = self.args_for(cmd);
        tracing::debug!(adb = %self.adb_path, args = ?args, "running device command");

        let output = Command::new(&self.adb_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| DroidClawError::Transport(format!("failed to execute {}: {e}", self.adb_path)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DroidClawError::Transport(
                format!("`adb {cmd}` failed ({}): {stderr}", output.status)
                    .trim()
                    .to_string(),
            ))
        }
    }
}
