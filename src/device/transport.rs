use async_trait::async_trait;

use crate::errors::DroidClawResult;

/// Sends one device command (without the `adb` prefix) and returns its stdout.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn run_device_command(&self, cmd: &str) -> DroidClawResult<String>;
}
