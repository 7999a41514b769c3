use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::state::{Step, StepOutcome};
use crate::device::transport::DeviceTransport;

/// Wait after every successful action. The device offers no UI-ready signal,
/// so the next observation only happens after this much time has passed.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Sends normalized steps to the device.
pub struct StepExecutor {
    transport: Arc<dyn DeviceTransport>,
    settle_delay: Duration,
}

impl StepExecutor {
    pub fn new(transport: Arc<dyn DeviceTransport>) -> Self {
        Self::with_settle_delay(transport, SETTLE_DELAY)
    }

    /// `settle_delay` can lengthen the wait but never shorten it below `SETTLE_DELAY`.
    pub fn with_settle_delay(transport: Arc<dyn DeviceTransport>, settle_delay: Duration) -> Self {
        Self {
            transport,
            settle_delay: settle_delay.max(SETTLE_DELAY),
        }
    }

    pub async fn execute(&self, step: &Step) -> StepOutcome {
        tracing::info!(action = %step.action, sleep_ms = step.sleep_ms, "executing step");

        match self.transport.run_device_command(&step.action).await {
            Ok(output) => {
                if !output.is_empty() {
                    tracing::debug!(output = %output, "device output");
                }
                tokio::time::sleep(self.settle_delay).await;
                if step.sleep_ms > 0 {
                    tracing::debug!(ms = step.sleep_ms, "requested delay");
                    tokio::time::sleep(Duration::from_millis(step.sleep_ms)).await;
                }
                StepOutcome::Success
            }
            Err(e) => {
                tracing::error!(action = %step.action, error = %e, "step failed");
                StepOutcome::Failure(e.to_string())
            }
        }
    }
}
