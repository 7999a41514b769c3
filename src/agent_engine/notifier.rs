use serde::{Deserialize, Serialize};

use crate::agent_engine::state::{AbortReason, AgentState};

/// User-facing events raised by the agent loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentNotice {
    StateChanged { state: AgentState },
    NoGoal,
    StepRejected { action: String, reason: String },
    StepFailed { action: String, message: String },
    TaskComplete { turns: u32 },
    Aborted { reason: AbortReason },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &AgentNotice);
}

/// Prints notices for the person at the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &AgentNotice) {
        match notice {
            AgentNotice::StateChanged { state } => {
                tracing::debug!(?state, "agent state changed");
            }
            AgentNotice::NoGoal => eprintln!("[DroidClaw] No goal given, nothing to do."),
            AgentNotice::StepRejected { action, reason } => {
                eprintln!("[DroidClaw] Skipped `{action}`: {reason}");
            }
            AgentNotice::StepFailed { action, message } => {
                eprintln!("[DroidClaw] `{action}` failed: {message}");
            }
            AgentNotice::TaskComplete { turns } => {
                eprintln!("[DroidClaw] Task complete after {turns} planning turn(s).");
            }
            AgentNotice::Aborted { reason } => eprintln!("[DroidClaw] Aborted: {reason}"),
        }
    }
}
