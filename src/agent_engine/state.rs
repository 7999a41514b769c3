use std::fmt;

use crate::llm::types::ChatMessage;

/// Lifecycle states of the DroidClaw agent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentState {
    AwaitingGoal,
    Planning,
    ParsingReply { reply: String },
    Executing { steps: Vec<Step> },
    Terminated,
    Aborted { reason: AbortReason },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The user gave no goal; nothing was attempted.
    NoGoal,
    StepFailed { action: String, message: String },
    Planner { message: String },
    TurnLimit { turns: u32 },
}

impl AbortReason {
    pub fn is_no_goal(&self) -> bool {
        matches!(self, AbortReason::NoGoal)
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoGoal => write!(f, "no goal provided"),
            AbortReason::StepFailed { action, message } => {
                write!(f, "step `{action}` failed: {message}")
            }
            AbortReason::Planner { message } => write!(f, "planner call failed: {message}"),
            AbortReason::TurnLimit { turns } => write!(f, "turn limit reached after {turns} turns"),
        }
    }
}

/// One planner-proposed device command plus an optional post-action delay.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Step {
    /// Device command without the `adb` prefix, e.g. `shell input tap 100 200`.
    pub action: String,
    pub sleep_ms: u64,
}

impl Step {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            sleep_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StepOutcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed(String),
    Rejected(String),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Summary handed back once the loop reaches a final state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub session_id: String,
    pub final_state: AgentState,
    pub turns: u32,
    pub steps: Vec<StepRecord>,
    pub conversation: Vec<ChatMessage>,
}

impl RunReport {
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.final_state {
            AgentState::Aborted { reason } => Some(reason),
            _ => None,
        }
    }
}
