//! In-memory device and planner doubles shared by the unit tests.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::agent_engine::notifier::{AgentNotice, Notifier};
use crate::device::transport::DeviceTransport;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// Records every command. `pull <remote> <local>` writes the configured layout to `<local>`.
#[derive(Default)]
pub struct FakeDevice {
    layout: Mutex<Option<String>>,
    fail_on: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeDevice {
    pub fn with_layout(xml: &str) -> Self {
        let device = Self::default();
        *device.layout.lock().unwrap() = Some(xml.to_string());
        device
    }

    /// Any command containing `needle` fails from now on.
    pub fn fail_when(&self, needle: &str) {
        self.fail_on.lock().unwrap().push(needle.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands other than the layout dump/pull pair.
    pub fn action_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("shell uiautomator dump") && !c.starts_with("pull "))
            .collect()
    }
}

#[async_trait]
impl DeviceTransport for FakeDevice {
    async fn run_device_command(&self, cmd: &str) -> DroidClawResult<String> {
        self.calls.lock().unwrap().push(cmd.to_string());

        if self.fail_on.lock().unwrap().iter().any(|n| cmd.contains(n.as_str())) {
            return Err(DroidClawError::Transport(format!("device rejected `{cmd}`")));
        }

        if let Some(rest) = cmd.strip_prefix("pull ") {
            let local = rest.split_whitespace().nth(1).unwrap_or_default();
            if let Some(xml) = self.layout.lock().unwrap().as_ref() {
                std::fs::write(local, xml)?;
            }
        }
        Ok(String::new())
    }
}

/// Replays canned replies in order and records the history it was shown.
#[derive(Default)]
pub struct ScriptedPlanner {
    replies: Mutex<VecDeque<DroidClawResult<String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedPlanner {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(DroidClawError::LlmProvider(message.to_string())));
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedPlanner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, messages: Vec<ChatMessage>, _cfg: &CallConfig) -> DroidClawResult<LlmResponse> {
        self.requests.lock().unwrap().push(messages);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("DONE".to_string()));
        next.map(|content| LlmResponse {
            content,
            reasoning: String::new(),
        })
    }
}

/// Keeps every notice for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<AgentNotice>>,
}

impl RecordingNotifier {
    pub fn saw(&self, pred: impl Fn(&AgentNotice) -> bool) -> bool {
        self.notices.lock().unwrap().iter().any(pred)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &AgentNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
