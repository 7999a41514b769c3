use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::agent_engine::history::Conversation;
use crate::agent_engine::loop_control::{LoopConfig, LoopController};
use crate::agent_engine::notifier::{AgentNotice, Notifier};
use crate::agent_engine::plan_parser;
use crate::agent_engine::state::{
    AbortReason, AgentState, RunReport, Step, StepOutcome, StepRecord, StepStatus,
};
use crate::config::AppConfig;
use crate::device::transport::DeviceTransport;
use crate::executor::dispatcher::{StepExecutor, SETTLE_DELAY};
use crate::executor::validator;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage};
use crate::perception::fetcher::{LayoutArtifact, LayoutFetcher};
use crate::perception::pipeline;

pub const SYSTEM_PROMPT: &str = "\
You are DroidClaw, an agent that operates an Android phone over adb.

Each turn you receive a `UI Context:` message listing the visible elements as
`<label> [<x>,<y>]`, where x,y is the element's centre in screen pixels.
`UI Context: Unknown` means the layout could not be read; act cautiously or wait.

Reply with one directive per line:
Command: <adb arguments without the leading `adb`>
Sleep: <whole seconds to wait after the previous command>

Useful commands:
- shell input tap <x> <y>
- shell input text <text>
- shell input swipe <x1> <y1> <x2> <y2> <duration_ms>
- shell input keyevent <code>   (3 = HOME, 4 = BACK, 66 = ENTER)
- shell monkey -p <package> 1   (launch an app)

Rules:
- Commands run in the order written. Tap a field before typing into it.
- You will see a fresh UI Context after every command.
- When the goal is achieved, reply with exactly: DONE";

/// Knobs for one engine instance, usually derived from `AppConfig`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub remote_dump_path: String,
    pub local_dump_path: PathBuf,
    pub settle_delay: Duration,
    pub loop_config: LoopConfig,
    pub system_prompt: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            remote_dump_path: "/sdcard/window_dump.xml".into(),
            local_dump_path: PathBuf::from("window_dump.xml"),
            settle_delay: SETTLE_DELAY,
            loop_config: LoopConfig::default(),
            system_prompt: SYSTEM_PROMPT.into(),
        }
    }
}

impl EngineConfig {
    pub fn from_app_config(cfg: &AppConfig, system_prompt: Option<String>) -> Self {
        Self {
            remote_dump_path: cfg.device.remote_dump_path.clone(),
            local_dump_path: cfg.device.local_dump_path.clone(),
            settle_delay: Duration::from_millis(cfg.agent.settle_delay_ms).max(SETTLE_DELAY),
            loop_config: LoopConfig {
                max_turns: cfg.agent.max_turns,
            },
            system_prompt: system_prompt.unwrap_or_else(|| SYSTEM_PROMPT.into()),
        }
    }
}

/// Observe → plan → parse → validate → act, until `DONE` or a fatal step.
///
/// `run` consumes the engine. The layout artifact lives inside it, so the pulled
/// file is deleted however the run ends, including when the future is dropped.
pub struct AgentEngine {
    state: AgentState,
    conversation: Conversation,
    loop_ctrl: LoopController,
    fetcher: LayoutFetcher,
    executor: StepExecutor,
    planner: Arc<dyn LlmProvider>,
    call_cfg: CallConfig,
    notifier: Arc<dyn Notifier>,
    session_id: String,
    steps: Vec<StepRecord>,
}

impl AgentEngine {
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        planner: Arc<dyn LlmProvider>,
        call_cfg: CallConfig,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let fetcher = LayoutFetcher::new(
            transport.clone(),
            config.remote_dump_path,
            LayoutArtifact::new(config.local_dump_path),
        );
        Self {
            state: AgentState::AwaitingGoal,
            conversation: Conversation::new(config.system_prompt),
            loop_ctrl: LoopController::new(config.loop_config),
            fetcher,
            executor: StepExecutor::with_settle_delay(transport, config.settle_delay),
            planner,
            call_cfg,
            notifier,
            session_id: uuid::Uuid::new_v4().to_string(),
            steps: Vec::new(),
        }
    }

    pub async fn run(self, goal: &str) -> RunReport {
        let span = tracing::info_span!("session", id = %self.session_id);
        self.run_loop(goal).instrument(span).await
    }

    async fn run_loop(mut self, goal: &str) -> RunReport {
        loop {
            self.notifier.notify(&AgentNotice::StateChanged {
                state: self.state.clone(),
            });

            match self.state.clone() {
                // ── AwaitingGoal: seed the conversation ───────────────────
                AgentState::AwaitingGoal => {
                    let goal = goal.trim();
                    if goal.is_empty() {
                        tracing::info!("empty goal → Aborted");
                        self.notifier.notify(&AgentNotice::NoGoal);
                        self.state = AgentState::Aborted {
                            reason: AbortReason::NoGoal,
                        };
                        continue;
                    }
                    tracing::info!(goal = %goal, "goal received → Planning");
                    self.conversation.push(ChatMessage::user(goal));
                    self.state = AgentState::Planning;
                }

                // ── Planning: observe, then ask the planner ───────────────
                AgentState::Planning => {
                    if self.loop_ctrl.should_stop() {
                        let turns = self.loop_ctrl.turns();
                        tracing::warn!(turns, "turn limit reached → Aborted");
                        self.state = AgentState::Aborted {
                            reason: AbortReason::TurnLimit { turns },
                        };
                        continue;
                    }
                    self.loop_ctrl.record_turn();

                    self.observe().await;

                    tracing::info!(
                        turn = self.loop_ctrl.turns(),
                        messages = self.conversation.messages().len(),
                        "Planning → calling LLM"
                    );
                    let history = self.conversation.messages().to_vec();
                    match self.planner.chat(history, &self.call_cfg).await {
                        Ok(response) => {
                            if !response.reasoning.is_empty() {
                                tracing::debug!(reasoning = %response.reasoning, "planner reasoning");
                            }
                            tracing::info!(reply = %response.content, "planner replied");
                            self.conversation.push(ChatMessage::assistant(response.content.clone()));
                            self.state = AgentState::ParsingReply {
                                reply: response.content,
                            };
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "LLM call failed → Aborted");
                            self.state = AgentState::Aborted {
                                reason: AbortReason::Planner {
                                    message: e.to_string(),
                                },
                            };
                        }
                    }
                }

                // ── ParsingReply: DONE or a list of steps ─────────────────
                AgentState::ParsingReply { reply } => {
                    if plan_parser::is_terminal(&reply) {
                        tracing::info!("terminal reply → Terminated");
                        self.state = AgentState::Terminated;
                        continue;
                    }
                    let steps = plan_parser::parse(&reply);
                    if steps.is_empty() {
                        tracing::warn!("reply carried no steps; asking again");
                    }
                    tracing::info!(steps = steps.len(), "ParsingReply → Executing");
                    self.state = AgentState::Executing { steps };
                }

                // ── Executing: run steps in order, stop on first failure ──
                AgentState::Executing { steps } => {
                    self.state = self.execute_steps(steps).await;
                }

                AgentState::Terminated => {
                    self.notifier.notify(&AgentNotice::TaskComplete {
                        turns: self.loop_ctrl.turns(),
                    });
                    break;
                }

                AgentState::Aborted { reason } => {
                    if !reason.is_no_goal() {
                        tracing::error!(reason = %reason, "run aborted");
                        self.notifier.notify(&AgentNotice::Aborted { reason });
                    }
                    break;
                }
            }
        }

        tracing::info!(
            turns = self.loop_ctrl.turns(),
            steps = self.steps.len(),
            messages = self.conversation.messages().len(),
            "agent loop ended"
        );

        RunReport {
            session_id: self.session_id,
            final_state: self.state,
            turns: self.loop_ctrl.turns(),
            steps: self.steps,
            conversation: self.conversation.into_messages(),
        }
    }

    /// Returns the next state: `Planning`, or `Aborted` on the first transport failure.
    async fn execute_steps(&mut self, steps: Vec<Step>) -> AgentState {
        let total = steps.len();
        for (idx, step) in steps.into_iter().enumerate() {
            let step = match validator::normalize(step.clone()) {
                Ok(step) => step,
                Err(rejection) => {
                    tracing::warn!(action = %step.action, reason = %rejection, "step rejected, skipping");
                    self.notifier.notify(&AgentNotice::StepRejected {
                        action: step.action.clone(),
                        reason: rejection.to_string(),
                    });
                    self.record(step, StepStatus::Rejected(rejection.to_string()));
                    self.observe().await;
                    continue;
                }
            };

            tracing::info!(step = idx + 1, of = total, action = %step.action, "Executing");
            let outcome = self.executor.execute(&step).await;
            self.observe().await;

            match outcome {
                StepOutcome::Success => self.record(step, StepStatus::Succeeded),
                StepOutcome::Failure(message) => {
                    self.notifier.notify(&AgentNotice::StepFailed {
                        action: step.action.clone(),
                        message: message.clone(),
                    });
                    self.record(step.clone(), StepStatus::Failed(message.clone()));
                    tracing::warn!(
                        abandoned = total - idx - 1,
                        "step failed → Aborted"
                    );
                    return AgentState::Aborted {
                        reason: AbortReason::StepFailed {
                            action: step.action,
                            message,
                        },
                    };
                }
            }
        }
        AgentState::Planning
    }

    async fn observe(&mut self) {
        let ctx = pipeline::observe(&self.fetcher).await;
        self.conversation.push(ChatMessage::system(ctx.to_message()));
    }

    fn record(&mut self, step: Step, status: StepStatus) {
        self.steps.push(StepRecord {
            step,
            status,
            timestamp: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;
    use crate::testing::{FakeDevice, RecordingNotifier, ScriptedPlanner};

    const LAYOUT: &str = r#"<hierarchy>
        <node text="Search" class="android.widget.EditText" bounds="[0,100][1080,200]"/>
    </hierarchy>"#;

    struct Harness {
        device: Arc<FakeDevice>,
        planner: Arc<ScriptedPlanner>,
        notifier: Arc<RecordingNotifier>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(replies: &[&str]) -> Self {
            Self {
                device: Arc::new(FakeDevice::with_layout(LAYOUT)),
                planner: Arc::new(ScriptedPlanner::new(replies.iter().copied())),
                notifier: Arc::new(RecordingNotifier::default()),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn config(&self) -> EngineConfig {
            EngineConfig {
                local_dump_path: self.dir.path().join("window_dump.xml"),
                ..Default::default()
            }
        }

        fn engine_with(&self, config: EngineConfig) -> AgentEngine {
            AgentEngine::new(
                self.device.clone(),
                self.planner.clone(),
                CallConfig {
                    model: "test".into(),
                    stream: false,
                    temperature: 0.0,
                },
                self.notifier.clone(),
                config,
            )
        }

        async fn run(&self, goal: &str) -> RunReport {
            self.engine_with(self.config()).run(goal).await
        }
    }

    fn roles(report: &RunReport) -> Vec<Role> {
        report.conversation.iter().map(|m| m.role).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn tap_with_sleep_executes_then_reobserves() {
        let h = Harness::new(&["Command: shell input tap 100 200\nSleep: 2", "DONE"]);
        let start = tokio::time::Instant::now();

        let report = h.run("open search").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert_eq!(h.device.action_calls(), vec!["shell input tap 100 200"]);
        assert!(start.elapsed() >= SETTLE_DELAY + Duration::from_millis(2000));
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].status, StepStatus::Succeeded);
        assert_eq!(report.steps[0].step.sleep_ms, 2000);

        // system prompt, goal, context, reply, context after the step,
        // context for the second turn, DONE
        assert_eq!(
            roles(&report),
            vec![
                Role::System,
                Role::User,
                Role::System,
                Role::Assistant,
                Role::System,
                Role::System,
                Role::Assistant,
            ]
        );
        assert_eq!(report.conversation[4].content, "UI Context: Search [540,150]");
        assert_eq!(report.conversation[5].content, "UI Context: Search [540,150]");

        // The second planning turn saw both observations, the planning one last.
        let requests = h.planner.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 6);
        assert_eq!(requests[1].last(), Some(&report.conversation[5]));
        assert!(h.notifier.saw(|n| matches!(n, AgentNotice::TaskComplete { turns: 2 })));
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_tap_is_skipped_and_loop_replans() {
        let h = Harness::new(&["Command: shell input tap 100\nDONE", "DONE"]);

        let report = h.run("tap something").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert!(h.device.action_calls().is_empty());
        assert_eq!(h.planner.requests().len(), 2);
        assert_eq!(
            report.steps[0].status,
            StepStatus::Rejected("missing coordinates".into())
        );
        assert!(h.notifier.saw(|n| matches!(n, AgentNotice::StepRejected { .. })));
        // context, reply, context after the skipped tap, context for turn two, DONE
        assert_eq!(
            roles(&report)[2..],
            [Role::System, Role::Assistant, Role::System, Role::System, Role::Assistant]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_turn_and_every_attempted_step_is_observed() {
        let h = Harness::new(&[
            "Command: shell input tap 100",
            "Command: shell input keyevent 3",
            "DONE",
        ]);

        let report = h.run("go home").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert_eq!(h.device.action_calls(), vec!["shell input keyevent 3"]);
        let contexts = report
            .conversation
            .iter()
            .filter(|m| m.content.starts_with("UI Context:"))
            .count();
        // three planning turns plus one per attempted step
        assert_eq!(contexts, 5);
        assert_eq!(
            roles(&report),
            vec![
                Role::System,
                Role::User,
                Role::System,
                Role::Assistant,
                Role::System,
                Role::System,
                Role::Assistant,
                Role::System,
                Role::System,
                Role::Assistant,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_aborts_remaining_steps() {
        let h = Harness::new(&[
            "Command: shell input tap 1 2\nCommand: shell input text hi\nCommand: shell input keyevent 66",
        ]);
        h.device.fail_when("input tap");

        let report = h.run("type hi").await;

        assert!(matches!(
            report.abort_reason(),
            Some(AbortReason::StepFailed { action, .. }) if action == "shell input tap 1 2"
        ));
        assert_eq!(h.device.action_calls(), vec!["shell input tap 1 2"]);
        assert_eq!(h.planner.requests().len(), 1);
        assert_eq!(report.steps.len(), 1);
        // The failed step is still followed by an observation.
        assert_eq!(report.conversation.last().map(|m| m.role), Some(Role::System));
        assert!(h.notifier.saw(|n| matches!(n, AgentNotice::StepFailed { .. })));
        assert!(h.notifier.saw(|n| matches!(n, AgentNotice::Aborted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn done_reply_terminates_without_executing() {
        let h = Harness::new(&["  done \n"]);

        let report = h.run("nothing to do").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert!(report.steps.is_empty());
        assert!(h.device.action_calls().is_empty());
        assert_eq!(report.conversation.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_goal_is_a_noop() {
        let h = Harness::new(&[]);

        let report = h.run("   ").await;

        assert_eq!(report.abort_reason(), Some(&AbortReason::NoGoal));
        assert!(h.planner.requests().is_empty());
        assert!(h.device.calls().is_empty());
        assert!(h.notifier.saw(|n| *n == AgentNotice::NoGoal));
        assert!(!h.notifier.saw(|n| matches!(n, AgentNotice::Aborted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn advisory_reply_prompts_again_with_fresh_context() {
        let h = Harness::new(&["I need to look at the screen first.", "DONE"]);

        let report = h.run("look around").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert!(report.steps.is_empty());
        assert_eq!(
            roles(&report),
            vec![Role::System, Role::User, Role::System, Role::Assistant, Role::System, Role::Assistant]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_layout_is_reported_as_unknown() {
        let h = Harness::new(&["DONE"]);
        h.device.fail_when("uiautomator");

        let report = h.run("anything").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert_eq!(report.conversation[2].content, "UI Context: Unknown");
    }

    #[tokio::test(start_paused = true)]
    async fn planner_error_aborts() {
        let h = Harness::new(&[]);
        h.planner.push_error("503 Service Unavailable");

        let report = h.run("anything").await;

        assert!(matches!(report.abort_reason(), Some(AbortReason::Planner { .. })));
        assert!(h.device.action_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn turn_limit_aborts() {
        let h = Harness::new(&["Command: shell input keyevent 3"; 5]);
        let config = EngineConfig {
            loop_config: LoopConfig { max_turns: Some(2) },
            ..h.config()
        };

        let report = h.engine_with(config).run("loop forever").await;

        assert_eq!(report.abort_reason(), Some(&AbortReason::TurnLimit { turns: 2 }));
        assert_eq!(h.planner.requests().len(), 2);
        assert_eq!(h.device.action_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_append_only_across_turns() {
        let h = Harness::new(&[
            "Command: shell input tap 10 10",
            "Command: shell input text open app\nSleep: 1",
            "DONE",
        ]);

        let report = h.run("search").await;

        let requests = h.planner.requests();
        assert_eq!(requests.len(), 3);
        for pair in requests.windows(2) {
            assert!(pair[1].len() > pair[0].len());
            assert_eq!(&pair[1][..pair[0].len()], &pair[0][..]);
        }
        assert!(report.conversation.starts_with(requests.last().unwrap()));
        assert_eq!(
            h.device.action_calls(),
            vec!["shell input tap 10 10", "shell input text open%sapp"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_settle_delay_in_config_still_waits() {
        let mut app = AppConfig::default();
        app.agent.settle_delay_ms = 0;
        let from_app = EngineConfig::from_app_config(&app, None);
        assert_eq!(from_app.settle_delay, SETTLE_DELAY);

        let h = Harness::new(&["Command: shell input keyevent 3", "DONE"]);
        let config = EngineConfig {
            settle_delay: Duration::ZERO,
            ..h.config()
        };
        let start = tokio::time::Instant::now();

        let report = h.engine_with(config).run("go home").await;

        assert_eq!(report.final_state, AgentState::Terminated);
        assert!(start.elapsed() >= SETTLE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn artifact_is_removed_when_run_ends() {
        let h = Harness::new(&["DONE"]);
        let path = h.dir.path().join("window_dump.xml");

        h.run("anything").await;

        assert!(!path.exists());
    }
}
