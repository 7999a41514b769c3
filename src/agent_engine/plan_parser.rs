/// Planner reply → ordered steps.
///
/// The reply protocol is one directive per line:
///
/// ```text
/// Command: shell input tap 540 1200
/// Sleep: 2
/// Command: shell input text hello world
/// ```
///
/// `DONE` alone ends the task. Lines that match no directive are ignored;
/// the planner's formatting is not guaranteed.
use crate::agent_engine::state::Step;

pub const TERMINAL_KEYWORD: &str = "DONE";
const COMMAND_MARKER: &str = "Command:";
const SLEEP_MARKER: &str = "Sleep:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    Command(&'a str),
    /// Seconds; `None` when the value is not a non-negative integer.
    Sleep(Option<u64>),
    Terminal,
    Other,
}

pub fn classify(line: &str) -> Directive<'_> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(COMMAND_MARKER) {
        Directive::Command(rest.trim())
    } else if let Some(rest) = line.strip_prefix(SLEEP_MARKER) {
        Directive::Sleep(rest.trim().parse().ok())
    } else if line.eq_ignore_ascii_case(TERMINAL_KEYWORD) {
        Directive::Terminal
    } else {
        Directive::Other
    }
}

/// True when the whole reply is the terminal keyword.
pub fn is_terminal(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case(TERMINAL_KEYWORD)
}

pub fn parse(reply: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut open: Option<Step> = None;

    for line in reply.lines() {
        match classify(line) {
            Directive::Command(action) => {
                steps.extend(open.take());
                open = Some(Step::new(action));
            }
            Directive::Sleep(Some(secs)) => match open.as_mut() {
                Some(step) => step.sleep_ms = secs.saturating_mul(1000),
                None => tracing::debug!(line, "sleep directive without a command, ignored"),
            },
            Directive::Sleep(None) => tracing::debug!(line, "unparsable sleep directive, ignored"),
            Directive::Terminal | Directive::Other => {}
        }
    }
    steps.extend(open);

    tracing::debug!(count = steps.len(), "reply parsed");
    steps
}
