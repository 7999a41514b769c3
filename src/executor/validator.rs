/// Pre-execution checks on planner steps.
///
/// Only the tap and text shapes are inspected. Everything else (swipes, key
/// events, `am start`, …) goes to the device as written; the command
/// vocabulary is open-ended.
use crate::agent_engine::state::Step;
use crate::errors::StepRejection;
use crate::executor::text_input::escape_spaces;

const TRANSPORT_PREFIX: &str = "adb";

/// Splits off up to `n` whitespace-separated tokens and returns them with the
/// untouched remainder (leading whitespace included).
fn leading_tokens(s: &str, n: usize) -> (Vec<&str>, &str) {
    let mut rest = s;
    let mut tokens = Vec::with_capacity(n);
    for _ in 0..n {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            rest = trimmed;
            break;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        tokens.push(&trimmed[..end]);
        rest = &trimmed[end..];
    }
    (tokens, rest)
}

/// Drops a redundant `adb` (and `adb -s <serial>`) prefix; the transport adds its own.
fn strip_transport_prefix(action: &str) -> &str {
    let (first, rest) = leading_tokens(action, 1);
    if first.first() != Some(&TRANSPORT_PREFIX) {
        return action.trim();
    }
    let (flag, after_flag) = leading_tokens(rest, 2);
    match flag.as_slice() {
        // `-s` with or without a serial; a bare `-s` leaves nothing to run.
        ["-s", ..] => after_flag.trim(),
        _ => rest.trim(),
    }
}

pub fn normalize(step: Step) -> Result<Step, StepRejection> {
    let action = strip_transport_prefix(&step.action);
    if action.is_empty() {
        return Err(StepRejection::EmptyAction);
    }

    let (head, rest) = leading_tokens(action, 3);
    let action = match head.as_slice() {
        ["shell", "input", "text"] => {
            let payload = rest.trim_start();
            if payload.is_empty() {
                return Err(StepRejection::MissingText);
            }
            format!("shell input text {}", escape_spaces(payload))
        }
        ["shell", "input", "tap"] => {
            if rest.split_whitespace().count() < 2 {
                return Err(StepRejection::MissingCoordinates);
            }
            action.to_string()
        }
        _ => action.to_string(),
    };

    Ok(Step {
        action,
        sleep_ms: step.sleep_ms,
    })
}
