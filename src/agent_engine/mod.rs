pub mod engine;
pub mod history;
pub mod loop_control;
pub mod notifier;
pub mod plan_parser;
pub mod state;
