pub mod agent_engine;
pub mod cli;
pub mod config;
pub mod device;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::agent_engine::engine::{AgentEngine, EngineConfig};
use crate::agent_engine::notifier::ConsoleNotifier;
use crate::agent_engine::state::RunReport;
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::device::adb::AdbTransport;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::registry::ProviderRegistry;

pub async fn run(cli: Cli) -> DroidClawResult<RunReport> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let mut cfg = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) if cli.config.is_some() => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "no config loaded; using built-in defaults");
            AppConfig::default()
        }
    };
    if let Some(serial) = cli.serial {
        cfg.device.serial = Some(serial);
    }

    let transport = Arc::new(AdbTransport::from_config(&cfg.device));
    transport.check_connection().await?;

    let registry = ProviderRegistry::from_config(&cfg);
    let (planner, call_cfg) = registry.planner()?;
    let system_prompt = cfg.prompts.load_system_prompt()?;

    let goal = match cli.goal {
        Some(goal) => goal,
        None => prompt_goal().await?,
    };

    let engine = AgentEngine::new(
        transport,
        planner,
        call_cfg,
        Arc::new(ConsoleNotifier),
        EngineConfig::from_app_config(&cfg, system_prompt),
    );

    // Dropping the engine on Ctrl-C still removes the pulled layout file.
    let report = tokio::select! {
        report = engine.run(&goal) => report,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted by user");
            return Err(DroidClawError::Agent("interrupted".into()));
        }
    };

    tracing::info!(
        session = %report.session_id,
        state = ?report.final_state,
        turns = report.turns,
        steps = report.steps.len(),
        "run finished"
    );
    Ok(report)
}

async fn prompt_goal() -> DroidClawResult<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"What should I do on the device? ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}
