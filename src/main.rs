use std::process::ExitCode;

use clap::Parser;

use droidclaw_lib::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match droidclaw_lib::run(cli).await {
        Ok(report) if report.abort_reason().is_some_and(|r| !r.is_no_goal()) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[DroidClaw] {e}");
            ExitCode::FAILURE
        }
    }
}
