use std::path::PathBuf;

use clap::Parser;

/// Drive an Android device toward a goal with an LLM planner.
#[derive(Debug, Clone, Parser)]
#[command(name = "droidclaw", version, about)]
pub struct Cli {
    /// Path to config.toml (default: next to the executable, then the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Goal for the agent; prompted for interactively when omitted
    #[arg(short, long)]
    pub goal: Option<String>,

    /// Device serial, overrides [device].serial
    #[arg(short, long)]
    pub serial: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let cli = Cli::try_parse_from([
            "droidclaw",
            "--config",
            "/etc/droidclaw.toml",
            "--goal",
            "open settings",
            "-s",
            "emulator-5554",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/droidclaw.toml")));
        assert_eq!(cli.goal.as_deref(), Some("open settings"));
        assert_eq!(cli.serial.as_deref(), Some("emulator-5554"));
    }

    #[test]
    fn everything_is_optional() {
        let cli = Cli::try_parse_from(["droidclaw"]).unwrap();
        assert!(cli.config.is_none() && cli.goal.is_none() && cli.serial.is_none());
    }
}
