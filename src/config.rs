use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{DroidClawError, DroidClawResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
    /// Overrides the provider/model used for planning turns.
    #[serde(default)]
    pub planner: Option<RoleEntry>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderEntry {
                display_name: "OpenAI".into(),
                api_base: "https://api.openai.com/v1/chat/completions".into(),
                model: "gpt-4o".into(),
                temperature: default_temperature(),
                api_key: None,
                stream: false,
            },
        );
        Self {
            active_provider: "openai".into(),
            providers,
            planner: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider.
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var DROIDCLAW_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [llm.providers.*].
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    /// Overrides the provider-level temperature.
    pub temperature: Option<f64>,
}

fn default_temperature() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Target device serial, passed as `adb -s <serial>`.
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default = "default_remote_dump_path")]
    pub remote_dump_path: String,
    #[serde(default = "default_local_dump_path")]
    pub local_dump_path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            serial: None,
            remote_dump_path: default_remote_dump_path(),
            local_dump_path: default_local_dump_path(),
        }
    }
}

fn default_adb_path() -> String {
    "adb".into()
}

fn default_remote_dump_path() -> String {
    "/sdcard/window_dump.xml".into()
}

fn default_local_dump_path() -> PathBuf {
    PathBuf::from("window_dump.xml")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Wait after each successful step. Values below the built-in 1000 ms are raised to it.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Planning turns before the run is aborted. Unset means no limit.
    #[serde(default)]
    pub max_turns: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            max_turns: None,
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    crate::executor::dispatcher::SETTLE_DELAY.as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptsConfig {
    /// Replaces the built-in planner system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
}

impl PromptsConfig {
    pub fn load_system_prompt(&self) -> DroidClawResult<Option<String>> {
        match &self.system_prompt_file {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> DroidClawResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(DroidClawError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("droidclaw").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(DroidClawError::Config(
        "config.toml not found next to executable, in working directory or user config dir".into(),
    ))
}

pub fn parse_config(content: &str) -> DroidClawResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if !config.llm.providers.contains_key(&config.llm.active_provider) {
        return Err(DroidClawError::Config(format!(
            "active provider '{}' has no [llm.providers] entry",
            config.llm.active_provider
        )));
    }
    Ok(config)
}

pub fn load_config(explicit: Option<&Path>) -> DroidClawResult<AppConfig> {
    let path = resolve_config_path(explicit)?;
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}
