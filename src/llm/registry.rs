use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, LlmConfig};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn new(llm_config: LlmConfig) -> Self {
        Self {
            providers: HashMap::new(),
            active: llm_config.active_provider.clone(),
            llm_config,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> DroidClawResult<Arc<dyn LlmProvider>> {
        self.providers.get(&self.active).cloned().ok_or_else(|| {
            DroidClawError::Config(format!("Active provider '{}' not found in registry", self.active))
        })
    }

    /// Provider and call configuration for planning turns.
    ///
    /// Resolution order:
    /// 1. `[llm.planner]` in config.toml
    /// 2. Fallback: active provider with its default model / temperature / stream flag
    pub fn planner(&self) -> DroidClawResult<(Arc<dyn LlmProvider>, CallConfig)> {
        if let Some(entry) = &self.llm_config.planner {
            let provider = self.providers.get(&entry.provider).cloned().ok_or_else(|| {
                DroidClawError::Config(format!(
                    "planner references unknown provider '{}'",
                    entry.provider
                ))
            })?;
            let temperature = entry.temperature.unwrap_or_else(|| {
                self.llm_config
                    .providers
                    .get(&entry.provider)
                    .map(|p| p.temperature)
                    .unwrap_or(0.1)
            });
            tracing::debug!(
                provider = %entry.provider,
                model = %entry.model,
                stream = entry.stream,
                temperature,
                "resolved planner config"
            );
            return Ok((
                provider,
                CallConfig {
                    model: entry.model.clone(),
                    stream: entry.stream,
                    temperature,
                },
            ));
        }

        let provider = self.get_active()?;
        let (model, temperature, stream) = self
            .llm_config
            .providers
            .get(&self.active)
            .map(|p| (p.model.clone(), p.temperature, p.stream))
            .unwrap_or_else(|| (String::new(), 0.1, false));
        tracing::debug!(
            provider = %self.active,
            model = %model,
            "planner not configured, using active provider"
        );
        Ok((provider, CallConfig { model, stream, temperature }))
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `DROIDCLAW_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(config.llm.clone());
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(format!("DROIDCLAW_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            if api_key.is_empty() {
                tracing::warn!(provider = %id, "no API key configured");
            }
            let provider = OpenAiCompatibleProvider::new(id.clone(), entry.api_base.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        registry
    }
}
