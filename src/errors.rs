use thiserror::Error;

#[derive(Debug, Error)]
pub enum DroidClawError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device transport error: {0}")]
    Transport(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("SSE parsing error: {0}")]
    SseParsing(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl serde::Serialize for DroidClawError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type DroidClawResult<T> = Result<T, DroidClawError>;

/// Why a planned step was dropped before reaching the device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepRejection {
    #[error("missing coordinates")]
    MissingCoordinates,

    #[error("missing text payload")]
    MissingText,

    #[error("empty command")]
    EmptyAction,
}
