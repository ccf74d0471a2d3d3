use std::env;
use std::time::Duration;

use crate::errors::EngineError;

const DEFAULT_BASE_URL: &str = "http://localhost:1234";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how to reach the OpenAI-compatible endpoint.
///
/// Defaults target a keyless local server; cloud endpoints get a base URL
/// override and an API key.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) model: String,
    pub(crate) timeout: Duration,
}

impl EndpointConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `JOBMATE_MODEL` (required), `JOBMATE_API_BASE`, and
    /// `JOBMATE_API_KEY` with `OPENAI_API_KEY` as fallback.
    pub fn from_env() -> Result<Self, EngineError> {
        let model = env::var("JOBMATE_MODEL")
            .map_err(|_| EngineError::config("JOBMATE_MODEL is not set"))?;
        let mut config = Self::new(model);
        if let Ok(base) = env::var("JOBMATE_API_BASE")
            && !base.is_empty()
        {
            config.base_url = base;
        }
        if let Ok(key) = env::var("JOBMATE_API_KEY").or_else(|_| env::var("OPENAI_API_KEY"))
            && !key.is_empty()
        {
            config.api_key = Some(key);
        }
        Ok(config)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the streaming chat-completions endpoint.
    pub(crate) fn chat_completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }
}
