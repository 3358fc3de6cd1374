use std::time::Duration;

use super::ollama::OLLAMA_HOST;

#[derive(Debug, Clone)]
pub struct OllamaProviderConfig {
    pub host: String,
    /// Context window requested on every generate and chat call
    pub num_ctx: Option<u32>,
    pub generate_timeout: Duration,
    pub embed_timeout: Duration,
    pub health_timeout: Duration,
}

impl OllamaProviderConfig {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn with_num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }
}

impl Default for OllamaProviderConfig {
    fn default() -> Self {
        Self {
            host: OLLAMA_HOST.to_string(),
            num_ctx: None,
            // Large local models can take minutes to load and answer
            generate_timeout: Duration::from_secs(300),
            embed_timeout: Duration::from_secs(60),
            health_timeout: Duration::from_secs(5),
        }
    }
}
