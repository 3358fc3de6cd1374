use std::sync::Arc;
use std::time::Duration;

use proteus::agent::{AgentConfig, Orchestrator};
use proteus::clients::base::{PageFetcher, VectorStore, WebSearch};
use proteus::clients::fetcher::HttpPageFetcher;
use proteus::clients::qdrant::QdrantClient;
use proteus::clients::searxng::SearxngClient;
use proteus::errors::ClientResult;
use proteus::providers::base::CompletionClient;
use proteus::providers::ollama::OllamaProvider;

use crate::configuration::Settings;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn CompletionClient>,
    pub store: Arc<dyn VectorStore>,
    pub search: Arc<dyn WebSearch>,
    pub orchestrator: Orchestrator,
    /// Model id that selects the orchestration on the OpenAI routes
    pub agent_alias: String,
    pub log_agent_output: bool,
}

impl AppState {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        store: Arc<dyn VectorStore>,
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
        config: AgentConfig,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            llm.clone(),
            store.clone(),
            search.clone(),
            fetcher,
            config,
        );
        Self {
            llm,
            store,
            search,
            orchestrator,
            agent_alias: "proteus".to_string(),
            log_agent_output: true,
        }
    }

    pub fn from_settings(settings: &Settings) -> ClientResult<Self> {
        let llm = Arc::new(OllamaProvider::new(settings.ollama.provider_config())?);
        let store = Arc::new(QdrantClient::new(settings.qdrant.client_config())?);
        let search = Arc::new(SearxngClient::new(settings.searxng.client_config())?);
        let fetcher = Arc::new(HttpPageFetcher::new(FETCH_TIMEOUT)?);

        let mut state = Self::new(llm, store, search, fetcher, settings.agent_config());
        state.agent_alias = settings.models.alias.clone();
        state.log_agent_output = settings.logging.log_agent_output;
        Ok(state)
    }

    pub fn agent_config(&self) -> &AgentConfig {
        self.orchestrator.config()
    }
}
