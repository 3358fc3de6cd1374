/// Models and limits used by the orchestration.
///
/// Every role defaults to the same agent model; deployments that run a smaller model for
/// classification or review can override them individually.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub interpreter_model: String,
    pub orchestrator_model: String,
    pub research_model: String,
    pub synthesis_model: String,
    pub critic_model: String,
    pub embedding_model: String,
    /// Dimension of the embedding model's vectors, used when creating collections
    pub vector_size: usize,
    pub max_crawl_pages: usize,
}

impl AgentConfig {
    pub fn new<S: Into<String>, E: Into<String>>(agent_model: S, embedding_model: E) -> Self {
        let agent_model = agent_model.into();
        Self {
            interpreter_model: agent_model.clone(),
            orchestrator_model: agent_model.clone(),
            research_model: agent_model.clone(),
            synthesis_model: agent_model.clone(),
            critic_model: agent_model,
            embedding_model: embedding_model.into(),
            vector_size: 768,
            max_crawl_pages: 20,
        }
    }

    pub fn with_interpreter_model<S: Into<String>>(mut self, model: S) -> Self {
        self.interpreter_model = model.into();
        self
    }

    pub fn with_research_model<S: Into<String>>(mut self, model: S) -> Self {
        self.research_model = model.into();
        self
    }

    pub fn with_synthesis_model<S: Into<String>>(mut self, model: S) -> Self {
        self.synthesis_model = model.into();
        self
    }

    pub fn with_critic_model<S: Into<String>>(mut self, model: S) -> Self {
        self.critic_model = model.into();
        self
    }

    pub fn with_vector_size(mut self, vector_size: usize) -> Self {
        self.vector_size = vector_size;
        self
    }
}
