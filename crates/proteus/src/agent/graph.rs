use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use super::config::AgentConfig;
use super::nodes::{self, NodeContext};
use super::state::{AgentState, NextAction, StatePatch};
use crate::clients::base::{PageFetcher, VectorStore, WebSearch};
use crate::errors::{AgentError, AgentResult};
use crate::providers::base::CompletionClient;

/// The critique counter value at which a draft is approved regardless of the verdict
pub const MAX_CRITIQUES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Node {
    Interpret,
    Decide,
    Crawl,
    IngestResponse,
    Research,
    ResolveContext,
    Synthesize,
    Critique,
    Revise,
    Answer,
}

pub fn route_after_decision(state: &AgentState) -> Node {
    match state.next_action.unwrap_or_default() {
        NextAction::Crawl => Node::Crawl,
        NextAction::ResolveContext => Node::ResolveContext,
        // there is no executor, commands are researched like questions
        NextAction::Research | NextAction::Execute => Node::Research,
    }
}

pub fn route_after_critique(state: &AgentState) -> Node {
    if state.is_approved || state.critique_count >= MAX_CRITIQUES {
        Node::Answer
    } else {
        Node::Revise
    }
}

/// The node that follows `node`, or `None` once the run is complete
pub fn next_node(node: Node, state: &AgentState) -> Option<Node> {
    match node {
        Node::Interpret => Some(Node::Decide),
        Node::Decide => Some(route_after_decision(state)),
        Node::Crawl => Some(Node::IngestResponse),
        Node::IngestResponse => Some(Node::Answer),
        Node::ResolveContext => Some(Node::Research),
        Node::Research => Some(Node::Synthesize),
        Node::Synthesize => Some(Node::Critique),
        Node::Critique => Some(route_after_critique(state)),
        Node::Revise => Some(Node::Synthesize),
        Node::Answer => None,
    }
}

/// How followup messages get their context before research
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextResolver {
    /// No conversation history: note the followup and research the message as-is
    #[default]
    Passthrough,
}

impl ContextResolver {
    pub fn resolve(&self, state: &AgentState) -> StatePatch {
        match self {
            ContextResolver::Passthrough => nodes::context::resolve_context(state),
        }
    }
}

/// Emitted after each node completes, carrying the state as of that point
#[derive(Debug, Clone, Serialize)]
pub struct NodeEvent {
    pub node: Node,
    pub state: AgentState,
}

/// Runs messages through the node graph. Cheap to clone; every run gets its own state.
#[derive(Clone)]
pub struct Orchestrator {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn VectorStore>,
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
    resolver: ContextResolver,
    config: Arc<AgentConfig>,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        store: Arc<dyn VectorStore>,
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            store,
            search,
            fetcher,
            resolver: ContextResolver::default(),
            config: Arc::new(config),
        }
    }

    pub fn with_context_resolver(mut self, resolver: ContextResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Create a stream that yields an event as each node finishes.
    /// The last event is always for `answer`, unless a node fails and the stream yields the error.
    pub fn stream<M: Into<String>, C: Into<String>>(
        &self,
        message: M,
        conversation_id: C,
    ) -> BoxStream<'static, AgentResult<NodeEvent>> {
        let orchestrator = self.clone();
        let mut state = AgentState::new(message, conversation_id);

        Box::pin(async_stream::try_stream! {
            let mut node = Some(Node::Interpret);
            while let Some(current) = node {
                let patch = orchestrator.execute(current, &state).await?;
                state = state.merge(patch);
                node = next_node(current, &state);
                tracing::debug!(node = %current, next = ?node, "node finished");

                yield NodeEvent { node: current, state: state.clone() };

                // let the consumer see the event before the next, possibly slow, node starts
                tokio::task::yield_now().await;
            }
        })
    }

    /// Run to completion and return the final state
    pub async fn run<M: Into<String>, C: Into<String>>(
        &self,
        message: M,
        conversation_id: C,
    ) -> AgentResult<AgentState> {
        let mut events = self.stream(message, conversation_id);
        let mut last = None;
        while let Some(event) = events.next().await {
            last = Some(event?.state);
        }
        last.ok_or_else(|| AgentError::Internal("orchestration produced no state".to_string()))
    }

    async fn execute(&self, node: Node, state: &AgentState) -> AgentResult<StatePatch> {
        let ctx = NodeContext {
            llm: self.llm.as_ref(),
            store: self.store.as_ref(),
            search: self.search.as_ref(),
            fetcher: self.fetcher.as_ref(),
            config: &self.config,
        };

        match node {
            Node::Interpret => nodes::interpret::interpret(&ctx, state).await,
            Node::Decide => nodes::decide::decide(&ctx, state).await,
            Node::Crawl => nodes::ingest::crawl(&ctx, state).await,
            Node::IngestResponse => Ok(nodes::ingest::ingest_response(state)),
            Node::Research => nodes::research::research(&ctx, state).await,
            Node::ResolveContext => Ok(self.resolver.resolve(state)),
            Node::Synthesize => nodes::synthesize::synthesize(&ctx, state).await,
            Node::Critique => nodes::critique::critique(&ctx, state).await,
            Node::Revise => Ok(nodes::context::revise(state)),
            Node::Answer => Ok(nodes::context::answer(state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::Intent;
    use crate::clients::mock::{MockPageFetcher, MockVectorStore, MockWebSearch};
    use crate::providers::mock::MockCompletionClient;
    use futures::TryStreamExt;

    fn orchestrator(llm: MockCompletionClient) -> Orchestrator {
        Orchestrator::new(
            Arc::new(llm),
            Arc::new(MockVectorStore::new()),
            Arc::new(MockWebSearch::default()),
            Arc::new(MockPageFetcher::new()),
            AgentConfig::new("llama3.1:8b", "nomic-embed-text"),
        )
    }

    #[test]
    fn test_routing() {
        let mut state = AgentState::new("q", "c1");
        assert_eq!(route_after_decision(&state), Node::Research);
        state.next_action = Some(NextAction::Execute);
        assert_eq!(route_after_decision(&state), Node::Research);
        state.next_action = Some(NextAction::ResolveContext);
        assert_eq!(next_node(Node::Decide, &state), Some(Node::ResolveContext));
        assert_eq!(next_node(Node::ResolveContext, &state), Some(Node::Research));

        state.critique_count = 1;
        assert_eq!(route_after_critique(&state), Node::Revise);
        state.critique_count = MAX_CRITIQUES;
        assert_eq!(route_after_critique(&state), Node::Answer);
        state.critique_count = 1;
        state.is_approved = true;
        assert_eq!(route_after_critique(&state), Node::Answer);

        assert_eq!(next_node(Node::Answer, &state), None);
        assert_eq!(Node::IngestResponse.to_string(), "ingest_response");
    }

    #[tokio::test]
    async fn test_question_visits_research_path() {
        let llm = MockCompletionClient::new(vec![
            r#"{"intent": "question", "confidence": 0.9, "entities": []}"#,
            "Rust is a systems language.",
            r#"{"is_approved": true, "score": 0.9}"#,
        ]);
        let events: Vec<NodeEvent> = orchestrator(llm)
            .stream("what is rust", "c1")
            .try_collect()
            .await
            .unwrap();

        let nodes: Vec<Node> = events.iter().map(|e| e.node).collect();
        assert_eq!(
            nodes,
            vec![
                Node::Interpret,
                Node::Decide,
                Node::Research,
                Node::Synthesize,
                Node::Critique,
                Node::Answer
            ]
        );

        let state = &events.last().unwrap().state;
        assert_eq!(state.intent_type, Some(Intent::Question));
        assert_eq!(
            state.final_response.as_deref(),
            Some("Rust is a systems language.")
        );
        assert_eq!(state.actions_taken, vec!["research", "synthesize"]);
        assert_eq!(state.critique_score, Some(0.9));
    }

    #[tokio::test]
    async fn test_followup_resolves_context_then_researches() {
        let llm = MockCompletionClient::new(vec![
            r#"{"intent": "followup", "confidence": 0.8}"#,
            "Here it is again.",
            "not json",
        ]);
        let state = orchestrator(llm.clone())
            .with_context_resolver(ContextResolver::Passthrough)
            .run("explain that again", "c1")
            .await
            .unwrap();

        assert_eq!(state.next_action, Some(NextAction::ResolveContext));
        assert_eq!(state.final_response.as_deref(), Some("Here it is again."));
        assert_eq!(state.critique_score, Some(0.7));
        assert_eq!(llm.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_ends_stream_with_error() {
        let llm = MockCompletionClient::new(Vec::<String>::new());
        let mut events = orchestrator(llm).stream("what is rust", "c1");
        let first = events.next().await.unwrap();
        assert!(matches!(first, Err(AgentError::Client(_))));
        assert!(events.next().await.is_none());
    }
}
