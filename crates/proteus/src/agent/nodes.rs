//! The work done at each step of an orchestration run.
//!
//! Nodes never mutate the state they are given. Each returns a [`StatePatch`] that the runner
//! merges before choosing the next node.
use serde_json::Value;

use super::config::AgentConfig;
use crate::adapters::{select_adapter, Adapter};
use crate::clients::base::{PageFetcher, VectorStore, WebSearch};
use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::providers::base::CompletionClient;

pub mod context;
pub mod critique;
pub mod decide;
pub mod ingest;
pub mod interpret;
pub mod research;
pub mod synthesize;

/// Collaborators a node may call, borrowed from the orchestrator for the duration of a step
pub struct NodeContext<'a> {
    pub llm: &'a dyn CompletionClient,
    pub store: &'a dyn VectorStore,
    pub search: &'a dyn WebSearch,
    pub fetcher: &'a dyn PageFetcher,
    pub config: &'a AgentConfig,
}

impl NodeContext<'_> {
    /// Generate text and clean it with the model's adapter, so reasoning blocks and recovered
    /// tool markup never reach the state.
    pub async fn generate(&self, model: &str, prompt: &str) -> AgentResult<String> {
        let text = self.llm.generate(model, prompt, None).await?;
        let message = select_adapter(model)
            .normalize_agent_message(Message::assistant().with_text(text));
        Ok(message.content)
    }
}

/// Parse a JSON object from model output that may be fenced or wrapped in prose
pub fn parse_json_reply(text: &str) -> Option<Value> {
    let text = strip_code_fence(text.trim());
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Truncate to at most `max` characters
pub(crate) fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
