use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ClientResult;
use crate::models::message::Message;

/// Base trait for the LLM runtime the gateway talks to
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Single-prompt completion, returning the generated text
    async fn generate(&self, model: &str, prompt: &str, system: Option<&str>)
        -> ClientResult<String>;

    /// Chat completion over messages already in the runtime's format.
    ///
    /// `tools` are OpenAI-style function declarations. The returned message is raw: tool calls
    /// have not been checked against the declared tools.
    async fn chat(&self, model: &str, messages: &[Value], tools: &[Value]) -> ClientResult<Message>;

    /// Embed each input, returning one vector per input in order
    async fn embed(&self, model: &str, input: &[String]) -> ClientResult<Vec<Vec<f32>>>;

    async fn health(&self) -> bool;
}
