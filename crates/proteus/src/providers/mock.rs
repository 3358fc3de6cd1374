use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{ClientError, ClientResult};
use crate::models::message::Message;
use crate::providers::base::CompletionClient;

/// A mock client that answers `generate` calls with pre-configured responses, in order
#[derive(Clone, Default)]
pub struct MockCompletionClient {
    responses: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    embedding: Vec<f32>,
    healthy: bool,
}

impl MockCompletionClient {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Into::into).collect())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            embedding: vec![0.5; 4],
            healthy: true,
        }
    }

    /// Every prompt passed to `generate` so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _system: Option<&str>,
    ) -> ClientResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(ClientError::Unavailable {
                service: "mock",
                reason: "no more responses".to_string(),
            })
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn chat(
        &self,
        _model: &str,
        _messages: &[Value],
        _tools: &[Value],
    ) -> ClientResult<Message> {
        let mut responses = self.responses.lock().unwrap();
        let content = if responses.is_empty() {
            String::new()
        } else {
            responses.remove(0)
        };
        Ok(Message::assistant().with_text(content))
    }

    async fn embed(&self, _model: &str, input: &[String]) -> ClientResult<Vec<Vec<f32>>> {
        Ok(input.iter().map(|_| self.embedding.clone()).collect())
    }

    async fn health(&self) -> bool {
        self.healthy
    }
}
