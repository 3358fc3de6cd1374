use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::base::CompletionClient;
use super::configs::OllamaProviderConfig;
use super::utils::{handle_response, ollama_message_to_message};
use crate::errors::{ClientError, ClientResult};
use crate::models::message::Message;

pub const OLLAMA_HOST: &str = "http://localhost:11434";

const SERVICE: &str = "ollama";

/// Client for the native Ollama API (`/api/generate`, `/api/chat`, `/api/embed`)
pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }

    fn with_options(&self, mut payload: Value) -> Value {
        if let Some(num_ctx) = self.config.num_ctx {
            payload["options"] = json!({ "num_ctx": num_ctx });
        }
        payload
    }

    async fn post(&self, path: &str, payload: Value, timeout: Duration) -> ClientResult<Value> {
        let response = self
            .client
            .post(self.url(path))
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        handle_response(SERVICE, response).await
    }
}

#[async_trait]
impl CompletionClient for OllamaProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> ClientResult<String> {
        let mut payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(system) = system {
            payload["system"] = json!(system);
        }

        let response = self
            .post(
                "/api/generate",
                self.with_options(payload),
                self.config.generate_timeout,
            )
            .await?;

        Ok(response
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn chat(&self, model: &str, messages: &[Value], tools: &[Value]) -> ClientResult<Message> {
        let mut payload = json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });
        if !tools.is_empty() {
            payload["tools"] = json!(tools);
        }

        let response = self
            .post(
                "/api/chat",
                self.with_options(payload),
                self.config.generate_timeout,
            )
            .await?;

        let message = response
            .get("message")
            .ok_or_else(|| ClientError::InvalidResponse {
                service: SERVICE,
                reason: "no message in chat response".to_string(),
            })?;
        Ok(ollama_message_to_message(message))
    }

    async fn embed(&self, model: &str, input: &[String]) -> ClientResult<Vec<Vec<f32>>> {
        let payload = json!({
            "model": model,
            "input": input,
        });

        let mut response = self
            .post("/api/embed", payload, self.config.embed_timeout)
            .await?;

        let embeddings = response
            .get_mut("embeddings")
            .map(Value::take)
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(embeddings).map_err(|e| ClientError::InvalidResponse {
            service: SERVICE,
            reason: e.to_string(),
        })
    }

    async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/"))
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
