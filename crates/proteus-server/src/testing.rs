//! In-process collaborators for exercising the routes without live services
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use proteus::agent::AgentConfig;
use proteus::clients::base::{PageFetcher, Point, SearchHit, VectorStore, WebResult, WebSearch};
use proteus::errors::{ClientError, ClientResult};
use proteus::models::message::Message;
use proteus::providers::base::CompletionClient;
use serde_json::Value;
use url::Url;

use crate::routes::configure;
use crate::state::AppState;

/// Answers `generate` with scripted replies in order and `chat` with a fixed reply
#[derive(Clone, Default)]
pub struct ScriptedModel {
    replies: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    chat_reply: Option<String>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
            ..Default::default()
        }
    }

    pub fn with_chat_reply(mut self, content: &str) -> Self {
        self.chat_reply = Some(content.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedModel {
    async fn generate(&self, _model: &str, prompt: &str, _system: Option<&str>) -> ClientResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Err(ClientError::Timeout { service: "ollama" });
        }
        Ok(replies.remove(0))
    }

    async fn chat(&self, _model: &str, _messages: &[Value], _tools: &[Value]) -> ClientResult<Message> {
        match &self.chat_reply {
            Some(content) => Ok(Message::assistant().with_text(content)),
            None => Err(ClientError::Timeout { service: "ollama" }),
        }
    }

    async fn embed(&self, _model: &str, input: &[String]) -> ClientResult<Vec<Vec<f32>>> {
        Ok(input.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }

    async fn health(&self) -> bool {
        true
    }
}

/// Collections with fixed point counts
#[derive(Clone, Default)]
pub struct TestStore {
    collections: Vec<(String, Option<u64>)>,
    unavailable: bool,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn with_collection(mut self, name: &str, count: u64) -> Self {
        self.collections.push((name.to_string(), Some(count)));
        self
    }

    /// A collection whose count request fails
    pub fn with_uncountable(mut self, name: &str) -> Self {
        self.collections.push((name.to_string(), None));
        self
    }

    fn check(&self) -> ClientResult<()> {
        if self.unavailable {
            Err(ClientError::Unavailable {
                service: "qdrant",
                reason: "connection refused".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VectorStore for TestStore {
    async fn list_collections(&self) -> ClientResult<Vec<String>> {
        self.check()?;
        Ok(self.collections.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn create_collection(&self, _name: &str, _vector_size: usize) -> ClientResult<bool> {
        self.check()?;
        Ok(true)
    }

    async fn upsert(&self, _collection: &str, points: Vec<Point>) -> ClientResult<usize> {
        self.check()?;
        Ok(points.len())
    }

    async fn search(
        &self,
        _collection: &str,
        _vector: &[f32],
        _limit: usize,
        _score_threshold: Option<f64>,
    ) -> ClientResult<Vec<SearchHit>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn count(&self, collection: &str) -> ClientResult<u64> {
        self.check()?;
        self.collections
            .iter()
            .find(|(name, _)| name == collection)
            .and_then(|(_, count)| *count)
            .ok_or_else(|| ClientError::Http {
                service: "qdrant",
                status: 404,
                body: String::new(),
            })
    }

    async fn health(&self) -> bool {
        !self.unavailable
    }
}

pub struct TestSearch;

#[async_trait]
impl WebSearch for TestSearch {
    async fn search(&self, _query: &str) -> ClientResult<Vec<WebResult>> {
        Ok(Vec::new())
    }

    async fn health(&self) -> bool {
        true
    }
}

pub struct TestFetcher;

#[async_trait]
impl PageFetcher for TestFetcher {
    async fn fetch(&self, url: &Url) -> ClientResult<String> {
        Err(ClientError::Http {
            service: "fetcher",
            status: 404,
            body: url.to_string(),
        })
    }
}

pub struct TestApp {
    pub llm: ScriptedModel,
    store: TestStore,
}

impl TestApp {
    pub fn new(llm: ScriptedModel) -> Self {
        Self {
            llm,
            store: TestStore::new(),
        }
    }

    pub fn with_store(mut self, store: TestStore) -> Self {
        self.store = store;
        self
    }

    pub fn router(&self) -> Router {
        let state = AppState::new(
            Arc::new(self.llm.clone()),
            Arc::new(self.store.clone()),
            Arc::new(TestSearch),
            Arc::new(TestFetcher),
            AgentConfig::new("llama3.1:8b", "nomic-embed-text"),
        );
        configure(state)
    }
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
