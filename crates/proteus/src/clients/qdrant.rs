use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::base::{Point, SearchHit, VectorStore};
use crate::errors::{ClientError, ClientResult};
use crate::providers::utils::handle_response;

pub const QDRANT_HOST: &str = "http://localhost:6333";

const SERVICE: &str = "qdrant";

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub host: String,
    pub timeout: Duration,
    pub upsert_timeout: Duration,
    pub health_timeout: Duration,
}

impl QdrantConfig {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            host: QDRANT_HOST.to_string(),
            timeout: Duration::from_secs(30),
            upsert_timeout: Duration::from_secs(60),
            health_timeout: Duration::from_secs(5),
        }
    }
}

/// Client for the Qdrant REST API
pub struct QdrantClient {
    client: Client,
    config: QdrantConfig,
}

impl QdrantClient {
    pub fn new(config: QdrantConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ClientResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;
        handle_response(SERVICE, response).await
    }

    fn invalid(reason: impl Into<String>) -> ClientError {
        ClientError::InvalidResponse {
            service: SERVICE,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn list_collections(&self) -> ClientResult<Vec<String>> {
        let response = self
            .send(
                self.client
                    .get(self.url("/collections"))
                    .timeout(self.config.timeout),
            )
            .await?;

        let collections = response["result"]["collections"]
            .as_array()
            .ok_or_else(|| Self::invalid("missing result.collections"))?;
        Ok(collections
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str).map(String::from))
            .collect())
    }

    async fn create_collection(&self, name: &str, vector_size: usize) -> ClientResult<bool> {
        if self.list_collections().await?.iter().any(|c| c == name) {
            return Ok(false);
        }

        self.send(
            self.client
                .put(self.url(&format!("/collections/{}", name)))
                .timeout(self.config.timeout)
                .json(&json!({
                    "vectors": {
                        "size": vector_size,
                        "distance": "Cosine",
                    }
                })),
        )
        .await?;
        tracing::info!(collection = name, vector_size, "created collection");
        Ok(true)
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> ClientResult<usize> {
        let count = points.len();
        if count == 0 {
            return Ok(0);
        }

        self.send(
            self.client
                .put(self.url(&format!("/collections/{}/points", collection)))
                .timeout(self.config.upsert_timeout)
                .json(&json!({ "points": points })),
        )
        .await?;
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f64>,
    ) -> ClientResult<Vec<SearchHit>> {
        let mut payload = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(threshold) = score_threshold {
            payload["score_threshold"] = json!(threshold);
        }

        let mut response = self
            .send(
                self.client
                    .post(self.url(&format!("/collections/{}/points/search", collection)))
                    .timeout(self.config.timeout)
                    .json(&payload),
            )
            .await?;

        serde_json::from_value(response["result"].take()).map_err(|e| Self::invalid(e.to_string()))
    }

    async fn count(&self, collection: &str) -> ClientResult<u64> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/collections/{}", collection)))
                    .timeout(self.config.timeout),
            )
            .await?;
        Ok(response["result"]["points_count"].as_u64().unwrap_or(0))
    }

    async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/healthz"))
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
