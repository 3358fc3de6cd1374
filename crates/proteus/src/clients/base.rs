use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::ClientResult;

/// A vector with its payload, addressed by id. Upserting an existing id replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    /// Numeric or uuid, depending on how the point was stored
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Value,
}

impl SearchHit {
    pub fn payload_str(&self, key: &str) -> &str {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_collections(&self) -> ClientResult<Vec<String>>;

    /// Create a cosine-distance collection. Returns false if it already existed.
    async fn create_collection(&self, name: &str, vector_size: usize) -> ClientResult<bool>;

    /// Insert or replace points, returning how many were written
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> ClientResult<usize>;

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f64>,
    ) -> ClientResult<Vec<SearchHit>>;

    async fn count(&self, collection: &str) -> ClientResult<u64>;

    async fn health(&self) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WebResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked results for a free-text query
    async fn search(&self, query: &str) -> ClientResult<Vec<WebResult>>;

    async fn health(&self) -> bool;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body as text
    async fn fetch(&self, url: &Url) -> ClientResult<String>;
}
