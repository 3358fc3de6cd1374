use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use super::base::{PageFetcher, Point, SearchHit, VectorStore, WebResult, WebSearch};
use crate::errors::{ClientError, ClientResult};

/// In-memory vector store. Search ignores the query vector and returns the hits configured for
/// the collection.
#[derive(Clone, Default)]
pub struct MockVectorStore {
    collections: Arc<Mutex<Vec<String>>>,
    points: Arc<Mutex<HashMap<String, Vec<Point>>>>,
    hits: HashMap<String, Vec<SearchHit>>,
    failing: HashSet<String>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection<S: Into<String>>(self, name: S) -> Self {
        self.collections.lock().unwrap().push(name.into());
        self
    }

    /// Register a collection whose searches answer with one hit per `(text, url)` pair
    pub fn with_hits<S: Into<String>>(mut self, name: S, hits: &[(&str, &str)]) -> Self {
        let name = name.into();
        let hits = hits
            .iter()
            .enumerate()
            .map(|(i, (text, url))| SearchHit {
                id: json!(i),
                score: 0.9,
                payload: json!({"text": text, "url": url, "chunk_index": i}),
            })
            .collect();
        self.hits.insert(name.clone(), hits);
        self.with_collection(name)
    }

    /// Register a collection whose searches and counts fail
    pub fn with_failing<S: Into<String>>(mut self, name: S) -> Self {
        let name = name.into();
        self.failing.insert(name.clone());
        self.with_collection(name)
    }

    pub fn points(&self, collection: &str) -> Vec<Point> {
        self.points
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, collection: &str) -> ClientResult<()> {
        if self.failing.contains(collection) {
            return Err(ClientError::Unavailable {
                service: "mock",
                reason: format!("collection {} is unavailable", collection),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn list_collections(&self) -> ClientResult<Vec<String>> {
        Ok(self.collections.lock().unwrap().clone())
    }

    async fn create_collection(&self, name: &str, _vector_size: usize) -> ClientResult<bool> {
        let mut collections = self.collections.lock().unwrap();
        if collections.iter().any(|c| c == name) {
            return Ok(false);
        }
        collections.push(name.to_string());
        Ok(true)
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> ClientResult<usize> {
        self.check(collection)?;
        let written = points.len();
        let mut stored = self.points.lock().unwrap();
        let existing = stored.entry(collection.to_string()).or_default();
        for point in points {
            existing.retain(|p| p.id != point.id);
            existing.push(point);
        }
        Ok(written)
    }

    async fn search(
        &self,
        collection: &str,
        _vector: &[f32],
        limit: usize,
        _score_threshold: Option<f64>,
    ) -> ClientResult<Vec<SearchHit>> {
        self.check(collection)?;
        let mut hits = self.hits.get(collection).cloned().unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn count(&self, collection: &str) -> ClientResult<u64> {
        self.check(collection)?;
        Ok(self.points(collection).len() as u64)
    }

    async fn health(&self) -> bool {
        true
    }
}

/// Web search that returns fixed results and records the queries it saw
#[derive(Clone, Default)]
pub struct MockWebSearch {
    results: Vec<WebResult>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockWebSearch {
    pub fn new(results: Vec<WebResult>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for MockWebSearch {
    async fn search(&self, query: &str) -> ClientResult<Vec<WebResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(ClientError::Timeout { service: "mock" });
        }
        Ok(self.results.clone())
    }

    async fn health(&self) -> bool {
        !self.fail
    }
}

/// Serves pages from a fixed url to html map
#[derive(Clone, Default)]
pub struct MockPageFetcher {
    pages: HashMap<String, String>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page<U: Into<String>, H: Into<String>>(mut self, url: U, html: H) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &Url) -> ClientResult<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ClientError::Http {
                service: "mock",
                status: 404,
                body: String::new(),
            })
    }
}
