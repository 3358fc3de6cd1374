use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::base::{WebResult, WebSearch};
use crate::errors::{ClientError, ClientResult};
use crate::providers::utils::handle_response;

pub const SEARXNG_HOST: &str = "http://localhost:8080";

const SERVICE: &str = "searxng";

#[derive(Debug, Clone)]
pub struct SearxngConfig {
    pub host: String,
    pub timeout: Duration,
    pub language: String,
}

impl SearxngConfig {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

impl Default for SearxngConfig {
    fn default() -> Self {
        Self {
            host: SEARXNG_HOST.to_string(),
            timeout: Duration::from_secs(30),
            language: "en".to_string(),
        }
    }
}

/// Client for a SearXNG instance with the JSON output format enabled
pub struct SearxngClient {
    client: Client,
    config: SearxngConfig,
}

impl SearxngClient {
    pub fn new(config: SearxngConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl WebSearch for SearxngClient {
    async fn search(&self, query: &str) -> ClientResult<Vec<WebResult>> {
        let response = self
            .client
            .get(self.url("/search"))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("language", self.config.language.as_str()),
            ])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let mut body = handle_response(SERVICE, response).await?;
        match body.get_mut("results").map(Value::take) {
            Some(results) => {
                serde_json::from_value(results).map_err(|e| ClientError::InvalidResponse {
                    service: SERVICE,
                    reason: e.to_string(),
                })
            }
            None => Ok(Vec::new()),
        }
    }

    async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/healthz"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
