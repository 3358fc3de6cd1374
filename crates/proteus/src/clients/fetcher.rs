use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::base::PageFetcher;
use crate::errors::{ClientError, ClientResult};

const SERVICE: &str = "web";

/// Fetches crawl pages over HTTP
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("proteus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> ClientResult<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                service: SERVICE,
                status: status.as_u16(),
                body: String::new(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))
    }
}
