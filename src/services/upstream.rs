// src/services/upstream.rs
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::Value;

use crate::BoxError;

/// Source of truth behind a monthly cache entry.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn fetch(&self, cache_key: &str) -> Result<Value, BoxError>;
}

/// JSON over HTTP. `{key}` in the URL template is replaced by the cache key.
pub struct HttpSource {
    client: Client,
    url_template: String,
}

impl HttpSource {
    pub fn new(url_template: impl Into<String>) -> Result<Self, BoxError> {
        let client = Client::builder()
            .user_agent(concat!("realty-insights/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpSource {
            client,
            url_template: url_template.into(),
        })
    }

    pub fn url_for(&self, cache_key: &str) -> String {
        self.url_template.replace("{key}", cache_key)
    }
}

#[async_trait]
impl UpstreamSource for HttpSource {
    async fn fetch(&self, cache_key: &str) -> Result<Value, BoxError> {
        let url = self.url_for(cache_key);
        info!("Fetching upstream data from URL: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let payload = response.json::<Value>().await?;
        Ok(payload)
    }
}
