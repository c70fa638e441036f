//! reqwest-backed [`PageFetcher`].
//!
//! Pages are fetched as text; binaries are streamed chunk by chunk straight to disk
//! so a large APK never sits in memory.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::contract::PageFetcher;
use crate::error::FetchError;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching page");
        let resp = self.get(url).await?;
        resp.text().await.map_err(|e| FetchError::transport(url, e))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        info!(url = %url, dest = %dest.display(), "Starting download");
        let resp = self.get(url).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::io("failed to create", dest, e))?;

        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::transport(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io("failed to write", dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| FetchError::io("failed to flush", dest, e))?;

        info!(url = %url, bytes = written, "Download finished");
        Ok(written)
    }
}
