#![doc = "Telegram Bot API implementation of the core ChannelPublisher trait."]
//
//! # Channel publisher (CLI <-> Core)
//!
//! Bridges [`apkwatch_core::contract::ChannelPublisher`] to the Telegram Bot API:
//!
//! - `publish_file` → `sendDocument` (multipart upload streamed from disk, file name preserved)
//! - `edit_pinned` → `editMessageText` on the configured pinned message
//!
//! The public Bot API server caps uploads at 50 MB. Point `channel.api_base` at a
//! self-hosted Bot API server to lift that limit.

use std::path::Path;

use apkwatch_core::contract::ChannelPublisher;
use apkwatch_core::error::PublishError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::load_config::ChannelConfig;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Request URLs carry the bot token, so they are stripped from transport errors.
fn redacted(e: reqwest::Error) -> PublishError {
    PublishError::Transport(e.without_url())
}

pub struct TelegramPublisher {
    client: Client,
    config: ChannelConfig,
}

impl TelegramPublisher {
    pub fn new(config: ChannelConfig) -> Self {
        tracing::info!(
            chat_id = %config.chat_id,
            api_base = %config.api_base,
            "Initialized Telegram publisher"
        );
        Self {
            client: Client::new(),
            config,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    async fn check(resp: reqwest::Response) -> Result<(), PublishError> {
        let status = resp.status();
        let body: ApiResponse = resp.json().await.map_err(redacted)?;
        if body.ok {
            Ok(())
        } else {
            let description = body
                .description
                .unwrap_or_else(|| format!("HTTP {status}"));
            Err(PublishError::Rejected(description))
        }
    }
}

#[async_trait]
impl ChannelPublisher for TelegramPublisher {
    async fn publish_file(&self, path: &Path, caption: &str) -> Result<(), PublishError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "release.apk".to_string());
        let io_err = |e: std::io::Error| PublishError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let file = File::open(path).await.map_err(io_err)?;
        let size = file.metadata().await.map_err(io_err)?.len();
        tracing::info!(
            file = %file_name,
            size,
            chat_id = %self.config.chat_id,
            "Uploading document to channel"
        );

        let body = Body::wrap_stream(ReaderStream::new(file));
        let document = Part::stream_with_length(body, size)
            .file_name(file_name.clone())
            .mime_str("application/vnd.android.package-archive")?;
        let form = Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", document);

        let resp = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(redacted)?;
        match Self::check(resp).await {
            Ok(()) => {
                tracing::info!(file = %file_name, "Document sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, file = %file_name, "sendDocument failed");
                Err(e)
            }
        }
    }

    async fn edit_pinned(&self, text: &str) -> Result<(), PublishError> {
        tracing::info!(
            chat_id = %self.config.chat_id,
            message_id = self.config.pinned_message_id,
            "Editing pinned digest"
        );
        let body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "message_id": self.config.pinned_message_id,
            "text": text,
        });
        let resp = self
            .client
            .post(self.method_url("editMessageText"))
            .json(&body)
            .send()
            .await
            .map_err(redacted)?;
        Self::check(resp).await.inspect_err(|e| {
            tracing::error!(error = %e, "editMessageText failed");
        })
    }
}
