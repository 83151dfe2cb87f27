//! HTTP relay client
//!
//! Talks to the relay backend over its JSON API.

use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;

use crate::config::RelayConfig;

use super::transport::RelayTransport;
use super::types::{CommitRequest, PartUploadRequest, PartUploadResponse, RelayError, TextRequest};

/// HTTP implementation of [`RelayTransport`]
#[derive(Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRelay {
    /// Create a new relay client from configuration
    pub async fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::new();
        let base_url = config.endpoint.trim_end_matches('/').to_string();

        let relay = Self {
            client,
            base_url,
            token: config.token.clone(),
        };

        // Probe the backend; an unreachable relay is not fatal at startup,
        // exports will fall back to local storage.
        match relay
            .client
            .get(format!("{}/api/v1/health", relay.base_url))
            .bearer_auth(&relay.token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Connected to relay at {}", relay.base_url);
            }
            Ok(response) => {
                tracing::warn!(
                    "Relay at {} answered with {}. Will attempt operations anyway.",
                    relay.base_url,
                    response.status()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Could not reach relay at {}: {}. Will attempt operations anyway.",
                    relay.base_url,
                    e
                );
            }
        }

        Ok(relay)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(RelayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn upload_part(
        &self,
        transfer_id: i64,
        index: u32,
        bytes: &[u8],
    ) -> Result<bool, RelayError> {
        let url = format!(
            "{}/api/v1/transfers/{}/parts/{}",
            self.base_url, transfer_id, index
        );

        let body = PartUploadRequest {
            bytes: base64::engine::general_purpose::STANDARD.encode(bytes),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let parsed: PartUploadResponse = response.json().await?;

        Ok(parsed.accepted)
    }

    async fn commit(
        &self,
        transfer_id: i64,
        part_count: u32,
        filename: &str,
        mime_type: &str,
        caption: &str,
    ) -> Result<(), RelayError> {
        let url = format!("{}/api/v1/transfers/{}/commit", self.base_url, transfer_id);

        let body = CommitRequest {
            part_count,
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            caption: caption.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => {
                Self::check_status(response).await?;
                Ok(())
            }
        }
    }

    async fn send_text(&self, text: &str) -> Result<(), RelayError> {
        let url = format!("{}/api/v1/messages", self.base_url);

        let body = TextRequest {
            text: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}
