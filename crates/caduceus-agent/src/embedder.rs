//! HTTP client for the embedding collaborator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use caduceus_core::embed::Embedder;
use caduceus_core::error::GatewayError;

/// Embedding requests load a model on first use, so the deadline is wider
/// than the index client's.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderSettings {
    pub base_url: String,
    /// Model identifier forwarded to the collaborator, if it serves several.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl EmbedderSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: None, timeout_secs: None }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Debug, Serialize)]
struct EncodeBody<'a> {
    texts: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EncodeResponse {
    vectors: Vec<Vec<f32>>,
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::UpstreamTimeout
    } else {
        GatewayError::UpstreamUnavailable { reason: err.to_string() }
    }
}

pub struct HttpEmbedder {
    settings: EmbedderSettings,
    client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(settings: EmbedderSettings) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GatewayError::Internal { reason: format!("http client init: {e}") })?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/encode", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all, fields(batch = texts.len()))]
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GatewayError> {
        let body = EncodeBody { texts, model: self.settings.model.as_deref() };
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let response = response.error_for_status().map_err(map_transport)?;
        let parsed = response.json::<EncodeResponse>().await.map_err(map_transport)?;

        // The contract is one vector per input, in input order.
        if parsed.vectors.len() != texts.len() {
            return Err(GatewayError::UpstreamUnavailable {
                reason: format!(
                    "embedder returned {} vectors for {} texts",
                    parsed.vectors.len(),
                    texts.len()
                ),
            });
        }
        Ok(parsed.vectors)
    }
}
