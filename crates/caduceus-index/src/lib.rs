//! HTTP client for the encrypted vector-store collaborator.
//!
//! The collaborator only ever sees sealed envelopes. This client adds the
//! transport concerns: bounded request deadlines, and a stable mapping from
//! transport failures to the gateway error taxonomy (`UpstreamTimeout` for
//! deadline misses, `UpstreamUnavailable` for everything else transport).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use caduceus_core::error::GatewayError;
use caduceus_core::index::VectorIndex;
use caduceus_core::record::{Envelope, InsertReceipt, SearchHit, StoredRecord};

/// Default per-request deadline, matching what the deployments run with.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Connection settings for the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub base_url: String,
    /// Per-request deadline in seconds; `None` means the default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl IndexSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), timeout_secs: None }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    namespace: &'a str,
    record_id: &'a str,
    ciphertext: &'a str,
    nonce: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    namespace: &'a str,
    ciphertext: &'a str,
    nonce: &'a str,
    limit: usize,
}

#[derive(Debug, Serialize)]
struct ListBody<'a> {
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct FetchBody<'a> {
    namespace: &'a str,
    record_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<String>,
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::UpstreamTimeout
    } else {
        GatewayError::UpstreamUnavailable { reason: err.to_string() }
    }
}

/// Collaborator client. Cheap to clone; the inner connection pool is shared.
#[derive(Clone)]
pub struct HttpVectorIndex {
    settings: IndexSettings,
    client: reqwest::Client,
}

impl HttpVectorIndex {
    pub fn new(settings: IndexSettings) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GatewayError::Internal { reason: format!("http client init: {e}") })?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.settings.base_url.trim_end_matches('/'))
    }

    /// Probe the collaborator's health endpoint.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(map_transport)?;
        response.error_for_status().map_err(map_transport)?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    #[instrument(skip_all, fields(namespace = %record.namespace, record_id = %record.case_id))]
    async fn insert(&self, record: &StoredRecord) -> Result<InsertReceipt, GatewayError> {
        let body = InsertBody {
            namespace: &record.namespace,
            record_id: &record.case_id,
            ciphertext: &record.envelope.ciphertext,
            nonce: &record.envelope.nonce,
        };
        let response = self
            .client
            .post(self.endpoint("insert"))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let response = response.error_for_status().map_err(map_transport)?;
        response.json::<InsertReceipt>().await.map_err(map_transport)
    }

    #[instrument(skip_all, fields(namespace = %namespace, limit = limit))]
    async fn search(
        &self,
        namespace: &str,
        query: &Envelope,
        limit: usize,
    ) -> Result<Vec<SearchHit>, GatewayError> {
        let body = SearchBody {
            namespace,
            ciphertext: &query.ciphertext,
            nonce: &query.nonce,
            limit,
        };
        let response = self
            .client
            .post(self.endpoint("search"))
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;
        let response = response.error_for_status().map_err(map_transport)?;
        let parsed = response.json::<SearchResponse>().await.map_err(map_transport)?;
        Ok(parsed.results)
    }

    #[instrument(skip_all, fields(namespace = %namespace))]
    async fn list(&self, namespace: &str) -> Result<Vec<String>, GatewayError> {
        let response = self
            .client
            .post(self.endpoint("list"))
            .json(&ListBody { namespace })
            .send()
            .await
            .map_err(map_transport)?;
        let response = response.error_for_status().map_err(map_transport)?;
        let parsed = response.json::<ListResponse>().await.map_err(map_transport)?;
        Ok(parsed.records)
    }

    #[instrument(skip_all, fields(namespace = %namespace, record_id = %record_id))]
    async fn fetch(&self, namespace: &str, record_id: &str) -> Result<Envelope, GatewayError> {
        let response = self
            .client
            .post(self.endpoint("fetch"))
            .json(&FetchBody { namespace, record_id })
            .send()
            .await
            .map_err(map_transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound { resource: format!("{namespace}/{record_id}") });
        }
        let response = response.error_for_status().map_err(map_transport)?;
        response.json::<Envelope>().await.map_err(map_transport)
    }
}
