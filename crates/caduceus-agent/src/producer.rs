//! The producer turns plaintext clinical cases into sealed records.
//!
//! Everything sensitive happens here, inside the hospital boundary: the
//! case text is embedded and the serialized payload sealed under the tenant
//! key before anything leaves the process.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use caduceus_core::embed::Embedder;
use caduceus_core::error::GatewayError;
use caduceus_core::record::{Envelope, StoredRecord};
use caduceus_crypto::codec::CipherCodec;
use caduceus_crypto::keys::KeyProvider;

/// A clinical case as supplied by a hospital system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalCase {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ClinicalCase {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Map::new() }
    }
}

/// Plaintext payload sealed into a case envelope.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct CasePayload {
    pub vector: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// Embeds and seals cases for one tenant namespace.
pub struct Producer {
    namespace: String,
    keys: Arc<dyn KeyProvider>,
    embedder: Arc<dyn Embedder>,
}

impl Producer {
    pub fn new(
        namespace: impl Into<String>,
        keys: Arc<dyn KeyProvider>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self { namespace: namespace.into(), keys, embedder }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn codec(&self) -> Result<CipherCodec, GatewayError> {
        let key = self.keys.resolve(&self.namespace).await?;
        CipherCodec::new(&key)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let texts = [text.to_string()];
        let mut vectors = self.embedder.encode(&texts).await?;
        if vectors.len() != 1 {
            return Err(GatewayError::UpstreamUnavailable {
                reason: format!("embedder returned {} vectors for one text", vectors.len()),
            });
        }
        Ok(vectors.remove(0))
    }

    /// Embed and seal one case into a record addressed to this namespace.
    #[instrument(skip_all, fields(namespace = %self.namespace, case_id = %case.id))]
    pub async fn seal_case(&self, case: &ClinicalCase) -> Result<StoredRecord, GatewayError> {
        let vector = self.embed_one(&case.text).await?;
        let payload = CasePayload { vector, metadata: case.metadata.clone() };
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| GatewayError::Internal { reason: format!("payload encode: {e}") })?;
        let envelope = self.codec().await?.seal(&bytes)?;
        Ok(StoredRecord {
            namespace: self.namespace.clone(),
            case_id: case.id.clone(),
            envelope,
        })
    }

    /// Seal an arbitrary JSON document without embedding it. Used for bulk
    /// ingestion of pre-structured case files.
    #[instrument(skip_all, fields(namespace = %self.namespace, case_id = %case_id))]
    pub async fn seal_document(
        &self,
        case_id: &str,
        document: &Value,
    ) -> Result<StoredRecord, GatewayError> {
        let bytes = serde_json::to_vec(document)
            .map_err(|e| GatewayError::Internal { reason: format!("payload encode: {e}") })?;
        let envelope = self.codec().await?.seal(&bytes)?;
        Ok(StoredRecord {
            namespace: self.namespace.clone(),
            case_id: case_id.to_string(),
            envelope,
        })
    }

    /// Embed and seal a search query. The gateway and collaborator only ever
    /// see the resulting envelope.
    #[instrument(skip_all, fields(namespace = %self.namespace))]
    pub async fn seal_query(&self, text: &str) -> Result<Envelope, GatewayError> {
        let vector = self.embed_one(text).await?;
        let bytes = serde_json::to_vec(&vector)
            .map_err(|e| GatewayError::Internal { reason: format!("query encode: {e}") })?;
        self.codec().await?.seal(&bytes)
    }

    /// Open a fetched envelope with this tenant's key.
    pub async fn open_record(&self, envelope: &Envelope) -> Result<Value, GatewayError> {
        let bytes = self.codec().await?.open(envelope)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::Internal { reason: format!("payload decode: {e}") })
    }
}
