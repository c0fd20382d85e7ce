//! Wiring from configuration to the library pieces.

use std::path::PathBuf;
use std::sync::Arc;

use caduceus_agent::embedder::{EmbedderSettings, HttpEmbedder};
use caduceus_agent::producer::Producer;
use caduceus_audit::log::AuditLog;
use caduceus_auth::gate::RoleGate;
use caduceus_auth::verifier::{SigningConfig, TokenVerifier};
use caduceus_core::embed::{Embedder, HashEmbedder};
use caduceus_core::error::GatewayError;
use caduceus_crypto::keys::{
    ExternalServiceProvider, KeyMode, KeyProvider, LocalSecretProvider, MountedKeyFetcher,
};
use caduceus_gateway::proxy::StorageProxy;
use caduceus_index::{HttpVectorIndex, IndexSettings};
use color_eyre::Result;
use dirs::data_dir;
use tracing::{debug, warn};

use crate::config::Config;

pub const DEFAULT_NAMESPACE: &str = "HospitalA";
pub const DEFAULT_INDEX_URL: &str = "http://127.0.0.1:7700";

const DEV_SECRET: &str = "dev-secret-change-me";

/// Tenant namespace this installation acts for.
pub fn namespace(config: &Config) -> String {
    config.hospital.clone().unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

/// Resolve the default data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("caduceus"))
}

pub fn resolved_data_dir(config: &Config) -> Result<PathBuf> {
    match &config.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => default_data_dir(),
    }
}

/// Signing parameters shared by the issuer and the verifier.
pub fn signing_config(config: &Config) -> SigningConfig {
    let secret = config
        .auth
        .as_ref()
        .and_then(|auth| auth.secret.clone())
        .or_else(|| std::env::var("CADUCEUS_JWT_SECRET").ok())
        .unwrap_or_else(|| {
            warn!("no signing secret configured, using the development default");
            DEV_SECRET.to_string()
        });
    SigningConfig::hs256(secret)
}

pub fn role_gate(config: &Config) -> RoleGate {
    RoleGate::new(TokenVerifier::new(&signing_config(config)))
}

pub fn audit_log(config: &Config) -> Result<AuditLog> {
    Ok(AuditLog::new(resolved_data_dir(config)?.join("audit.log")))
}

/// Build the key provider for the configured mode. An unrecognized mode
/// fails here, before any operation runs.
pub fn key_provider(config: &Config) -> Result<Arc<dyn KeyProvider>> {
    let key_config = config.key.clone().unwrap_or_default();
    let mode = KeyMode::parse(key_config.mode.as_deref().unwrap_or("local"))
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    match mode {
        KeyMode::LocalSecret => {
            let dir = match key_config.dir {
                Some(dir) => dir,
                None => resolved_data_dir(config)?.join("keys"),
            };
            debug!(?dir, "using local tenant keys");
            Ok(Arc::new(LocalSecretProvider::new(dir)))
        }
        KeyMode::ExternalService => {
            let dir = match key_config.mount_dir {
                Some(dir) => dir,
                None => resolved_data_dir(config)?.join("kms"),
            };
            debug!(?dir, "using mounted tenant keys");
            Ok(Arc::new(ExternalServiceProvider::new(Arc::new(MountedKeyFetcher::new(dir)))))
        }
    }
}

/// Build the embedder: the remote collaborator when configured, otherwise
/// the local hashing fallback.
pub fn embedder(config: &Config) -> (String, Arc<dyn Embedder>) {
    if let Some(settings) = resolve_embedder_settings(config) {
        match HttpEmbedder::new(settings) {
            Ok(embedder) => return (embedder.name().to_string(), Arc::new(embedder)),
            Err(err) => warn!("failed to init remote embedder, falling back to hashing: {err}"),
        }
    }

    let embedder = HashEmbedder::default();
    (embedder.name().to_string(), Arc::new(embedder))
}

fn resolve_embedder_settings(config: &Config) -> Option<EmbedderSettings> {
    config.embedder.clone().or_else(|| {
        std::env::var("CADUCEUS_EMBEDDER_URL").ok().map(EmbedderSettings::new)
    })
}

pub fn index_client(config: &Config) -> Result<HttpVectorIndex> {
    let settings = config
        .index
        .clone()
        .or_else(|| std::env::var("CADUCEUS_INDEX_URL").ok().map(IndexSettings::new))
        .unwrap_or_else(|| IndexSettings::new(DEFAULT_INDEX_URL));
    HttpVectorIndex::new(settings).map_err(|e| color_eyre::eyre::eyre!(e.to_string()))
}

pub fn proxy(config: &Config) -> Result<StorageProxy<HttpVectorIndex>> {
    Ok(StorageProxy::new(role_gate(config), index_client(config)?, Arc::new(audit_log(config)?)))
}

pub fn producer(config: &Config) -> Result<Producer> {
    let (name, embedder) = embedder(config);
    debug!(embedder = %name, "building producer");
    Ok(Producer::new(namespace(config), key_provider(config)?, embedder))
}

/// Resolve the bearer carrier from the CLI flag or environment.
pub fn bearer(cli_token: Option<String>) -> Option<String> {
    cli_token
        .or_else(|| std::env::var("CADUCEUS_TOKEN").ok())
        .map(|token| format!("Bearer {token}"))
}

/// Flatten a gateway rejection into a report. Callers that were never
/// authenticated get pointed at `caduceus token`.
pub fn gateway_err(err: GatewayError) -> color_eyre::Report {
    if err.is_unauthenticated() {
        color_eyre::eyre::eyre!(
            "{err}; mint one with `caduceus token` and pass it via --token or CADUCEUS_TOKEN"
        )
    } else {
        color_eyre::eyre::eyre!(err.to_string())
    }
}
