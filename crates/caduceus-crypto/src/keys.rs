//! Tenant key resolution.
//!
//! Two strategies exist and the choice is fixed at startup: `LocalSecret`
//! provisions and persists keys under a local directory, `ExternalService`
//! delegates to an injected fetcher and never writes anything. Key bytes
//! stay inside `KeyMaterial` and are redacted from debug output.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::{fmt, fs};

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::instrument;

use caduceus_core::error::GatewayError;

/// Symmetric key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// A resolved tenant key. The tenant name is fine to log; the bytes are not.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub tenant: String,
    pub bytes: [u8; KEY_LEN],
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("tenant", &self.tenant)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

/// Resolves the symmetric key for a tenant namespace.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn resolve(&self, tenant: &str) -> Result<KeyMaterial, GatewayError>;
}

/// Key-resolution strategy, chosen once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    LocalSecret,
    ExternalService,
}

impl KeyMode {
    /// Parse a configured mode. Unknown values fail here, at startup, so a
    /// typo can never silently fall back to local generation.
    pub fn parse(mode: &str) -> Result<KeyMode, GatewayError> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "local" | "file" => Ok(KeyMode::LocalSecret),
            "external" | "kms" => Ok(KeyMode::ExternalService),
            other => Err(GatewayError::InvalidKeyMode { mode: other.to_string() }),
        }
    }
}

fn generate_key_bytes() -> [u8; KEY_LEN] {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Tenant names become file names, so only a conservative charset is
/// accepted.
fn validate_tenant(tenant: &str) -> Result<(), GatewayError> {
    let safe = !tenant.is_empty()
        && tenant.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if safe {
        Ok(())
    } else {
        Err(GatewayError::KeyUnavailable {
            reason: format!("tenant name {tenant:?} is not filesystem safe"),
        })
    }
}

fn read_key_file(path: &Path, tenant: &str) -> Result<KeyMaterial, GatewayError> {
    let bytes = fs::read(path).map_err(|e| GatewayError::KeyUnavailable {
        reason: format!("failed to read key for {tenant}: {e}"),
    })?;
    let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| GatewayError::KeyUnavailable {
        reason: format!("key for {tenant} has an unexpected length"),
    })?;
    Ok(KeyMaterial { tenant: tenant.to_string(), bytes })
}

/// File-backed provider: `<root>/<tenant>.key`, raw key bytes, provisioned
/// on first use.
pub struct LocalSecretProvider {
    root: PathBuf,
}

impl LocalSecretProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, tenant: &str) -> PathBuf {
        self.root.join(format!("{tenant}.key"))
    }

    /// Create the key file exclusively, owner-readable only, so two
    /// concurrent provisioners can never interleave their bytes.
    fn create_exclusive(path: &Path, bytes: &[u8; KEY_LEN]) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

#[async_trait]
impl KeyProvider for LocalSecretProvider {
    #[instrument(skip_all, fields(tenant = %tenant))]
    async fn resolve(&self, tenant: &str) -> Result<KeyMaterial, GatewayError> {
        validate_tenant(tenant)?;
        let path = self.key_path(tenant);

        match fs::metadata(&path) {
            Ok(_) => return read_key_file(&path, tenant),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GatewayError::KeyUnavailable {
                    reason: format!("failed to stat key for {tenant}: {e}"),
                })
            }
        }

        fs::create_dir_all(&self.root).map_err(|e| GatewayError::KeyUnavailable {
            reason: format!("failed to create key directory: {e}"),
        })?;

        let bytes = generate_key_bytes();
        match Self::create_exclusive(&path, &bytes) {
            Ok(()) => Ok(KeyMaterial { tenant: tenant.to_string(), bytes }),
            // Lost the provisioning race; the first writer's key wins.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => read_key_file(&path, tenant),
            Err(e) => Err(GatewayError::KeyUnavailable {
                reason: format!("failed to persist key for {tenant}: {e}"),
            }),
        }
    }
}

/// Fetch contract for external key services.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    async fn fetch(&self, tenant: &str) -> Result<[u8; KEY_LEN], GatewayError>;
}

/// Delegates every resolution to an injected fetcher. Nothing is cached or
/// persisted locally, and a failed fetch is always `KeyUnavailable`.
pub struct ExternalServiceProvider {
    fetcher: Arc<dyn KeyFetcher>,
}

impl ExternalServiceProvider {
    pub fn new(fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl KeyProvider for ExternalServiceProvider {
    #[instrument(skip_all, fields(tenant = %tenant))]
    async fn resolve(&self, tenant: &str) -> Result<KeyMaterial, GatewayError> {
        match self.fetcher.fetch(tenant).await {
            Ok(bytes) => Ok(KeyMaterial { tenant: tenant.to_string(), bytes }),
            Err(err @ GatewayError::KeyUnavailable { .. }) => Err(err),
            Err(other) => Err(GatewayError::KeyUnavailable { reason: other.to_string() }),
        }
    }
}

/// Reads pre-provisioned keys from a mounted secrets directory, the shape a
/// managed key service exposes. Never generates: an absent key is an error.
pub struct MountedKeyFetcher {
    root: PathBuf,
}

impl MountedKeyFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl KeyFetcher for MountedKeyFetcher {
    async fn fetch(&self, tenant: &str) -> Result<[u8; KEY_LEN], GatewayError> {
        validate_tenant(tenant)?;
        let path = self.root.join(format!("{tenant}.key"));
        match fs::read(&path) {
            Ok(bytes) => bytes.try_into().map_err(|_| GatewayError::KeyUnavailable {
                reason: format!("mounted key for {tenant} has an unexpected length"),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GatewayError::KeyUnavailable {
                reason: format!("no key provisioned for {tenant}"),
            }),
            Err(e) => Err(GatewayError::KeyUnavailable {
                reason: format!("failed to read mounted key for {tenant}: {e}"),
            }),
        }
    }
}

/// In-memory provider for tests: per-tenant keys generated on first use.
#[derive(Default, Clone)]
pub struct InMemoryKeyProvider {
    keys: Arc<Mutex<HashMap<String, [u8; KEY_LEN]>>>,
}

impl InMemoryKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyProvider for InMemoryKeyProvider {
    async fn resolve(&self, tenant: &str) -> Result<KeyMaterial, GatewayError> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|e| GatewayError::Internal { reason: format!("key lock poisoned: {e}") })?;
        let bytes = *keys.entry(tenant.to_string()).or_insert_with(generate_key_bytes);
        Ok(KeyMaterial { tenant: tenant.to_string(), bytes })
    }
}
