//! Token issuing for development tooling and tests.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;

use caduceus_core::error::GatewayError;
use caduceus_core::identity::Role;

use crate::verifier::SigningConfig;

/// Default credential lifetime: one hour.
pub const DEFAULT_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct Claims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// Mints signed bearer credentials against the shared signing secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    header: Header,
}

impl TokenIssuer {
    pub fn new(config: &SigningConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(config.algorithm),
        }
    }

    /// Issue a credential valid for `ttl_secs` from now.
    pub fn issue(&self, subject: &str, role: Role, ttl_secs: i64) -> Result<String, GatewayError> {
        let now = Utc::now().timestamp();
        self.issue_at(subject, role, now, now + ttl_secs)
    }

    /// Issue a credential with explicit issue and expiry instants. Lets
    /// tooling mint already-expired credentials when exercising expiry
    /// handling.
    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<String, GatewayError> {
        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: issued_at,
            exp: expires_at,
        };
        jsonwebtoken::encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal { reason: format!("token encoding failed: {e}") })
    }
}
