//! Bearer credential verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use caduceus_core::error::GatewayError;
use caduceus_core::identity::{Identity, Role};

const BEARER_PREFIX: &str = "Bearer ";

/// Shared-secret signing parameters, fixed at startup and injected into both
/// the verifier and the issuer so they can never drift apart.
#[derive(Clone)]
pub struct SigningConfig {
    pub secret: String,
    pub algorithm: Algorithm,
}

impl SigningConfig {
    pub fn hs256(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), algorithm: Algorithm::HS256 }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret must never reach logs.
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Claims as carried on the wire. Subject and role are optional here so that
/// their absence can be reported as a payload problem rather than being
/// folded into the generic signature failure.
#[derive(Debug, Deserialize)]
struct WireClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// Stateless credential verifier. Safe to share across concurrent requests;
/// verification touches no mutable state.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &SigningConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        // An expired credential must fail exactly like a forged one, with no
        // grace window.
        validation.leeway = 0;
        Self { decoding_key: DecodingKey::from_secret(config.secret.as_bytes()), validation }
    }

    /// Verify an `Authorization` carrier and derive the request identity.
    ///
    /// Signature, structure, and expiry failures all surface as
    /// `InvalidOrExpiredCredential`; the verifier gives no oracle for which
    /// check rejected the token.
    pub fn verify(&self, authorization: Option<&str>) -> Result<Identity, GatewayError> {
        let carrier = authorization.ok_or(GatewayError::MissingCredential)?;
        let token = carrier
            .strip_prefix(BEARER_PREFIX)
            .ok_or(GatewayError::MalformedCredential)?;
        if token.is_empty() {
            return Err(GatewayError::MalformedCredential);
        }

        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| GatewayError::InvalidOrExpiredCredential)?;

        let subject = data
            .claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(GatewayError::InvalidTokenPayload)?;
        let role = data
            .claims
            .role
            .filter(|role| !role.is_empty())
            .ok_or(GatewayError::InvalidTokenPayload)?
            .parse::<Role>()
            .map_err(|_| GatewayError::InvalidTokenPayload)?;

        Ok(Identity { subject, role })
    }
}
