//! Error taxonomy shared by every layer of the gateway.
//!
//! Authentication failures (401 class) and authorization failures (403
//! class) stay distinct variants: callers must be able to tell "who are
//! you" apart from "you may not do this" without string matching.

use thiserror::Error;

use crate::identity::Role;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No credential was presented at all.
    #[error("missing credential")]
    MissingCredential,

    /// A credential was presented but the carrier is not well-formed.
    #[error("malformed credential")]
    MalformedCredential,

    /// Signature, structure, or expiry checks failed. One variant covers
    /// them all so callers cannot probe which check rejected the token.
    #[error("invalid or expired credential")]
    InvalidOrExpiredCredential,

    /// The token verified but its claims are unusable (missing subject or
    /// role, or a role outside the recognized set).
    #[error("invalid token payload")]
    InvalidTokenPayload,

    /// The authenticated role is not on the allow-list for the operation.
    #[error("access denied for role {role}")]
    Forbidden { role: Role },

    /// The tenant key could not be resolved.
    #[error("key unavailable: {reason}")]
    KeyUnavailable { reason: String },

    /// The configured key-resolution mode is not a recognized value.
    #[error("invalid key mode: {mode}")]
    InvalidKeyMode { mode: String },

    /// Uniform failure for any unsealing problem: bad hex, wrong nonce
    /// length, or an authentication-tag mismatch all look the same.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The collaborator did not answer within the deadline.
    #[error("upstream timeout")]
    UpstreamTimeout,

    /// The collaborator refused the connection or answered unusably.
    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    /// The addressed resource does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Infrastructure failure that maps to no request-visible rejection.
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl GatewayError {
    /// Stable status code for the variant, following HTTP conventions so the
    /// rejection classes stay distinguishable at every surface.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::MissingCredential
            | GatewayError::MalformedCredential
            | GatewayError::InvalidOrExpiredCredential
            | GatewayError::InvalidTokenPayload => 401,
            GatewayError::Forbidden { .. } => 403,
            GatewayError::NotFound { .. } => 404,
            GatewayError::DecryptionFailed => 400,
            GatewayError::UpstreamTimeout => 504,
            GatewayError::UpstreamUnavailable { .. } => 502,
            GatewayError::KeyUnavailable { .. }
            | GatewayError::InvalidKeyMode { .. }
            | GatewayError::Internal { .. } => 500,
        }
    }

    /// True for the 401 class: the caller was never identified.
    pub fn is_unauthenticated(&self) -> bool {
        self.status() == 401
    }
}
