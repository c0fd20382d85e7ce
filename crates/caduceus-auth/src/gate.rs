//! Role gate applied between authentication and every privileged operation.

use tracing::instrument;

use caduceus_core::error::GatewayError;
use caduceus_core::identity::{Identity, Role};

use crate::verifier::TokenVerifier;

/// Pass the identity through when its role is on the allow-list. Pure
/// function over its arguments; the identity is returned unchanged.
pub fn authorize(identity: Identity, allowed: &[Role]) -> Result<Identity, GatewayError> {
    if allowed.contains(&identity.role) {
        Ok(identity)
    } else {
        Err(GatewayError::Forbidden { role: identity.role })
    }
}

/// Verifier plus allow-list check, in the only order that is safe:
/// credentials are always verified before any role is examined, so an
/// unauthenticated caller can never learn which roles an operation accepts.
pub struct RoleGate {
    verifier: TokenVerifier,
}

impl RoleGate {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Authenticate only; used by surfaces open to every recognized role.
    pub fn identify(&self, authorization: Option<&str>) -> Result<Identity, GatewayError> {
        self.verifier.verify(authorization)
    }

    /// Authenticate, then authorize against `allowed`.
    #[instrument(skip_all)]
    pub fn admit(
        &self,
        authorization: Option<&str>,
        allowed: &[Role],
    ) -> Result<Identity, GatewayError> {
        let identity = self.verifier.verify(authorization)?;
        authorize(identity, allowed)
    }
}
