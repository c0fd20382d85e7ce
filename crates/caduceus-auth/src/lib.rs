//! Credential handling for the gateway: bearer-token verification, the role
//! gate applied before any privileged operation, and a token issuer for
//! development and test tooling.

pub mod gate;
pub mod issuer;
pub mod verifier;
