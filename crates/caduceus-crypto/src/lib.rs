//! Tenant key management and the authenticated-encryption codec used to
//! seal records before they leave a hospital boundary.

pub mod codec;
pub mod keys;
