//! Core contracts shared across the caduceus workspace: request identities,
//! sealed record types, the gateway error taxonomy, and the collaborator
//! interfaces (vector index, embedder) with in-memory doubles for tests.

pub mod embed;
pub mod error;
pub mod identity;
pub mod index;
pub mod record;
