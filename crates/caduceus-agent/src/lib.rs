//! Hospital-side agent: embeds case text, seals it under the tenant key,
//! and prepares records and queries for the gateway. Also carries the HTTP
//! client for the embedding collaborator.

pub mod embedder;
pub mod producer;
