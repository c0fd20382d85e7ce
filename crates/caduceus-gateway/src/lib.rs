//! The zero-trust storage proxy: authenticates, authorizes, forwards sealed
//! records to the vector-store collaborator, and audits what succeeded. It
//! holds no key material and never opens an envelope.

pub mod proxy;
