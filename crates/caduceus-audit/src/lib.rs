//! Append-only audit journal for privileged gateway operations, plus the
//! aggregation used by operator reporting.

pub mod log;
pub mod report;
