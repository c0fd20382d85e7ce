//! Aggregation of a journal into the summary operators review.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::log::AuditEntry;

/// Counts per actor, role, and action over one journal, plus the covered
/// time span. Maps are ordered so rendering is stable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub total: usize,
    pub by_actor: BTreeMap<String, usize>,
    pub by_role: BTreeMap<String, usize>,
    pub by_action: BTreeMap<String, usize>,
    pub first_ts: Option<DateTime<Utc>>,
    pub last_ts: Option<DateTime<Utc>>,
}

impl AuditReport {
    pub fn from_entries(entries: &[AuditEntry]) -> Self {
        let mut report = AuditReport { total: entries.len(), ..AuditReport::default() };
        for entry in entries {
            *report.by_actor.entry(entry.actor.clone()).or_default() += 1;
            *report.by_role.entry(entry.role.to_string()).or_default() += 1;
            *report.by_action.entry(entry.action.to_string()).or_default() += 1;
        }
        report.first_ts = entries.iter().map(|e| e.ts).min();
        report.last_ts = entries.iter().map(|e| e.ts).max();
        report
    }
}
