//! Vector-store collaborator contract.
//!
//! The collaborator owns persistence and ranking of sealed records. It never
//! receives key material, and every operation is scoped to one namespace:
//! results must never cross tenant boundaries.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::record::{Envelope, InsertReceipt, SearchHit, StoredRecord};

/// Storage and ranking operations over sealed records.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a sealed record under its namespace, replacing any previous
    /// record with the same id.
    async fn insert(&self, record: &StoredRecord) -> Result<InsertReceipt, GatewayError>;

    /// Rank records in `namespace` against a sealed query, best first, at
    /// most `limit` hits. An unknown namespace yields an empty ranking.
    async fn search(
        &self,
        namespace: &str,
        query: &Envelope,
        limit: usize,
    ) -> Result<Vec<SearchHit>, GatewayError>;

    /// Record ids currently stored in `namespace`, sorted.
    async fn list(&self, namespace: &str) -> Result<Vec<String>, GatewayError>;

    /// Retrieve one sealed record, or `NotFound` if the id is absent.
    async fn fetch(&self, namespace: &str, record_id: &str) -> Result<Envelope, GatewayError>;
}

/// In-memory index double for tests and offline development. Ranking is
/// deterministic: ids in sorted order with a fixed score ramp, the same
/// shape the development collaborator produces.
#[derive(Default, Clone)]
pub struct InMemoryVectorIndex {
    namespaces: Arc<Mutex<HashMap<String, BTreeMap<String, Envelope>>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, Envelope>>>, GatewayError>
    {
        self.namespaces
            .lock()
            .map_err(|e| GatewayError::Internal { reason: format!("index lock poisoned: {e}") })
    }
}

fn ramp_score(rank: usize) -> f64 {
    let raw = 1.0 - 0.05 * rank as f64;
    (raw * 1000.0).round() / 1000.0
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn insert(&self, record: &StoredRecord) -> Result<InsertReceipt, GatewayError> {
        let mut namespaces = self.lock()?;
        namespaces
            .entry(record.namespace.clone())
            .or_default()
            .insert(record.case_id.clone(), record.envelope.clone());
        Ok(InsertReceipt {
            status: "stored".to_string(),
            namespace: record.namespace.clone(),
            record_id: record.case_id.clone(),
        })
    }

    async fn search(
        &self,
        namespace: &str,
        _query: &Envelope,
        limit: usize,
    ) -> Result<Vec<SearchHit>, GatewayError> {
        // The double never opens the query envelope; it only has to produce
        // a stable, namespace-scoped ranking.
        let namespaces = self.lock()?;
        let Some(records) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(records
            .keys()
            .take(limit)
            .enumerate()
            .map(|(rank, id)| SearchHit { record_id: id.clone(), score: ramp_score(rank) })
            .collect())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, GatewayError> {
        let namespaces = self.lock()?;
        Ok(namespaces
            .get(namespace)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch(&self, namespace: &str, record_id: &str) -> Result<Envelope, GatewayError> {
        let namespaces = self.lock()?;
        namespaces
            .get(namespace)
            .and_then(|records| records.get(record_id))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                resource: format!("{namespace}/{record_id}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(namespace: &str, case_id: &str) -> StoredRecord {
        StoredRecord {
            namespace: namespace.to_string(),
            case_id: case_id.to_string(),
            envelope: Envelope::new("00", "ff"),
        }
    }

    #[tokio::test]
    async fn insert_then_fetch_returns_the_envelope() {
        let index = InMemoryVectorIndex::new();
        index.insert(&record("HospitalA", "case-1")).await.expect("insert");

        let envelope = index.fetch("HospitalA", "case-1").await.expect("fetch");
        assert_eq!(envelope, Envelope::new("00", "ff"));
    }

    #[tokio::test]
    async fn fetch_missing_record_is_not_found() {
        let index = InMemoryVectorIndex::new();
        let err = index.fetch("HospitalA", "absent").await.expect_err("no such record");
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn search_ranks_sorted_ids_with_descending_scores() {
        let index = InMemoryVectorIndex::new();
        for id in ["case-b", "case-a", "case-c"] {
            index.insert(&record("HospitalA", id)).await.expect("insert");
        }

        let hits = index
            .search("HospitalA", &Envelope::new("00", "ff"), 10)
            .await
            .expect("search");
        let ids: Vec<_> = hits.iter().map(|h| h.record_id.as_str()).collect();
        assert_eq!(ids, vec!["case-a", "case-b", "case-c"]);
        let scores: Vec<_> = hits.iter().map(|h| h.score).collect();
        assert_eq!(scores, vec![1.0, 0.95, 0.9]);
    }

    #[tokio::test]
    async fn search_honors_the_limit() {
        let index = InMemoryVectorIndex::new();
        for id in ["a", "b", "c", "d"] {
            index.insert(&record("HospitalA", id)).await.expect("insert");
        }

        let hits = index
            .search("HospitalA", &Envelope::new("00", "ff"), 2)
            .await
            .expect("search");
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn operations_never_cross_namespaces() {
        let index = InMemoryVectorIndex::new();
        index.insert(&record("HospitalA", "case-1")).await.expect("insert");

        let hits = index
            .search("HospitalB", &Envelope::new("00", "ff"), 10)
            .await
            .expect("search");
        assert!(hits.is_empty());
        assert!(index.list("HospitalB").await.expect("list").is_empty());
        let err = index.fetch("HospitalB", "case-1").await.expect_err("wrong namespace");
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn insert_replaces_an_existing_record() {
        let index = InMemoryVectorIndex::new();
        index.insert(&record("HospitalA", "case-1")).await.expect("insert");
        let updated = StoredRecord {
            namespace: "HospitalA".to_string(),
            case_id: "case-1".to_string(),
            envelope: Envelope::new("11", "ee"),
        };
        index.insert(&updated).await.expect("reinsert");

        assert_eq!(index.list("HospitalA").await.expect("list").len(), 1);
        let envelope = index.fetch("HospitalA", "case-1").await.expect("fetch");
        assert_eq!(envelope, Envelope::new("11", "ee"));
    }
}
