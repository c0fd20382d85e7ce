//! Request orchestration.
//!
//! Every privileged operation walks the same line: authenticate, authorize,
//! forward to the collaborator, then audit. The order is load-bearing. A
//! caller that was never authenticated must fail before roles are examined,
//! and the journal only ever records actions whose side effect actually
//! happened.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use caduceus_audit::log::{AuditAction, AuditLog};
use caduceus_auth::gate::RoleGate;
use caduceus_core::error::GatewayError;
use caduceus_core::identity::{Identity, Role};
use caduceus_core::index::VectorIndex;
use caduceus_core::record::{Envelope, InsertReceipt, SearchHit, StoredRecord};

/// Roles allowed to store sealed records.
pub const STORE_ROLES: &[Role] = &[Role::Admin, Role::Researcher];
/// Roles allowed to run encrypted search.
pub const SEARCH_ROLES: &[Role] = &[Role::Clinician];
/// Roles allowed to enumerate and fetch stored records.
pub const READ_ROLES: &[Role] = &[Role::Clinician, Role::Researcher, Role::Admin];

/// An encrypted search request. The query envelope is opaque to the proxy
/// and is forwarded exactly as received, as is the limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub namespace: String,
    pub query: Envelope,
    pub limit: usize,
}

/// The proxy over one vector-store collaborator.
pub struct StorageProxy<V: VectorIndex> {
    gate: RoleGate,
    index: V,
    audit: Arc<AuditLog>,
}

impl<V: VectorIndex> StorageProxy<V> {
    pub fn new(gate: RoleGate, index: V, audit: Arc<AuditLog>) -> Self {
        Self { gate, index, audit }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Store a sealed record. Admin and researcher only.
    #[instrument(skip_all, fields(namespace = %record.namespace, case_id = %record.case_id))]
    pub async fn store(
        &self,
        authorization: Option<&str>,
        record: StoredRecord,
    ) -> Result<InsertReceipt, GatewayError> {
        let identity = self.gate.admit(authorization, STORE_ROLES)?;
        let receipt = self.index.insert(&record).await?;
        // Audited only once the collaborator has acknowledged the write.
        let resource = format!("{}/{}", record.namespace, record.case_id);
        self.audit.record(&identity, AuditAction::Store, &resource);
        Ok(receipt)
    }

    /// Encrypted search. Clinician only. Hits are returned in collaborator
    /// order; the proxy never re-ranks or inspects them.
    #[instrument(skip_all, fields(namespace = %request.namespace, limit = request.limit))]
    pub async fn search(
        &self,
        authorization: Option<&str>,
        request: SearchRequest,
    ) -> Result<Vec<SearchHit>, GatewayError> {
        let identity = self.gate.admit(authorization, SEARCH_ROLES)?;
        let hits = self.index.search(&request.namespace, &request.query, request.limit).await?;
        self.audit.record(&identity, AuditAction::Search, &request.namespace);
        Ok(hits)
    }

    /// Enumerate record ids in a namespace.
    #[instrument(skip_all, fields(namespace = %namespace))]
    pub async fn list(
        &self,
        authorization: Option<&str>,
        namespace: &str,
    ) -> Result<Vec<String>, GatewayError> {
        let identity = self.gate.admit(authorization, READ_ROLES)?;
        let records = self.index.list(namespace).await?;
        self.audit.record(&identity, AuditAction::List, namespace);
        Ok(records)
    }

    /// Fetch one sealed record. The envelope passes through untouched.
    #[instrument(skip_all, fields(namespace = %namespace, case_id = %case_id))]
    pub async fn fetch(
        &self,
        authorization: Option<&str>,
        namespace: &str,
        case_id: &str,
    ) -> Result<Envelope, GatewayError> {
        let identity = self.gate.admit(authorization, READ_ROLES)?;
        let envelope = self.index.fetch(namespace, case_id).await?;
        let resource = format!("{namespace}/{case_id}");
        self.audit.record(&identity, AuditAction::Fetch, &resource);
        Ok(envelope)
    }

    /// Echo the verified identity. Open to every recognized role and not a
    /// privileged action, so nothing reaches the journal.
    pub fn whoami(&self, authorization: Option<&str>) -> Result<Identity, GatewayError> {
        self.gate.identify(authorization)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use caduceus_auth::issuer::TokenIssuer;
    use caduceus_auth::verifier::{SigningConfig, TokenVerifier};
    use caduceus_core::index::InMemoryVectorIndex;

    fn test_proxy() -> (StorageProxy<InMemoryVectorIndex>, TokenIssuer, tempfile::TempDir) {
        let config = SigningConfig::hs256("gateway-test-secret");
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = Arc::new(AuditLog::new(dir.path().join("audit.log")));
        let proxy = StorageProxy::new(
            RoleGate::new(TokenVerifier::new(&config)),
            InMemoryVectorIndex::new(),
            audit,
        );
        (proxy, TokenIssuer::new(&config), dir)
    }

    fn bearer(issuer: &TokenIssuer, subject: &str, role: Role) -> String {
        let token = issuer.issue(subject, role, 600).expect("issue token");
        format!("Bearer {token}")
    }

    fn record(namespace: &str, case_id: &str) -> StoredRecord {
        StoredRecord {
            namespace: namespace.to_string(),
            case_id: case_id.to_string(),
            envelope: Envelope::new("00", "00"),
        }
    }

    fn search_request(namespace: &str) -> SearchRequest {
        SearchRequest {
            namespace: namespace.to_string(),
            query: Envelope::new("00", "00"),
            limit: 5,
        }
    }

    #[tokio::test]
    async fn unauthenticated_requests_fail_before_any_role_check() {
        let (proxy, _, _dir) = test_proxy();

        let err = proxy.store(None, record("HospitalA", "case-1")).await.expect_err("no token");
        assert_eq!(err, GatewayError::MissingCredential);
        let err = proxy.search(None, search_request("HospitalA")).await.expect_err("no token");
        assert_eq!(err, GatewayError::MissingCredential);
        let err = proxy.list(None, "HospitalA").await.expect_err("no token");
        assert_eq!(err, GatewayError::MissingCredential);
        let err = proxy.fetch(None, "HospitalA", "case-1").await.expect_err("no token");
        assert_eq!(err, GatewayError::MissingCredential);
        let err = proxy.whoami(None).expect_err("no token");
        assert_eq!(err, GatewayError::MissingCredential);

        assert!(proxy.audit().read_all().expect("journal").is_empty());
    }

    #[tokio::test]
    async fn expired_credentials_fail_exactly_like_forged_ones() {
        let (proxy, issuer, _dir) = test_proxy();
        let now = Utc::now().timestamp();
        let expired =
            issuer.issue_at("dr-house", Role::Clinician, now - 700, now - 100).expect("issue");

        let err = proxy
            .list(Some(&format!("Bearer {expired}")), "HospitalA")
            .await
            .expect_err("expired token");
        assert_eq!(err, GatewayError::InvalidOrExpiredCredential);
    }

    #[tokio::test]
    async fn clinician_store_is_forbidden_and_leaves_no_trace() {
        let (proxy, issuer, _dir) = test_proxy();
        let clinician = bearer(&issuer, "dr-house", Role::Clinician);
        let admin = bearer(&issuer, "admin-1", Role::Admin);

        let err = proxy
            .store(Some(&clinician), record("HospitalA", "case-1"))
            .await
            .expect_err("clinician may not store");
        assert_eq!(err, GatewayError::Forbidden { role: Role::Clinician });

        // Nothing was forwarded and nothing was audited.
        assert!(proxy.list(Some(&admin), "HospitalA").await.expect("list").is_empty());
        assert!(proxy.audit().read_all().expect("journal").is_empty());
    }

    #[tokio::test]
    async fn admin_store_succeeds_and_is_audited() {
        let (proxy, issuer, _dir) = test_proxy();
        let admin = bearer(&issuer, "admin-1", Role::Admin);

        let receipt = proxy
            .store(Some(&admin), record("Test", "x"))
            .await
            .expect("admin store");
        assert_eq!(receipt.status, "stored");
        assert_eq!(receipt.namespace, "Test");
        assert_eq!(receipt.record_id, "x");

        let entries = proxy.audit().read_all().expect("journal");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "admin-1");
        assert_eq!(entries[0].role, Role::Admin);
        assert_eq!(entries[0].action, AuditAction::Store);
        assert_eq!(entries[0].resource, "Test/x");
    }

    #[tokio::test]
    async fn every_excluded_role_is_forbidden_per_operation() {
        let (proxy, issuer, _dir) = test_proxy();

        let store_denied = [Role::Clinician, Role::Auditor];
        for role in store_denied {
            let carrier = bearer(&issuer, "subject", role);
            let err = proxy
                .store(Some(&carrier), record("HospitalA", "case-1"))
                .await
                .expect_err("store denied");
            assert_eq!(err, GatewayError::Forbidden { role });
        }

        let search_denied = [Role::Admin, Role::Researcher, Role::Auditor];
        for role in search_denied {
            let carrier = bearer(&issuer, "subject", role);
            let err = proxy
                .search(Some(&carrier), search_request("HospitalA"))
                .await
                .expect_err("search denied");
            assert_eq!(err, GatewayError::Forbidden { role });
        }

        let auditor = bearer(&issuer, "subject", Role::Auditor);
        let err = proxy.list(Some(&auditor), "HospitalA").await.expect_err("list denied");
        assert_eq!(err, GatewayError::Forbidden { role: Role::Auditor });
        let err =
            proxy.fetch(Some(&auditor), "HospitalA", "case-1").await.expect_err("fetch denied");
        assert_eq!(err, GatewayError::Forbidden { role: Role::Auditor });

        assert!(proxy.audit().read_all().expect("journal").is_empty());
    }

    #[tokio::test]
    async fn search_returns_hits_in_collaborator_order() {
        let (proxy, issuer, _dir) = test_proxy();
        let researcher = bearer(&issuer, "res-1", Role::Researcher);
        let clinician = bearer(&issuer, "dr-house", Role::Clinician);

        for id in ["case-b", "case-a", "case-c"] {
            proxy.store(Some(&researcher), record("HospitalA", id)).await.expect("store");
        }

        let hits =
            proxy.search(Some(&clinician), search_request("HospitalA")).await.expect("search");
        let ids: Vec<_> = hits.iter().map(|h| h.record_id.as_str()).collect();
        assert_eq!(ids, vec!["case-a", "case-b", "case-c"]);
        assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));

        let entries = proxy.audit().read_all().expect("journal");
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].action, AuditAction::Search);
        assert_eq!(entries[3].resource, "HospitalA");
    }

    #[tokio::test]
    async fn operations_never_leak_across_namespaces() {
        let (proxy, issuer, _dir) = test_proxy();
        let admin = bearer(&issuer, "admin-1", Role::Admin);
        let clinician = bearer(&issuer, "dr-house", Role::Clinician);

        proxy.store(Some(&admin), record("HospitalA", "case-1")).await.expect("store");

        let hits =
            proxy.search(Some(&clinician), search_request("HospitalB")).await.expect("search");
        assert!(hits.is_empty());
        assert!(proxy.list(Some(&admin), "HospitalB").await.expect("list").is_empty());
        let err = proxy
            .fetch(Some(&admin), "HospitalB", "case-1")
            .await
            .expect_err("record lives in HospitalA");
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fetch_passes_the_envelope_through_untouched() {
        let (proxy, issuer, _dir) = test_proxy();
        let admin = bearer(&issuer, "admin-1", Role::Admin);
        let stored = StoredRecord {
            namespace: "HospitalA".to_string(),
            case_id: "case-1".to_string(),
            envelope: Envelope::new("aabbccddeeff00112233aabb", "deadbeef"),
        };

        proxy.store(Some(&admin), stored.clone()).await.expect("store");
        let envelope = proxy.fetch(Some(&admin), "HospitalA", "case-1").await.expect("fetch");
        assert_eq!(envelope, stored.envelope);

        let entries = proxy.audit().read_all().expect("journal");
        assert_eq!(entries[1].action, AuditAction::Fetch);
        assert_eq!(entries[1].resource, "HospitalA/case-1");
    }

    #[tokio::test]
    async fn fetch_of_an_absent_record_is_not_found_and_unaudited() {
        let (proxy, issuer, _dir) = test_proxy();
        let admin = bearer(&issuer, "admin-1", Role::Admin);

        let err = proxy.fetch(Some(&admin), "HospitalA", "ghost").await.expect_err("absent");
        assert_eq!(err, GatewayError::NotFound { resource: "HospitalA/ghost".to_string() });
        assert!(proxy.audit().read_all().expect("journal").is_empty());
    }

    #[tokio::test]
    async fn whoami_echoes_the_identity_without_journaling() {
        let (proxy, issuer, _dir) = test_proxy();

        for role in Role::ALL {
            let carrier = bearer(&issuer, "subject-1", role);
            let identity = proxy.whoami(Some(&carrier)).expect("whoami");
            assert_eq!(identity, Identity::new("subject-1", role));
        }
        assert!(proxy.audit().read_all().expect("journal").is_empty());
    }

    #[tokio::test]
    async fn journal_attributes_every_actor_in_order() {
        let (proxy, issuer, _dir) = test_proxy();

        proxy
            .store(Some(&bearer(&issuer, "admin-1", Role::Admin)), record("HospitalA", "case-1"))
            .await
            .expect("store");
        proxy
            .store(Some(&bearer(&issuer, "res-1", Role::Researcher)), record("HospitalA", "case-2"))
            .await
            .expect("store");
        proxy
            .search(Some(&bearer(&issuer, "dr-house", Role::Clinician)), search_request("HospitalA"))
            .await
            .expect("search");
        proxy
            .list(Some(&bearer(&issuer, "admin-1", Role::Admin)), "HospitalA")
            .await
            .expect("list");

        let entries = proxy.audit().read_all().expect("journal");
        assert_eq!(entries.len(), 4);
        let actors: Vec<_> = entries.iter().map(|e| e.actor.as_str()).collect();
        assert_eq!(actors, vec!["admin-1", "res-1", "dr-house", "admin-1"]);
        let roles: Vec<_> = entries.iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::Admin, Role::Researcher, Role::Clinician, Role::Admin]);
        assert!(entries.windows(2).all(|pair| pair[0].ts <= pair[1].ts));
    }

    #[tokio::test]
    async fn an_unwritable_journal_never_fails_the_operation() {
        let config = SigningConfig::hs256("gateway-test-secret");
        let dir = tempfile::tempdir().expect("tempdir");
        // The journal path is a directory, so every append fails.
        let audit = Arc::new(AuditLog::new(dir.path()));
        let proxy = StorageProxy::new(
            RoleGate::new(TokenVerifier::new(&config)),
            InMemoryVectorIndex::new(),
            audit,
        );
        let issuer = TokenIssuer::new(&config);
        let admin = bearer(&issuer, "admin-1", Role::Admin);

        let receipt = proxy
            .store(Some(&admin), record("HospitalA", "case-1"))
            .await
            .expect("store succeeds despite the journal");
        assert_eq!(receipt.status, "stored");
        assert_eq!(proxy.audit().dropped(), 1);
    }

    struct UnreachableIndex;

    #[async_trait]
    impl VectorIndex for UnreachableIndex {
        async fn insert(&self, _record: &StoredRecord) -> Result<InsertReceipt, GatewayError> {
            Err(GatewayError::UpstreamTimeout)
        }

        async fn search(
            &self,
            _namespace: &str,
            _query: &Envelope,
            _limit: usize,
        ) -> Result<Vec<SearchHit>, GatewayError> {
            Err(GatewayError::UpstreamUnavailable { reason: "connection refused".to_string() })
        }

        async fn list(&self, _namespace: &str) -> Result<Vec<String>, GatewayError> {
            Err(GatewayError::UpstreamUnavailable { reason: "connection refused".to_string() })
        }

        async fn fetch(&self, _namespace: &str, _record_id: &str) -> Result<Envelope, GatewayError> {
            Err(GatewayError::UpstreamTimeout)
        }
    }

    #[tokio::test]
    async fn collaborator_failures_propagate_and_skip_the_journal() {
        let config = SigningConfig::hs256("gateway-test-secret");
        let dir = tempfile::tempdir().expect("tempdir");
        let audit = Arc::new(AuditLog::new(dir.path().join("audit.log")));
        let proxy = StorageProxy::new(
            RoleGate::new(TokenVerifier::new(&config)),
            UnreachableIndex,
            audit,
        );
        let issuer = TokenIssuer::new(&config);
        let admin = bearer(&issuer, "admin-1", Role::Admin);

        let err = proxy
            .store(Some(&admin), record("HospitalA", "case-1"))
            .await
            .expect_err("collaborator down");
        assert_eq!(err, GatewayError::UpstreamTimeout);

        let err = proxy.list(Some(&admin), "HospitalA").await.expect_err("collaborator down");
        assert!(matches!(err, GatewayError::UpstreamUnavailable { .. }));

        assert!(proxy.audit().read_all().expect("journal").is_empty());
        assert_eq!(proxy.audit().dropped(), 0);
    }
}
