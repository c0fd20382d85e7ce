//! Sealed record types. The gateway moves these around without ever looking
//! inside: the envelope is opaque bytes from its point of view.

use serde::{Deserialize, Serialize};

/// Nonce and ciphertext produced by authenticated encryption, both
/// hex-encoded. The nonce is public; secrecy lives in the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub nonce: String,
    pub ciphertext: String,
}

impl Envelope {
    pub fn new(nonce: impl Into<String>, ciphertext: impl Into<String>) -> Self {
        Self { nonce: nonce.into(), ciphertext: ciphertext.into() }
    }
}

/// A sealed clinical record addressed by tenant namespace and case id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub namespace: String,
    pub case_id: String,
    pub envelope: Envelope,
}

/// Collaborator acknowledgement for an insert. Carries the namespace back as
/// a first-class field so downstream isolation checks never have to infer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReceipt {
    pub status: String,
    pub namespace: String,
    pub record_id: String,
}

/// One ranked result from an encrypted search. Scoring semantics belong to
/// the collaborator; the gateway reports scores verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub record_id: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_stable_field_names() {
        let envelope = Envelope::new("00aabb", "deadbeef");
        let json = serde_json::to_value(&envelope).expect("serialize envelope");
        assert_eq!(json["nonce"], "00aabb");
        assert_eq!(json["ciphertext"], "deadbeef");
    }

    #[test]
    fn stored_record_round_trips_through_json() {
        let record = StoredRecord {
            namespace: "HospitalA".to_string(),
            case_id: "case-001".to_string(),
            envelope: Envelope::new("00", "ff"),
        };
        let json = serde_json::to_string(&record).expect("serialize record");
        let back: StoredRecord = serde_json::from_str(&json).expect("deserialize record");
        assert_eq!(back, record);
    }
}
