use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::domain::{CriteriaId, CriterionOutcome, EvidenceId};

/// Deterministic key derived from a criterion id and the ordered evidence ids
/// under consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Each id is length-prefixed so distinct id sequences can never hash to
    /// the same byte stream.
    pub fn for_pair<'a, I>(criteria_id: &CriteriaId, evidence_ids: I) -> Self
    where
        I: IntoIterator<Item = &'a EvidenceId>,
    {
        let mut hasher = Sha256::new();
        hasher.update((criteria_id.0.len() as u64).to_be_bytes());
        hasher.update(criteria_id.0.as_bytes());
        for id in evidence_ids {
            hasher.update((id.0.len() as u64).to_be_bytes());
            hasher.update(id.0.as_bytes());
        }
        Self(hasher.finalize().into())
    }
}

/// Concurrency-safe map from fingerprints to previously computed criterion
/// outcomes, shared across in-flight criteria and concurrent requests.
/// Writes are idempotent (same fingerprint, same value), so a lost race
/// simply rewrites an identical entry. Process lifetime, no eviction;
/// correctness never depends on a hit.
#[derive(Debug, Default)]
pub struct MatchCache {
    entries: RwLock<HashMap<Fingerprint, CriterionOutcome>>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CriterionOutcome> {
        self.entries.read().await.get(fingerprint).cloned()
    }

    pub async fn insert(&self, fingerprint: Fingerprint, outcome: CriterionOutcome) {
        self.entries.write().await.insert(fingerprint, outcome);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
