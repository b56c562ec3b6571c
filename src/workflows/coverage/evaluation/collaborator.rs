use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{ClinicalEvidence, ClinicalValue, CriterionProfile, RequestId};

/// One entity the collaborator extracted, with its confidence in the extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub confidence: f64,
    pub value: ClinicalValue,
}

/// Structured extraction returned by the scoring collaborator for one
/// evidence item's clinical data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityExtraction {
    pub entities: BTreeMap<String, ExtractedEntity>,
    pub confidence_scores: BTreeMap<String, f64>,
}

/// Error enumeration for scoring collaborator failures. Surfaced only after
/// the retry budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring call timed out")]
    Timeout,
    #[error("scoring service rate limited the request")]
    RateLimited,
    #[error("scoring service unavailable: {0}")]
    Service(String),
    #[error("scoring response malformed: {0}")]
    MalformedResponse(String),
}

/// Contract for the external service that extracts clinical entities from
/// evidence and scores evidence against criterion requirements. Both calls
/// are I/O-bound and may fail transiently.
#[async_trait]
pub trait ScoringCollaborator: Send + Sync {
    async fn extract_entities(
        &self,
        evidence: &ClinicalEvidence,
    ) -> Result<EntityExtraction, ScoringError>;

    /// Confidence in [0, 1] that the evidence satisfies the criterion's
    /// requirements.
    async fn score_criterion(
        &self,
        evidence: &ClinicalEvidence,
        criterion: &CriterionProfile,
        request_id: &RequestId,
    ) -> Result<f64, ScoringError>;
}

/// Retry budget applied to each collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Exponential backoff: base delay doubled for every completed attempt.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

/// Collaborator wrapper applying the retry budget with exponential backoff
/// before surfacing a failure to the orchestrator.
#[derive(Debug)]
pub struct RetryingCollaborator<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingCollaborator<S> {
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S> ScoringCollaborator for RetryingCollaborator<S>
where
    S: ScoringCollaborator,
{
    async fn extract_entities(
        &self,
        evidence: &ClinicalEvidence,
    ) -> Result<EntityExtraction, ScoringError> {
        let mut attempt = 1;
        loop {
            match self.inner.extract_entities(evidence).await {
                Ok(extraction) => return Ok(extraction),
                Err(error) if attempt < self.policy.max_attempts => {
                    tracing::warn!(
                        evidence = %evidence.id.0,
                        attempt,
                        %error,
                        "entity extraction failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn score_criterion(
        &self,
        evidence: &ClinicalEvidence,
        criterion: &CriterionProfile,
        request_id: &RequestId,
    ) -> Result<f64, ScoringError> {
        let mut attempt = 1;
        loop {
            match self
                .inner
                .score_criterion(evidence, criterion, request_id)
                .await
            {
                Ok(score) => return Ok(score),
                Err(error) if attempt < self.policy.max_attempts => {
                    tracing::warn!(
                        criterion = %criterion.id.0,
                        evidence = %evidence.id.0,
                        attempt,
                        %error,
                        "criterion scoring failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
