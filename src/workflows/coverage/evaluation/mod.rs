//! Coverage criteria evaluation: evidence quality scoring, bounded-concurrency
//! criterion matching against an external scoring collaborator, and
//! aggregation of per-criterion results into a case recommendation.

mod aggregation;
pub mod cache;
pub mod collaborator;
mod config;
pub mod domain;
mod intake;
mod matcher;
pub mod observer;
mod quality;

#[cfg(test)]
mod tests;

pub use aggregation::{aggregate, evaluate_mandatory_criteria};
pub use cache::{Fingerprint, MatchCache};
pub use collaborator::{
    EntityExtraction, ExtractedEntity, RetryPolicy, RetryingCollaborator, ScoringCollaborator,
    ScoringError,
};
pub use config::EvaluationConfig;
pub use domain::{
    CaseRecommendation, ClinicalEntityKind, ClinicalEvidence, ClinicalValue, CriteriaId,
    CriteriaType, CriterionOutcome, CriterionProfile, EvidenceId, EvidenceSourceType, MatchId,
    MatchResult, PolicyCriteria, QualityRecommendation, QualityResult, RequestId, ValidationRule,
    ValidationRuleKind,
};
pub use intake::{CasePlan, IntakeGuard, ValidationError};
pub use matcher::CriteriaMatchService;
pub use observer::{MatchObserver, NoopObserver, TracingObserver};
pub use quality::EvidenceQualityScorer;

/// Error raised by the evaluation facade.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
