use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::aggregation::aggregate;
use super::cache::{Fingerprint, MatchCache};
use super::collaborator::{ScoringCollaborator, ScoringError};
use super::config::EvaluationConfig;
use super::domain::{
    ClinicalEvidence, CriterionOutcome, CriterionProfile, MatchResult, PolicyCriteria, RequestId,
};
use super::intake::IntakeGuard;
use super::observer::MatchObserver;
use super::quality::EvidenceQualityScorer;
use super::EvaluationError;

/// Service composing the intake guard, quality scorer, scoring collaborator,
/// and shared result cache into the per-request matching workflow.
pub struct CriteriaMatchService<S, O> {
    guard: IntakeGuard,
    collaborator: Arc<S>,
    observer: Arc<O>,
    cache: Arc<MatchCache>,
    config: EvaluationConfig,
}

impl<S, O> CriteriaMatchService<S, O>
where
    S: ScoringCollaborator + 'static,
    O: MatchObserver + 'static,
{
    pub fn new(
        collaborator: Arc<S>,
        observer: Arc<O>,
        cache: Arc<MatchCache>,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            guard: IntakeGuard,
            collaborator,
            observer,
            cache,
            config,
        }
    }

    /// Evaluate every policy criterion against the evidence set and
    /// aggregate a recommendation.
    ///
    /// Validation runs eagerly, so malformed input never reaches the
    /// collaborator. Per-criterion evaluation fans out under the configured
    /// concurrency limit; the first scoring failure aborts every sibling
    /// unit and becomes the sole error returned. Dropping the returned
    /// future cancels all in-flight units.
    pub async fn match_criteria(
        &self,
        request_id: RequestId,
        evidence: &[ClinicalEvidence],
        criteria: &[PolicyCriteria],
    ) -> Result<MatchResult, EvaluationError> {
        let plan = self.guard.screen_case(evidence, criteria)?;
        self.observer
            .match_started(&request_id, plan.evidence.len(), plan.criteria.len());

        let qualifying = Arc::new(self.quality_filter(&plan.evidence).await?);

        let limiter = Arc::new(Semaphore::new(self.config.concurrency_limit.max(1)));
        let mut units = JoinSet::new();
        for criterion in plan.criteria {
            let limiter = limiter.clone();
            let collaborator = self.collaborator.clone();
            let cache = self.cache.clone();
            let observer = self.observer.clone();
            let qualifying = qualifying.clone();
            let request_id = request_id.clone();
            let config = self.config.clone();
            units.spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| ScoringError::Service("evaluation cancelled".to_string()))?;
                evaluate_criterion(
                    collaborator,
                    cache,
                    observer,
                    config,
                    request_id,
                    criterion,
                    qualifying,
                )
                .await
            });
        }

        let mut outcomes = Vec::new();
        while let Some(unit) = units.join_next().await {
            match unit {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(error)) => {
                    units.abort_all();
                    return Err(error.into());
                }
                Err(join_error) => {
                    units.abort_all();
                    return Err(EvaluationError::Scoring(ScoringError::Service(format!(
                        "criterion evaluation unit failed: {join_error}"
                    ))));
                }
            }
        }

        let result = aggregate(request_id.clone(), outcomes, &self.config);
        self.observer.match_completed(&request_id, &result);
        Ok(result)
    }

    /// Quality-score every evidence item once up front; items below the
    /// quality floor contribute no matches for any criterion.
    async fn quality_filter(
        &self,
        evidence: &[ClinicalEvidence],
    ) -> Result<Vec<ClinicalEvidence>, EvaluationError> {
        let scorer = EvidenceQualityScorer::new(self.collaborator.clone(), self.config.clone());
        let mut qualifying = Vec::with_capacity(evidence.len());
        for item in evidence {
            let quality = scorer.score(item).await?;
            if quality.score >= self.config.quality_floor {
                qualifying.push(item.clone());
            } else {
                tracing::debug!(
                    evidence = %item.id.0,
                    score = quality.score,
                    "evidence below quality floor excluded from matching"
                );
            }
        }
        Ok(qualifying)
    }
}

async fn evaluate_criterion<S, O>(
    collaborator: Arc<S>,
    cache: Arc<MatchCache>,
    observer: Arc<O>,
    config: EvaluationConfig,
    request_id: RequestId,
    criterion: CriterionProfile,
    evidence: Arc<Vec<ClinicalEvidence>>,
) -> Result<CriterionOutcome, ScoringError>
where
    S: ScoringCollaborator,
    O: MatchObserver,
{
    let fingerprint = Fingerprint::for_pair(&criterion.id, evidence.iter().map(|item| &item.id));
    if let Some(hit) = cache.get(&fingerprint).await {
        observer.criterion_evaluated(&request_id, &criterion.id, hit.score, true);
        return Ok(hit);
    }

    let threshold = config.evidence_threshold(criterion.mandatory);
    let mut best_score = 0.0_f64;
    let mut matching_evidence = Vec::new();
    for item in evidence.iter() {
        let score = collaborator
            .score_criterion(item, &criterion, &request_id)
            .await?;
        if !(0.0..=1.0).contains(&score) {
            return Err(ScoringError::MalformedResponse(format!(
                "confidence {score} for criterion {} outside [0, 1]",
                criterion.id.0
            )));
        }
        if score > best_score {
            best_score = score;
        }
        if score >= threshold {
            matching_evidence.push(item.id.clone());
        }
    }

    let outcome = CriterionOutcome {
        criteria_id: criterion.id.clone(),
        score: best_score,
        matching_evidence,
    };
    cache.insert(fingerprint, outcome.clone()).await;
    observer.criterion_evaluated(&request_id, &criterion.id, outcome.score, false);
    Ok(outcome)
}
