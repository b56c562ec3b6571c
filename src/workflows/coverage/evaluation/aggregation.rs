use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::config::EvaluationConfig;
use super::domain::{
    CaseRecommendation, CriteriaId, CriterionOutcome, MatchId, MatchResult, PolicyCriteria,
    RequestId,
};

static MATCH_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_match_id() -> MatchId {
    let id = MATCH_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    MatchId(format!("match-{id:06}"))
}

/// Combine per-criterion outcomes into the final match result. Pure with
/// respect to the outcome set: completion order never affects the result.
pub fn aggregate(
    request_id: RequestId,
    outcomes: Vec<CriterionOutcome>,
    config: &EvaluationConfig,
) -> MatchResult {
    let mut criteria_scores = BTreeMap::new();
    let mut evidence_mapping = BTreeMap::new();
    for outcome in outcomes {
        criteria_scores.insert(outcome.criteria_id.clone(), outcome.score);
        evidence_mapping.insert(outcome.criteria_id, outcome.matching_evidence);
    }

    let missing_criteria: Vec<CriteriaId> = criteria_scores
        .iter()
        .filter(|(_, score)| **score < config.match_threshold)
        .map(|(id, _)| id.clone())
        .collect();

    let overall_confidence = if criteria_scores.is_empty() {
        0.0
    } else {
        criteria_scores.values().sum::<f64>() / criteria_scores.len() as f64
    };

    let recommendation =
        decide_recommendation(&missing_criteria, overall_confidence, &criteria_scores, config);

    MatchResult {
        id: next_match_id(),
        request_id,
        overall_confidence,
        criteria_scores,
        evidence_mapping,
        missing_criteria,
        recommendation,
        evaluated_at: Utc::now(),
    }
}

fn decide_recommendation(
    missing_criteria: &[CriteriaId],
    overall_confidence: f64,
    criteria_scores: &BTreeMap<CriteriaId, f64>,
    config: &EvaluationConfig,
) -> CaseRecommendation {
    // Incomplete criteria coverage takes precedence over every other signal.
    if !missing_criteria.is_empty() {
        return CaseRecommendation::Deny;
    }

    if overall_confidence >= config.match_threshold
        && criteria_scores
            .values()
            .all(|score| *score >= config.match_threshold)
    {
        return CaseRecommendation::Approve;
    }

    CaseRecommendation::Review
}

/// Advisory gate checking that every mandatory criterion cleared the
/// stricter mandatory threshold. Does not feed into `aggregate`'s
/// recommendation; callers wanting the stricter reading invoke it
/// explicitly.
pub fn evaluate_mandatory_criteria(
    criteria_scores: &BTreeMap<CriteriaId, f64>,
    criteria: &[PolicyCriteria],
    config: &EvaluationConfig,
) -> bool {
    criteria
        .iter()
        .filter(|criterion| criterion.mandatory)
        .all(|criterion| {
            criteria_scores
                .get(&criterion.id)
                .map(|score| *score >= config.mandatory_threshold)
                .unwrap_or(false)
        })
}
