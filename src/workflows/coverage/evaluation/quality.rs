use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;

use super::collaborator::{EntityExtraction, ScoringCollaborator};
use super::config::EvaluationConfig;
use super::domain::{
    ClinicalEntityKind, ClinicalEvidence, QualityRecommendation, QualityResult,
};
use super::intake::{IntakeGuard, MAX_EVIDENCE_AGE_DAYS};
use super::EvaluationError;

const COMPLETENESS_WEIGHT: f64 = 0.5;
const ENTITY_QUALITY_WEIGHT: f64 = 0.3;
const AGE_WEIGHT: f64 = 0.2;

/// Scorer computing a normalized, defensible quality score for one evidence
/// item from extracted entities, completeness weights, and evidence age.
pub struct EvidenceQualityScorer<S> {
    collaborator: Arc<S>,
    config: EvaluationConfig,
}

impl<S> EvidenceQualityScorer<S>
where
    S: ScoringCollaborator,
{
    pub fn new(collaborator: Arc<S>, config: EvaluationConfig) -> Self {
        Self {
            collaborator,
            config,
        }
    }

    /// Score one evidence item. Fails fast on empty clinical data or
    /// evidence past the validity window; extraction failures surface after
    /// the collaborator's retry budget.
    pub async fn score(&self, evidence: &ClinicalEvidence) -> Result<QualityResult, EvaluationError> {
        IntakeGuard::screen_evidence(evidence, Utc::now())?;
        let extraction = self.collaborator.extract_entities(evidence).await?;
        Ok(self.assemble(evidence, &extraction))
    }

    fn assemble(&self, evidence: &ClinicalEvidence, extraction: &EntityExtraction) -> QualityResult {
        let mut entity_scores = BTreeMap::new();
        let mut missing_entities = BTreeSet::new();
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for kind in ClinicalEntityKind::ALL {
            weight_total += kind.weight();
            match extraction.entities.get(kind.label()) {
                Some(entity) => {
                    let contribution = entity.confidence * kind.weight();
                    weighted_sum += contribution;
                    entity_scores.insert(kind, contribution);
                }
                None => {
                    missing_entities.insert(kind);
                }
            }
        }

        let completeness = if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            0.0
        };

        let entity_quality = if extraction.confidence_scores.is_empty() {
            0.0
        } else {
            extraction.confidence_scores.values().sum::<f64>()
                / extraction.confidence_scores.len() as f64
        };

        let age_score = age_score_for(evidence.age_days(Utc::now()));

        let raw = completeness * COMPLETENESS_WEIGHT
            + entity_quality * ENTITY_QUALITY_WEIGHT
            + age_score * AGE_WEIGHT;
        let score = round_to_hundredths(raw.clamp(0.0, 1.0));

        let recommendation = if score >= self.config.quality_approval_floor {
            QualityRecommendation::Approve
        } else {
            QualityRecommendation::Review
        };

        QualityResult {
            score,
            missing_entities,
            entity_scores,
            age_score,
            recommendation,
        }
    }
}

/// Linear decay from 1.0 (recorded today or future-dated) down to 0.0 at the
/// validity window boundary.
fn age_score_for(age_days: i64) -> f64 {
    if age_days <= 0 {
        1.0
    } else if age_days >= MAX_EVIDENCE_AGE_DAYS {
        0.0
    } else {
        1.0 - age_days as f64 / MAX_EVIDENCE_AGE_DAYS as f64
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
