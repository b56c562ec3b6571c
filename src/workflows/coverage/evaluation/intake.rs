use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{
    ClinicalEvidence, ClinicalValue, CriteriaId, CriterionProfile, EvidenceId, PolicyCriteria,
    ValidationRule, ValidationRuleKind,
};

/// Validation errors raised by the intake guard before any scoring work is
/// scheduled. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("evaluation requires at least one evidence item")]
    NoEvidence,
    #[error("evaluation requires at least one policy criterion")]
    NoCriteria,
    #[error("evidence {0:?} has an empty clinical_data mapping")]
    EmptyClinicalData(EvidenceId),
    #[error("evidence {id:?} source_id must be 1-255 characters (found {found})")]
    SourceIdLength { id: EvidenceId, found: usize },
    #[error("evidence {id:?} recorded {age_days} days ago exceeds the {max} day validity window")]
    StaleEvidence {
        id: EvidenceId,
        age_days: i64,
        max: i64,
    },
    #[error("evidence {id:?} pre-scored confidence {score} outside the accepted [0.75, 1.0] band")]
    PrescoredConfidence { id: EvidenceId, score: f64 },
    #[error("criterion {id:?} description must be 1-1000 characters (found {found})")]
    DescriptionLength { id: CriteriaId, found: usize },
    #[error("criterion {0:?} has an empty requirements mapping")]
    EmptyRequirements(CriteriaId),
    #[error("criterion {id:?} validation rule '{rule}' is malformed: {reason}")]
    MalformedValidationRule {
        id: CriteriaId,
        rule: String,
        reason: String,
    },
}

pub(crate) const MAX_EVIDENCE_AGE_DAYS: i64 = 365;

const PRESCORED_CONFIDENCE_FLOOR: f64 = 0.75;
const MAX_SOURCE_ID_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Screened inputs ready for quality scoring and criterion matching.
#[derive(Debug, Clone)]
pub struct CasePlan {
    pub evidence: Vec<ClinicalEvidence>,
    pub criteria: Vec<CriterionProfile>,
}

/// Guard responsible for producing `CasePlan` instances. All checks run
/// eagerly so malformed input never reaches the scoring collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    /// Validate a full case submission and return the sanitized plan.
    pub fn screen_case(
        &self,
        evidence: &[ClinicalEvidence],
        criteria: &[PolicyCriteria],
    ) -> Result<CasePlan, ValidationError> {
        if evidence.is_empty() {
            return Err(ValidationError::NoEvidence);
        }
        if criteria.is_empty() {
            return Err(ValidationError::NoCriteria);
        }

        let now = Utc::now();
        for item in evidence {
            Self::screen_evidence(item, now)?;
        }

        let criteria = criteria
            .iter()
            .map(Self::screen_criterion)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CasePlan {
            evidence: evidence.to_vec(),
            criteria,
        })
    }

    /// Re-checkable per-item validation shared with the quality scorer.
    pub(crate) fn screen_evidence(
        item: &ClinicalEvidence,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let source_chars = item.source_id.chars().count();
        if source_chars == 0 || source_chars > MAX_SOURCE_ID_CHARS {
            return Err(ValidationError::SourceIdLength {
                id: item.id.clone(),
                found: source_chars,
            });
        }

        if item.clinical_data.is_empty() {
            return Err(ValidationError::EmptyClinicalData(item.id.clone()));
        }

        let age_days = item.age_days(now);
        if age_days > MAX_EVIDENCE_AGE_DAYS {
            return Err(ValidationError::StaleEvidence {
                id: item.id.clone(),
                age_days,
                max: MAX_EVIDENCE_AGE_DAYS,
            });
        }

        if let Some(score) = item.confidence_score {
            if !(PRESCORED_CONFIDENCE_FLOOR..=1.0).contains(&score) {
                return Err(ValidationError::PrescoredConfidence {
                    id: item.id.clone(),
                    score,
                });
            }
        }

        Ok(())
    }

    fn screen_criterion(criterion: &PolicyCriteria) -> Result<CriterionProfile, ValidationError> {
        let description_chars = criterion.description.chars().count();
        if description_chars == 0 || description_chars > MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionLength {
                id: criterion.id.clone(),
                found: description_chars,
            });
        }

        if criterion.requirements.is_empty() {
            return Err(ValidationError::EmptyRequirements(criterion.id.clone()));
        }

        let mut rules = BTreeMap::new();
        for (name, raw) in &criterion.validation_rules {
            let rule = Self::parse_rule(&criterion.id, name, raw)?;
            rules.insert(name.clone(), rule);
        }

        // Out-of-range weights are normalized, not rejected.
        let weight = if criterion.weight.is_finite() {
            criterion.weight.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(CriterionProfile {
            id: criterion.id.clone(),
            criteria_type: criterion.criteria_type,
            description: criterion.description.clone(),
            requirements: criterion.requirements.clone(),
            mandatory: criterion.mandatory,
            weight,
            rules,
        })
    }

    fn parse_rule(
        id: &CriteriaId,
        name: &str,
        raw: &ClinicalValue,
    ) -> Result<ValidationRule, ValidationError> {
        let malformed = |reason: &str| ValidationError::MalformedValidationRule {
            id: id.clone(),
            rule: name.to_string(),
            reason: reason.to_string(),
        };

        let fields = raw
            .as_mapping()
            .ok_or_else(|| malformed("rule must be a mapping"))?;

        let kind_label = fields
            .get("type")
            .and_then(ClinicalValue::as_str)
            .ok_or_else(|| malformed("missing 'type' field"))?;
        let kind = ValidationRuleKind::from_label(kind_label)
            .ok_or_else(|| malformed("unknown rule type"))?;

        let value = fields
            .get("value")
            .cloned()
            .ok_or_else(|| malformed("missing 'value' field"))?;

        Ok(ValidationRule { kind, value })
    }
}
