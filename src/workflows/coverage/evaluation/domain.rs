use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for a single item of clinical evidence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvidenceId(pub String);

/// Identifier wrapper for one coverage policy criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CriteriaId(pub String);

/// Caller-supplied identifier tying an evaluation to the submitting workflow request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Identifier minted for each aggregated match result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub String);

/// Structured clinical value so the engine can validate shape without
/// depending on the scoring collaborator's internal schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClinicalValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Sequence(Vec<ClinicalValue>),
    Mapping(BTreeMap<String, ClinicalValue>),
}

impl ClinicalValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClinicalValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, ClinicalValue>> {
        match self {
            ClinicalValue::Mapping(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Origin of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceSourceType {
    Emr,
    Document,
    Manual,
}

impl EvidenceSourceType {
    pub const fn label(self) -> &'static str {
        match self {
            EvidenceSourceType::Emr => "emr",
            EvidenceSourceType::Document => "document",
            EvidenceSourceType::Manual => "manual",
        }
    }
}

/// One unit of clinical documentation supporting a prior-authorization case.
/// Created by the ingestion layer and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEvidence {
    pub id: EvidenceId,
    pub source_type: EvidenceSourceType,
    pub source_id: String,
    pub clinical_data: BTreeMap<String, ClinicalValue>,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, ClinicalValue>,
}

impl ClinicalEvidence {
    /// Whole days elapsed since the evidence was recorded. Negative for
    /// future-dated records.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now.date_naive() - self.recorded_at.date_naive()).num_days()
    }
}

/// Category of a coverage policy criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriteriaType {
    Clinical,
    Administrative,
    Formulary,
}

impl CriteriaType {
    pub const fn label(self) -> &'static str {
        match self {
            CriteriaType::Clinical => "clinical",
            CriteriaType::Administrative => "administrative",
            CriteriaType::Formulary => "formulary",
        }
    }
}

/// One weighted, possibly-mandatory requirement from a payer's coverage
/// policy. `requirements` is consumed opaquely by the scoring collaborator;
/// `validation_rules` entries must parse against `ValidationRuleKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCriteria {
    pub id: CriteriaId,
    pub criteria_type: CriteriaType,
    pub description: String,
    pub requirements: BTreeMap<String, ClinicalValue>,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    pub weight: f64,
    #[serde(default)]
    pub validation_rules: BTreeMap<String, ClinicalValue>,
}

fn default_mandatory() -> bool {
    true
}

/// Rule kinds accepted in `validation_rules` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationRuleKind {
    Regex,
    Range,
    Enum,
    Dependency,
}

impl ValidationRuleKind {
    pub const fn label(self) -> &'static str {
        match self {
            ValidationRuleKind::Regex => "regex",
            ValidationRuleKind::Range => "range",
            ValidationRuleKind::Enum => "enum",
            ValidationRuleKind::Dependency => "dependency",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "regex" => Some(ValidationRuleKind::Regex),
            "range" => Some(ValidationRuleKind::Range),
            "enum" => Some(ValidationRuleKind::Enum),
            "dependency" => Some(ValidationRuleKind::Dependency),
            _ => None,
        }
    }
}

/// Parsed validation rule carried on a screened criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub kind: ValidationRuleKind,
    pub value: ClinicalValue,
}

/// The sanitized criterion after intake screening: weight clamped into
/// [0, 1] and validation rules parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionProfile {
    pub id: CriteriaId,
    pub criteria_type: CriteriaType,
    pub description: String,
    pub requirements: BTreeMap<String, ClinicalValue>,
    pub mandatory: bool,
    pub weight: f64,
    pub rules: BTreeMap<String, ValidationRule>,
}

/// The clinical entities extraction is expected to cover, with the fixed
/// weights used for completeness scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClinicalEntityKind {
    Diagnosis,
    Medications,
    LabResults,
    TreatmentHistory,
    Contraindications,
    Allergies,
}

impl ClinicalEntityKind {
    pub const ALL: [ClinicalEntityKind; 6] = [
        ClinicalEntityKind::Diagnosis,
        ClinicalEntityKind::Medications,
        ClinicalEntityKind::LabResults,
        ClinicalEntityKind::TreatmentHistory,
        ClinicalEntityKind::Contraindications,
        ClinicalEntityKind::Allergies,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ClinicalEntityKind::Diagnosis => "diagnosis",
            ClinicalEntityKind::Medications => "medications",
            ClinicalEntityKind::LabResults => "lab_results",
            ClinicalEntityKind::TreatmentHistory => "treatment_history",
            ClinicalEntityKind::Contraindications => "contraindications",
            ClinicalEntityKind::Allergies => "allergies",
        }
    }

    pub const fn weight(self) -> f64 {
        match self {
            ClinicalEntityKind::Diagnosis => 0.25,
            ClinicalEntityKind::Medications => 0.25,
            ClinicalEntityKind::LabResults => 0.20,
            ClinicalEntityKind::TreatmentHistory => 0.15,
            ClinicalEntityKind::Contraindications => 0.10,
            ClinicalEntityKind::Allergies => 0.05,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == label)
    }
}

/// Evidence-level triage verdict produced by the quality scorer, independent
/// of the case-level recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityRecommendation {
    Approve,
    Review,
}

impl QualityRecommendation {
    pub const fn label(self) -> &'static str {
        match self {
            QualityRecommendation::Approve => "approve",
            QualityRecommendation::Review => "review",
        }
    }
}

/// Quality assessment for one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub score: f64,
    pub missing_entities: BTreeSet<ClinicalEntityKind>,
    pub entity_scores: BTreeMap<ClinicalEntityKind, f64>,
    pub age_score: f64,
    pub recommendation: QualityRecommendation,
}

/// Case-level recommendation computed by the aggregator, never caller-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseRecommendation {
    Approve,
    Deny,
    Review,
}

impl CaseRecommendation {
    pub const fn label(self) -> &'static str {
        match self {
            CaseRecommendation::Approve => "approve",
            CaseRecommendation::Deny => "deny",
            CaseRecommendation::Review => "review",
        }
    }
}

/// Best score and matching evidence recorded for one evaluated criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub criteria_id: CriteriaId,
    pub score: f64,
    pub matching_evidence: Vec<EvidenceId>,
}

/// Aggregated outcome of matching one case against a policy's criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: MatchId,
    pub request_id: RequestId,
    pub overall_confidence: f64,
    pub criteria_scores: BTreeMap<CriteriaId, f64>,
    pub evidence_mapping: BTreeMap<CriteriaId, Vec<EvidenceId>>,
    pub missing_criteria: Vec<CriteriaId>,
    pub recommendation: CaseRecommendation,
    pub evaluated_at: DateTime<Utc>,
}

impl MatchResult {
    /// Human-readable digest for audit trails and reviewer-facing views.
    pub fn summary(&self) -> String {
        if self.missing_criteria.is_empty() {
            format!(
                "{} with overall confidence {:.2} across {} criteria",
                self.recommendation.label(),
                self.overall_confidence,
                self.criteria_scores.len()
            )
        } else {
            format!(
                "{} with overall confidence {:.2}; {} of {} criteria below the match threshold",
                self.recommendation.label(),
                self.overall_confidence,
                self.missing_criteria.len(),
                self.criteria_scores.len()
            )
        }
    }
}
