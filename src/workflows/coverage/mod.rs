pub mod evaluation;

pub use evaluation::{
    CaseRecommendation, ClinicalEvidence, CriteriaMatchService, EvaluationConfig, EvaluationError,
    MatchResult, PolicyCriteria, QualityResult,
};
