use serde::{Deserialize, Serialize};

/// Threshold dials governing quality gating, criterion matching, and fan-out
/// width for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Quality score an evidence item must reach to be considered for any criterion.
    pub quality_floor: f64,
    /// Quality score at which evidence-level triage recommends approval.
    pub quality_approval_floor: f64,
    /// Score at or above which evidence matches a non-mandatory criterion and
    /// below which a criterion is classified missing.
    pub match_threshold: f64,
    /// Stricter score evidence must reach to match a mandatory criterion.
    pub mandatory_threshold: f64,
    /// Maximum criteria evaluated concurrently for one request.
    pub concurrency_limit: usize,
}

impl EvaluationConfig {
    pub(crate) fn evidence_threshold(&self, mandatory: bool) -> f64 {
        if mandatory {
            self.mandatory_threshold
        } else {
            self.match_threshold
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            quality_floor: 0.75,
            quality_approval_floor: 0.70,
            match_threshold: 0.75,
            mandatory_threshold: 0.85,
            concurrency_limit: 5,
        }
    }
}
