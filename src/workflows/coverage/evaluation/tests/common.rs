use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::workflows::coverage::evaluation::collaborator::{
    EntityExtraction, ExtractedEntity, ScoringCollaborator, ScoringError,
};
use crate::workflows::coverage::evaluation::domain::{
    CaseRecommendation, ClinicalEntityKind, ClinicalEvidence, ClinicalValue, CriteriaId,
    CriteriaType, CriterionProfile, EvidenceId, EvidenceSourceType, MatchResult, PolicyCriteria,
    RequestId,
};
use crate::workflows::coverage::evaluation::observer::{MatchObserver, NoopObserver};
use crate::workflows::coverage::evaluation::{
    CriteriaMatchService, EvaluationConfig, EvidenceQualityScorer, MatchCache,
};

pub(super) fn clinical_data() -> BTreeMap<String, ClinicalValue> {
    let mut data = BTreeMap::new();
    data.insert(
        "chief_complaint".to_string(),
        ClinicalValue::Text("progressive joint pain".to_string()),
    );
    data.insert("hemoglobin_a1c".to_string(), ClinicalValue::Number(7.2));
    data.insert("ambulatory".to_string(), ClinicalValue::Flag(true));
    data
}

pub(super) fn evidence(suffix: &str, days_old: i64) -> ClinicalEvidence {
    ClinicalEvidence {
        id: EvidenceId(format!("ev-{suffix}")),
        source_type: EvidenceSourceType::Emr,
        source_id: "epic-chart-88213".to_string(),
        clinical_data: clinical_data(),
        recorded_at: Utc::now() - ChronoDuration::days(days_old),
        confidence_score: None,
        metadata: BTreeMap::new(),
    }
}

pub(super) fn criterion(suffix: &str, mandatory: bool) -> PolicyCriteria {
    let mut requirements = BTreeMap::new();
    requirements.insert(
        "step_therapy".to_string(),
        ClinicalValue::Text("documented failure of two preferred agents".to_string()),
    );
    PolicyCriteria {
        id: CriteriaId(format!("crit-{suffix}")),
        criteria_type: CriteriaType::Clinical,
        description: "Trial and failure of preferred formulary alternatives".to_string(),
        requirements,
        mandatory,
        weight: 0.8,
        validation_rules: BTreeMap::new(),
    }
}

pub(super) fn full_extraction(confidence: f64) -> EntityExtraction {
    partial_extraction(&ClinicalEntityKind::ALL, confidence)
}

pub(super) fn partial_extraction(
    kinds: &[ClinicalEntityKind],
    confidence: f64,
) -> EntityExtraction {
    let mut entities = BTreeMap::new();
    let mut confidence_scores = BTreeMap::new();
    for kind in kinds {
        entities.insert(
            kind.label().to_string(),
            ExtractedEntity {
                confidence,
                value: ClinicalValue::Text(format!("{} details", kind.label())),
            },
        );
        confidence_scores.insert(kind.label().to_string(), confidence);
    }
    EntityExtraction {
        entities,
        confidence_scores,
    }
}

pub(super) fn evaluation_config() -> EvaluationConfig {
    EvaluationConfig::default()
}

pub(super) fn request() -> RequestId {
    RequestId("req-1042".to_string())
}

pub(super) fn quality_scorer(
    collaborator: Arc<ScriptedCollaborator>,
) -> EvidenceQualityScorer<ScriptedCollaborator> {
    EvidenceQualityScorer::new(collaborator, evaluation_config())
}

pub(super) fn build_service(
    collaborator: Arc<ScriptedCollaborator>,
) -> CriteriaMatchService<ScriptedCollaborator, NoopObserver> {
    CriteriaMatchService::new(
        collaborator,
        Arc::new(NoopObserver),
        Arc::new(MatchCache::new()),
        evaluation_config(),
    )
}

/// Scripted collaborator returning deterministic extractions and scores so
/// suites can drive exact scenarios without a live backend.
pub(super) struct ScriptedCollaborator {
    default_extraction: EntityExtraction,
    extraction_overrides: HashMap<String, EntityExtraction>,
    scores: HashMap<(String, String), f64>,
    default_score: f64,
    score_delay: Option<Duration>,
    pub(super) extract_calls: AtomicUsize,
    pub(super) score_calls: AtomicUsize,
    scored_pairs: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    pub(super) peak_in_flight: AtomicUsize,
}

impl ScriptedCollaborator {
    pub(super) fn new() -> Self {
        Self {
            default_extraction: full_extraction(0.9),
            extraction_overrides: HashMap::new(),
            scores: HashMap::new(),
            default_score: 0.9,
            score_delay: None,
            extract_calls: AtomicUsize::new(0),
            score_calls: AtomicUsize::new(0),
            scored_pairs: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub(super) fn with_extraction(mut self, extraction: EntityExtraction) -> Self {
        self.default_extraction = extraction;
        self
    }

    pub(super) fn with_extraction_for(
        mut self,
        evidence_id: &EvidenceId,
        extraction: EntityExtraction,
    ) -> Self {
        self.extraction_overrides
            .insert(evidence_id.0.clone(), extraction);
        self
    }

    pub(super) fn with_score(
        mut self,
        criteria_id: &CriteriaId,
        evidence_id: &EvidenceId,
        score: f64,
    ) -> Self {
        self.scores
            .insert((criteria_id.0.clone(), evidence_id.0.clone()), score);
        self
    }

    pub(super) fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = score;
        self
    }

    pub(super) fn with_score_delay(mut self, delay: Duration) -> Self {
        self.score_delay = Some(delay);
        self
    }

    pub(super) fn scored_pairs(&self) -> Vec<(String, String)> {
        self.scored_pairs
            .lock()
            .expect("scored pair mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl ScoringCollaborator for ScriptedCollaborator {
    async fn extract_entities(
        &self,
        evidence: &ClinicalEvidence,
    ) -> Result<EntityExtraction, ScoringError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .extraction_overrides
            .get(&evidence.id.0)
            .cloned()
            .unwrap_or_else(|| self.default_extraction.clone()))
    }

    async fn score_criterion(
        &self,
        evidence: &ClinicalEvidence,
        criterion: &CriterionProfile,
        _request_id: &RequestId,
    ) -> Result<f64, ScoringError> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.score_delay {
            tokio::time::sleep(delay).await;
        }
        self.scored_pairs
            .lock()
            .expect("scored pair mutex poisoned")
            .push((criterion.id.0.clone(), evidence.id.0.clone()));
        let score = self
            .scores
            .get(&(criterion.id.0.clone(), evidence.id.0.clone()))
            .copied()
            .unwrap_or(self.default_score);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(score)
    }
}

/// Collaborator failing a fixed number of scoring calls before succeeding,
/// with a shared attempt counter for retry assertions.
pub(super) struct FlakyCollaborator {
    failures: usize,
    score: f64,
    attempts: Arc<AtomicUsize>,
}

impl FlakyCollaborator {
    pub(super) fn new(failures: usize, score: f64, attempts: Arc<AtomicUsize>) -> Self {
        Self {
            failures,
            score,
            attempts,
        }
    }
}

#[async_trait]
impl ScoringCollaborator for FlakyCollaborator {
    async fn extract_entities(
        &self,
        _evidence: &ClinicalEvidence,
    ) -> Result<EntityExtraction, ScoringError> {
        Ok(full_extraction(0.9))
    }

    async fn score_criterion(
        &self,
        _evidence: &ClinicalEvidence,
        _criterion: &CriterionProfile,
        _request_id: &RequestId,
    ) -> Result<f64, ScoringError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            Err(ScoringError::RateLimited)
        } else {
            Ok(self.score)
        }
    }
}

/// Collaborator whose scoring backend is permanently offline.
#[derive(Default)]
pub(super) struct FailingCollaborator {
    pub(super) score_calls: AtomicUsize,
}

#[async_trait]
impl ScoringCollaborator for FailingCollaborator {
    async fn extract_entities(
        &self,
        _evidence: &ClinicalEvidence,
    ) -> Result<EntityExtraction, ScoringError> {
        Ok(full_extraction(0.9))
    }

    async fn score_criterion(
        &self,
        _evidence: &ClinicalEvidence,
        _criterion: &CriterionProfile,
        _request_id: &RequestId,
    ) -> Result<f64, ScoringError> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        Err(ScoringError::Service("scoring backend offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum ObserverEvent {
    Started { evidence: usize, criteria: usize },
    Criterion { criteria_id: String, cache_hit: bool },
    Completed { recommendation: CaseRecommendation },
}

/// Observer recording every event for assertions.
#[derive(Default)]
pub(super) struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub(super) fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl MatchObserver for RecordingObserver {
    fn match_started(&self, _: &RequestId, evidence_count: usize, criteria_count: usize) {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(ObserverEvent::Started {
                evidence: evidence_count,
                criteria: criteria_count,
            });
    }

    fn criterion_evaluated(
        &self,
        _: &RequestId,
        criteria_id: &CriteriaId,
        _score: f64,
        cache_hit: bool,
    ) {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(ObserverEvent::Criterion {
                criteria_id: criteria_id.0.clone(),
                cache_hit,
            });
    }

    fn match_completed(&self, _: &RequestId, result: &MatchResult) {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(ObserverEvent::Completed {
                recommendation: result.recommendation,
            });
    }
}
