use super::domain::{CriteriaId, MatchResult, RequestId};

/// Audit hooks emitted at defined points of a match run so the engine stays
/// testable without inspecting log output.
pub trait MatchObserver: Send + Sync {
    fn match_started(&self, request_id: &RequestId, evidence_count: usize, criteria_count: usize);
    fn criterion_evaluated(
        &self,
        request_id: &RequestId,
        criteria_id: &CriteriaId,
        score: f64,
        cache_hit: bool,
    );
    fn match_completed(&self, request_id: &RequestId, result: &MatchResult);
}

/// Observer discarding every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MatchObserver for NoopObserver {
    fn match_started(&self, _: &RequestId, _: usize, _: usize) {}

    fn criterion_evaluated(&self, _: &RequestId, _: &CriteriaId, _: f64, _: bool) {}

    fn match_completed(&self, _: &RequestId, _: &MatchResult) {}
}

/// Observer forwarding events to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MatchObserver for TracingObserver {
    fn match_started(&self, request_id: &RequestId, evidence_count: usize, criteria_count: usize) {
        tracing::info!(
            request = %request_id.0,
            evidence_count,
            criteria_count,
            "criteria matching started"
        );
    }

    fn criterion_evaluated(
        &self,
        request_id: &RequestId,
        criteria_id: &CriteriaId,
        score: f64,
        cache_hit: bool,
    ) {
        tracing::debug!(
            request = %request_id.0,
            criterion = %criteria_id.0,
            score,
            cache_hit,
            "criterion evaluated"
        );
    }

    fn match_completed(&self, request_id: &RequestId, result: &MatchResult) {
        tracing::info!(
            request = %request_id.0,
            result = %result.summary(),
            "criteria matching completed"
        );
    }
}
