use chrono::Utc;
use serde::Serialize;

use crate::tracker::tracker_model::TrackerState;

/// One line of the JSONL decision trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: i64,
    pub step: u64,

    pub tracker_state: String,
    pub event: String,
    pub form_index: Option<usize>,

    pub decision: Option<String>,
    pub suppression_reason: Option<String>,
}

impl TraceEvent {
    pub fn now(step: u64, state: &TrackerState, event: impl ToString) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            step,
            tracker_state: format!("{:?}", state),
            event: event.to_string(),
            form_index: None,
            decision: None,
            suppression_reason: None,
        }
    }

    pub fn with_form(mut self, form_index: usize) -> Self {
        self.form_index = Some(form_index);
        self
    }

    pub fn with_decision(mut self, decision: impl ToString) -> Self {
        self.decision = Some(decision.to_string());
        self
    }

    pub fn with_suppression(mut self, reason: impl ToString) -> Self {
        self.suppression_reason = Some(reason.to_string());
        self
    }
}
