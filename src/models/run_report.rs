use serde::{Deserialize, Serialize};

use super::AlertKind;

/// Per-item outcomes kept in a report; the rest are only counted.
pub const MAX_OUTCOME_SAMPLES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Sent,
    Failed,
    Simulated,
    SkippedDuplicate,
    SkippedCooldown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub subscriber_id: String,
    pub ticker: String,
    pub kind: AlertKind,
    pub event_key: String,
    pub status: OutcomeStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub ok: bool,
    pub test_mode: bool,
    pub hours_ago: i64,

    pub documents_fetched: usize,
    pub documents_found: usize,
    pub unresolved_documents: usize,

    pub assets_checked: usize,
    pub quotes_received: usize,

    pub subscribers_processed: usize,
    pub subscriber_errors: usize,

    pub alerts_evaluated: usize,
    pub sent: usize,
    pub failed: usize,
    pub simulated: usize,
    pub skipped_duplicate: usize,
    pub skipped_cooldown: usize,

    pub duration_ms: u64,

    pub outcomes: Vec<Outcome>,
    pub outcomes_truncated: bool,
}

impl RunReport {
    pub fn new(test_mode: bool, hours_ago: i64) -> Self {
        Self {
            ok: true,
            test_mode,
            hours_ago,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome.status {
            OutcomeStatus::Sent => self.sent += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Simulated => self.simulated += 1,
            OutcomeStatus::SkippedDuplicate => self.skipped_duplicate += 1,
            OutcomeStatus::SkippedCooldown => self.skipped_cooldown += 1,
        }

        if self.outcomes.len() < MAX_OUTCOME_SAMPLES {
            self.outcomes.push(outcome);
        } else {
            self.outcomes_truncated = true;
        }
    }
}
