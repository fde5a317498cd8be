// src/report.rs
//
// =============================================================================
// RESUMEPILOT: EXECUTION REPORT
// =============================================================================
//
// What the Controller hands back to the caller at the end of a run
// (§6): per-stage counts, duration, first error seen, and a submission
// breakdown. Grounded on the orchestrator's `PartialJob`/`PartialConfig`
// summary-query shape in `checkpoint.rs` — a lightweight, serializable
// view distinct from the live working structs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub first_error: Option<String>,
}

impl StageReport {
    pub fn record_duration(&mut self, d: Duration) {
        self.duration_ms = d.as_millis() as u64;
    }

    pub fn record_error(&mut self, err: &str) {
        self.failed += 1;
        if self.first_error.is_none() {
            self.first_error = Some(err.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionBreakdown {
    pub succeeded: usize,
    pub already_applied: usize,
    pub suspended_or_expired: usize,
    pub button_not_found: usize,
    pub failed: usize,
    pub login_required: bool,
    pub quota_exhausted: bool,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub extract: StageReport,
    pub process: StageReport,
    pub matching: StageReport,
    pub decide: StageReport,
    pub submit: StageReport,
    pub submission_breakdown: SubmissionBreakdown,
    /// Matches rejected by the salary gate before ranking (§4.6, §8
    /// scenario 1). Tracked separately from `decide.failed`, which is
    /// reserved for genuine scoring errors.
    pub gate_rejected: usize,
    /// Listings seen during extraction that turned out to be duplicates
    /// of an already-known fingerprint (§4.3 step 2).
    pub skipped_by_dedup: usize,
    pub total_duration_ms: u64,
}

impl ExecutionReport {
    pub fn had_any_failure(&self) -> bool {
        [&self.extract, &self.process, &self.matching, &self.decide, &self.submit]
            .iter()
            .any(|s| s.first_error.is_some())
    }
}
