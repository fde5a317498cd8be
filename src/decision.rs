// src/decision.rs
//
// =============================================================================
// RESUMEPILOT: DECIDE STAGE
// =============================================================================
//
// Gate-then-rank (§4.6): a tiered salary gate first (reject outright
// below threshold, regardless of overall score), then priority
// assignment and daily-quota enforcement for everything that passes.
// Adaptive batch sizing compensates for the gate's rejection rate so a
// fixed-size pull from `list_unprocessed_matches` still yields enough
// submit-eligible candidates. Grounded on the orchestrator's
// `workflow.rs` topological priority recalculation: a pure pass over a
// batch already held in memory.

use crate::config::DecisionConfig;
use crate::core::{DimensionScores, Job, MatchDecision, Priority};

pub struct Decider {
    config: DecisionConfig,
    /// Running average of the gate's rejection rate, used to size the
    /// next adaptive batch pull. Seeded at 0.9 per the spec's "assume
    /// high rejection until proven otherwise" posture (§9 Open Question).
    rejection_rate_avg: f64,
}

impl Decider {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config, rejection_rate_avg: 0.9 }
    }

    /// Salary gate: rejects outright if the job's salary score is below
    /// the tier threshold implied by its title. Gate is monotonic — a
    /// job that fails it can never later pass via a higher overall
    /// score (§3 invariant "gate monotonicity").
    pub fn apply_salary_gate(&self, job: &Job, dims: &DimensionScores) -> bool {
        let tier = self.tier_for(job);
        dims.salary >= tier
    }

    fn tier_for(&self, job: &Job) -> f64 {
        let title = job.title.to_lowercase();
        if title.contains("senior") || title.contains("高级") || title.contains("资深") {
            self.config.salary_gate.senior_min
        } else if title.contains("junior") || title.contains("初级") || title.contains("应届") {
            self.config.salary_gate.entry_min
        } else {
            self.config.salary_gate.default_min
        }
    }

    pub fn decide(&self, job: &Job, dims: &DimensionScores, overall_score: f64) -> (MatchDecision, Priority, bool) {
        if !self.apply_salary_gate(job, dims) {
            return (MatchDecision::RejectedByGate, Priority::Low, false);
        }

        let priority = self.priority_for(overall_score);
        let decision = if overall_score >= self.config.priority_medium_threshold {
            MatchDecision::Submit
        } else {
            MatchDecision::Skip
        };
        let should_submit = decision == MatchDecision::Submit;
        (decision, priority, should_submit)
    }

    fn priority_for(&self, overall_score: f64) -> Priority {
        if overall_score >= self.config.priority_urgent_threshold {
            Priority::Urgent
        } else if overall_score >= self.config.priority_high_threshold {
            Priority::High
        } else if overall_score >= self.config.priority_medium_threshold {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    /// How many matches remain submittable today given the quota and
    /// what's already gone out (§4.6, §3 invariant "daily quota").
    pub fn remaining_quota(&self, submitted_today: u32) -> u32 {
        self.config.max_submissions_per_day.saturating_sub(submitted_today)
    }

    /// Adaptive batch size (§9 Open Question): scales the requested pull
    /// by the observed gate rejection rate so enough candidates survive
    /// to fill `target_count` submit slots.
    ///
    /// `multiplier = max(2, ceil(1 / (1 - rejection_rate)) + 1)`
    pub fn adaptive_batch_size(&self, target_count: u32) -> usize {
        let rate = self.rejection_rate_avg.clamp(0.0, 0.99);
        let multiplier = (2.0_f64).max((1.0 / (1.0 - rate)).ceil() + 1.0);
        ((target_count as f64) * multiplier).ceil() as usize
    }

    /// Updates the running rejection-rate average from one batch's
    /// outcome. Simple exponential smoothing, alpha = 0.3.
    pub fn record_batch_outcome(&mut self, rejected: usize, total: usize) {
        if total == 0 {
            return;
        }
        let observed = rejected as f64 / total as f64;
        self.rejection_rate_avg = 0.7 * self.rejection_rate_avg + 0.3 * observed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str) -> Job {
        Job::new("J1", "fp", title, "Acme", "Beijing", "15-25K", "https://x", "site", "desc")
    }

    #[test]
    fn salary_gate_uses_senior_tier_for_senior_titles() {
        let decider = Decider::new(DecisionConfig::default());
        let j = job("Senior Backend Engineer");
        let dims = DimensionScores { salary: 0.40, ..Default::default() };
        assert!(!decider.apply_salary_gate(&j, &dims));

        let dims_ok = DimensionScores { salary: 0.55, ..Default::default() };
        assert!(decider.apply_salary_gate(&j, &dims_ok));
    }

    #[test]
    fn gate_rejection_overrides_high_overall_score() {
        let decider = Decider::new(DecisionConfig::default());
        let j = job("Backend Engineer");
        let dims = DimensionScores { salary: 0.10, ..Default::default() };
        let (decision, _, should_submit) = decider.decide(&j, &dims, 0.95);
        assert_eq!(decision, MatchDecision::RejectedByGate);
        assert!(!should_submit);
    }

    #[test]
    fn priority_thresholds_match_config() {
        let decider = Decider::new(DecisionConfig::default());
        assert_eq!(decider.priority_for(0.90), Priority::Urgent);
        assert_eq!(decider.priority_for(0.75), Priority::High);
        assert_eq!(decider.priority_for(0.60), Priority::Medium);
        assert_eq!(decider.priority_for(0.30), Priority::Low);
    }

    #[test]
    fn adaptive_batch_size_grows_with_rejection_rate() {
        let mut decider = Decider::new(DecisionConfig::default());
        let low = decider.adaptive_batch_size(10);
        decider.record_batch_outcome(95, 100);
        let high = decider.adaptive_batch_size(10);
        assert!(high >= low);
    }

    #[test]
    fn remaining_quota_saturates_at_zero() {
        let decider = Decider::new(DecisionConfig::default());
        assert_eq!(decider.remaining_quota(1000), 0);
    }
}
