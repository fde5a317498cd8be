// src/submitter.rs
//
// =============================================================================
// RESUMEPILOT: SUBMIT STAGE
// =============================================================================
//
// One-shot status detection, then a status-specific policy dispatch,
// then (on a genuine "submit" outcome) a multi-strategy click retry
// (§4.7). At-most-once is enforced by `JobStore::mark_match_processed`
// returning `false` on a race; the submitter treats that as "someone
// else already handled this" and stops rather than clicking twice.
// Pacing, batch rest, and the keep-alive probe are grounded on the
// orchestrator's `utils::wait_with_output_logging` throttling and
// `guardian.rs`'s lifecycle delays, adapted to real-wall-clock sleeps.

use crate::capabilities::{BrowserDriver, ClickStrategy, Element};
use crate::config::SubmitterConfig;
use crate::core::{ResumeMatch, SubmissionLog, SubmissionStatus};
use crate::store::JobStore;
use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub struct Submitter<'a> {
    driver: &'a mut dyn BrowserDriver,
    config: SubmitterConfig,
}

#[derive(Debug, Default)]
pub struct SubmissionBatchStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub already_applied: usize,
    pub suspended_or_expired: usize,
    pub button_not_found: usize,
    pub failed: usize,
    pub login_required: bool,
    pub quota_exhausted: bool,
}

impl<'a> Submitter<'a> {
    pub fn new(driver: &'a mut dyn BrowserDriver, config: SubmitterConfig) -> Self {
        Self { driver, config }
    }

    /// Submits from `matches` until the batch is exhausted, the daily
    /// quota runs out, or a `LoginRequired` status aborts the batch
    /// (§4.7, §4.6 daily quota invariant). Each outcome gets its own
    /// store-write policy (§4.7 step 4): `LoginRequired` leaves the
    /// in-flight match completely untouched so a future run can retry it
    /// after re-authenticating, while every other outcome marks the match
    /// processed and logs it before the batch continues.
    pub async fn run_batch(
        &mut self,
        store: &mut JobStore,
        jobs_by_match: &[(ResumeMatch, String, String)],
        quota_remaining: u32,
    ) -> Result<SubmissionBatchStats> {
        let mut stats = SubmissionBatchStats::default();
        let mut remaining = quota_remaining;

        for (idx, (m, apply_url, site)) in jobs_by_match.iter().enumerate() {
            if remaining == 0 {
                stats.quota_exhausted = true;
                break;
            }

            stats.attempted += 1;
            let log = self.submit_one(m.clone(), apply_url, site).await?;
            let status = log.status;

            match status {
                SubmissionStatus::JobSuspended => {
                    // Log while the match row still exists, then cascade
                    // its removal — order matters, not referential
                    // integrity (the column is a logical reference only).
                    store.append_submission_log(&log)?;
                    store.soft_delete_job(m.job_id)?;
                    stats.suspended_or_expired += 1;
                }
                SubmissionStatus::JobExpired => {
                    if store.mark_match_processed(m.id)? {
                        store.append_submission_log(&log)?;
                    }
                    stats.suspended_or_expired += 1;
                }
                SubmissionStatus::ButtonNotFound => {
                    if store.mark_match_processed(m.id)? {
                        store.append_submission_log(&log)?;
                    }
                    stats.button_not_found += 1;
                }
                SubmissionStatus::PageError => {
                    if store.mark_match_processed(m.id)? {
                        store.append_submission_log(&log)?;
                    }
                    stats.failed += 1;
                }
                SubmissionStatus::AlreadyApplied => {
                    if store.mark_match_processed(m.id)? {
                        store.append_submission_log(&log)?;
                    }
                    stats.already_applied += 1;
                }
                SubmissionStatus::LoginRequired => {
                    stats.login_required = true;
                    break;
                }
                SubmissionStatus::Success | SubmissionStatus::DryRun => {
                    if store.mark_match_processed(m.id)? {
                        store.append_submission_log(&log)?;
                    }
                    if status == SubmissionStatus::Success {
                        stats.succeeded += 1;
                        remaining -= 1;
                    }
                }
            }

            if (idx + 1) % self.config.batch_rest_every == 0 {
                self.batch_rest().await;
            } else {
                self.pace().await;
            }
        }

        Ok(stats)
    }

    /// One-shot detection then policy dispatch (§4.7 step 2/3): navigate,
    /// snapshot the page once, locate the apply button from that same
    /// snapshot, classify, and only then (on a genuine submit outcome)
    /// click.
    async fn submit_one(&mut self, m: ResumeMatch, apply_url: &str, site: &str) -> Result<SubmissionLog> {
        let start = Instant::now();
        self.driver.navigate(apply_url).await?;
        let page_text = self.driver.page_source().await.unwrap_or_default();
        let title = self.driver.title().await.unwrap_or_default();
        let button = self.find_apply_button(site).await?;

        let status = self.detect_status(&page_text, button.as_ref());
        let detection_ms = start.elapsed().as_millis() as u64;

        let mut log = SubmissionLog {
            id: Uuid::new_v4(),
            match_id: m.id,
            job_id: m.job_id,
            status,
            reason: String::new(),
            page_title: title,
            button_text: button.as_ref().map(|b| b.text.clone()).unwrap_or_default(),
            button_class: button.as_ref().map(|b| b.class.clone()).unwrap_or_default(),
            detection_ms,
            created_at: Utc::now(),
        };

        if status != SubmissionStatus::Success {
            return Ok(log);
        }

        if self.config.dry_run {
            log.status = SubmissionStatus::DryRun;
            return Ok(log);
        }

        match self.click_apply_button().await {
            Ok(true) => Ok(log),
            Ok(false) => {
                log.status = SubmissionStatus::ButtonNotFound;
                Ok(log)
            }
            Err(e) => {
                log.status = SubmissionStatus::PageError;
                log.reason = e.to_string();
                Ok(log)
            }
        }
    }

    fn selectors_for<'b>(&self, site: &str, table: &'b HashMap<String, Vec<String>>) -> Vec<String> {
        table.get(site).or_else(|| table.get("default")).cloned().unwrap_or_default()
    }

    /// Locates the apply button from the same snapshot `detect_status`
    /// classifies against, trying site-specific selectors before the
    /// `default` fallback (mirrors `Extractor::selectors_for`).
    async fn find_apply_button(&mut self, site: &str) -> Result<Option<Element>> {
        let selectors = self.selectors_for(site, &self.config.apply_button_selectors.clone());
        for sel in &selectors {
            let found = self.driver.find_all(sel).await?;
            if let Some(el) = found.into_iter().next() {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    /// Priority order (§4.7 step 3): a suspended/expired notice or a
    /// login wall outranks whatever the DOM snapshot says about the
    /// button itself; only once those are ruled out does the button's own
    /// text/class/clickability decide between already-applied, pending
    /// (proceed to click), and not-found.
    fn detect_status(&self, page_text: &str, button: Option<&Element>) -> SubmissionStatus {
        if self.config.suspension_phrases.iter().any(|p| page_text.contains(p.as_str())) {
            return SubmissionStatus::JobSuspended;
        }
        if self.config.expiration_phrases.iter().any(|p| page_text.contains(p.as_str())) {
            return SubmissionStatus::JobExpired;
        }
        if self.config.login_required_phrases.iter().any(|p| page_text.contains(p.as_str())) {
            return SubmissionStatus::LoginRequired;
        }

        let Some(button) = button else {
            return SubmissionStatus::ButtonNotFound;
        };

        let already_applied = self.config.applied_indicator_texts.iter().any(|p| button.text.contains(p.as_str()))
            || self.config.disabled_indicator_classes.iter().any(|c| button.class.contains(c.as_str()));
        if already_applied {
            return SubmissionStatus::AlreadyApplied;
        }

        let has_apply_verb = self
            .config
            .apply_verbs
            .iter()
            .any(|v| button.text.to_lowercase().contains(&v.to_lowercase()));
        if button.clickable && has_apply_verb {
            SubmissionStatus::Success
        } else {
            SubmissionStatus::ButtonNotFound
        }
    }

    async fn click_apply_button(&mut self) -> Result<bool> {
        for strategy in ClickStrategy::ORDER.into_iter().take(self.config.max_click_retries.max(1)) {
            if self.driver.click("apply-button", strategy).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn pace(&self) {
        let ms = rand_range(self.config.submission_delay_ms_min, self.config.submission_delay_ms_max);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn batch_rest(&self) {
        let ms = rand_range(self.config.batch_rest_ms_min, self.config.batch_rest_ms_max);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

fn rand_range(min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fakes::FakeBrowserDriver;
    use crate::core::DimensionScores;

    fn config() -> SubmitterConfig {
        SubmitterConfig {
            apply_button_selectors: HashMap::from([("default".to_string(), vec![".apply-btn".to_string()])]),
            submission_delay_ms_min: 0,
            submission_delay_ms_max: 1,
            batch_rest_ms_min: 0,
            batch_rest_ms_max: 1,
            batch_rest_every: 1000,
            max_click_retries: 1,
            ..Default::default()
        }
    }

    fn sample_match() -> ResumeMatch {
        ResumeMatch {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            overall_score: 0.8,
            dimensions: DimensionScores::default(),
            matched_skills: vec![],
            decision: crate::core::MatchDecision::Submit,
            priority: crate::core::Priority::High,
            should_submit: true,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn successful_submission_is_recorded_once() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = crate::core::Job::new("J1", "fp", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://x", "site", "desc");
        store.insert_job_if_new(&job).unwrap();

        let mut m = sample_match();
        m.job_id = job.id;
        store.insert_match(&m).unwrap();

        let mut driver = FakeBrowserDriver::new();
        driver.pages.insert("https://apply/1".to_string(), String::new());
        driver.elements.insert(
            ".apply-btn".to_string(),
            vec![Element { text: "Apply".into(), class: "btn-primary".into(), clickable: true }],
        );

        let mut submitter = Submitter::new(&mut driver, config());
        let stats = submitter
            .run_batch(&mut store, &[(m, "https://apply/1".to_string(), "site".to_string())], 50)
            .await
            .unwrap();

        assert_eq!(stats.succeeded, 1);
        assert_eq!(store.count_submissions_today().unwrap(), 1);
    }

    #[tokio::test]
    async fn already_applied_is_detected_before_click() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = crate::core::Job::new("J1", "fp", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://x", "site", "desc");
        store.insert_job_if_new(&job).unwrap();

        let mut m = sample_match();
        m.job_id = job.id;
        store.insert_match(&m).unwrap();

        let mut driver = FakeBrowserDriver::new();
        driver.pages.insert("https://apply/1".to_string(), String::new());
        driver.elements.insert(
            ".apply-btn".to_string(),
            vec![Element { text: "已申请".into(), class: "btn-disabled".into(), clickable: false }],
        );

        let mut submitter = Submitter::new(&mut driver, config());
        let stats = submitter
            .run_batch(&mut store, &[(m, "https://apply/1".to_string(), "site".to_string())], 50)
            .await
            .unwrap();

        assert_eq!(stats.already_applied, 1);
        assert_eq!(stats.succeeded, 0);
    }

    #[tokio::test]
    async fn button_not_found_when_no_selector_matches() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = crate::core::Job::new("J1", "fp", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://x", "site", "desc");
        store.insert_job_if_new(&job).unwrap();

        let mut m = sample_match();
        m.job_id = job.id;
        store.insert_match(&m).unwrap();

        let mut driver = FakeBrowserDriver::new();
        driver.pages.insert("https://apply/1".to_string(), String::new());

        let mut submitter = Submitter::new(&mut driver, config());
        let stats = submitter
            .run_batch(&mut store, &[(m, "https://apply/1".to_string(), "site".to_string())], 50)
            .await
            .unwrap();

        assert_eq!(stats.button_not_found, 1);
        assert_eq!(stats.succeeded, 0);
    }

    #[tokio::test]
    async fn job_suspended_soft_deletes_the_job() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = crate::core::Job::new("J1", "fp-suspend", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://x", "site", "desc");
        store.insert_job_if_new(&job).unwrap();

        let mut m = sample_match();
        m.job_id = job.id;
        store.insert_match(&m).unwrap();

        let mut driver = FakeBrowserDriver::new();
        driver.pages.insert(
            "https://apply/1".to_string(),
            "很抱歉，你选择的职位目前已经暂停招聘".to_string(),
        );

        let mut submitter = Submitter::new(&mut driver, config());
        let stats = submitter
            .run_batch(&mut store, &[(m, "https://apply/1".to_string(), "site".to_string())], 50)
            .await
            .unwrap();

        assert_eq!(stats.suspended_or_expired, 1);

        // The job's fingerprint being reusable is the only externally
        // observable proof soft-delete ran — confirms the cascade
        // actually fired rather than just logging the outcome.
        let revived = crate::core::Job::new("J2", "fp-suspend", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://y", "site", "desc");
        assert!(store.insert_job_if_new(&revived).unwrap());
    }

    #[tokio::test]
    async fn login_required_leaves_the_match_untouched() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = crate::core::Job::new("J1", "fp", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://x", "site", "desc");
        store.insert_job_if_new(&job).unwrap();

        let mut m = sample_match();
        m.job_id = job.id;
        store.insert_match(&m).unwrap();
        let match_id = m.id;

        let mut driver = FakeBrowserDriver::new();
        driver.pages.insert("https://apply/1".to_string(), "请先登录".to_string());

        let mut submitter = Submitter::new(&mut driver, config());
        let stats = submitter
            .run_batch(&mut store, &[(m, "https://apply/1".to_string(), "site".to_string())], 50)
            .await
            .unwrap();

        assert!(stats.login_required);
        // Untouched means a later attempt can still mark it processed —
        // it was never consumed by this run.
        assert!(store.mark_match_processed(match_id).unwrap());
    }

    #[tokio::test]
    async fn quota_exhausted_stops_batch() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = crate::core::Job::new("J1", "fp", "Backend Engineer", "Acme", "Beijing", "15-25K", "https://x", "site", "desc");
        store.insert_job_if_new(&job).unwrap();
        let mut m = sample_match();
        m.job_id = job.id;
        store.insert_match(&m).unwrap();

        let mut driver = FakeBrowserDriver::new();
        let mut submitter = Submitter::new(&mut driver, config());
        let stats = submitter
            .run_batch(&mut store, &[(m, "https://apply/1".to_string(), "site".to_string())], 0)
            .await
            .unwrap();

        assert!(stats.quota_exhausted);
        assert_eq!(stats.attempted, 0);
    }
}
