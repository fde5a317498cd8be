// src/controller.rs
//
// =============================================================================
// RESUMEPILOT: PIPELINE CONTROLLER
// =============================================================================
//
// Sequential stage orchestration (Extract -> Process -> Match -> Decide
// -> Submit, §4), with cooperative cancellation and stage-boundary
// checkpointing. Grounded on the orchestrator's `guardian.rs`
// `execute_lifecycle` (setup -> execute -> finalize -> teardown staged
// lifecycle) and `main.rs`'s `run_node_service` top-level driver —
// generalized from one node's job lifecycle to the whole pipeline's.

use crate::capabilities::{BrowserDriver, EmbeddingStore, StructuredExtractor};
use crate::config::PipelineConfig;
use crate::core::{MatchDecision, ResumeProfile};
use crate::decision::Decider;
use crate::eventlog::{EventLogConfig, EventLogWriter};
use crate::extractor::Extractor;
use crate::matcher::Matcher;
use crate::processor::{Processor, ProcessorConfig};
use crate::report::ExecutionReport;
use crate::scheduler::WorkerPool;
use crate::skills::SkillExpander;
use crate::store::JobStore;
use crate::submitter::Submitter;
use crate::vector_store::VectorStoreAdapter;
use anyhow::Result;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation shared across stages. A running stage checks
/// this between records/batches and stops cleanly rather than aborting
/// mid-write.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SearchTarget {
    pub site: String,
    pub search_url: String,
}

pub struct PipelineController {
    store: JobStore,
    vector_store: Arc<VectorStoreAdapter>,
    structured_extractor: Arc<dyn StructuredExtractor>,
    browser: Box<dyn BrowserDriver>,
    config: PipelineConfig,
    skills: Arc<SkillExpander>,
    eventlog: EventLogWriter,
    cancel: CancellationToken,
}

impl PipelineController {
    pub fn new(
        mut store: JobStore,
        embedding_store: Arc<dyn EmbeddingStore>,
        structured_extractor: Arc<dyn StructuredExtractor>,
        browser: Box<dyn BrowserDriver>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let repaired = store.repair_integrity()?;
        if repaired > 0 {
            log::warn!("startup integrity repair: {repaired} match(es) recovered");
        }
        let eventlog = EventLogWriter::open(&config.eventlog_path, EventLogConfig::default())?;
        Ok(Self {
            store,
            vector_store: Arc::new(VectorStoreAdapter::new(embedding_store)),
            structured_extractor,
            browser,
            config,
            skills: Arc::new(SkillExpander::new()),
            eventlog,
            cancel: CancellationToken::new(),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn checkpoint(&mut self, stage: &str, detail: serde_json::Value) {
        if let Err(e) = self.eventlog.append(stage, detail) {
            log::warn!("failed to append checkpoint for stage {stage}: {e:#}");
        }
    }

    /// Runs the full pipeline once: Extract over every search target,
    /// then Process/Match/Decide/Submit over whatever backlog exists.
    /// Any stage can be skipped by passing an empty/zero input — e.g. a
    /// resume run with no new search targets just drains the existing
    /// backlog.
    pub async fn run(&mut self, targets: &[SearchTarget], profile: &ResumeProfile) -> Result<ExecutionReport> {
        let overall_start = Instant::now();
        let mut report = ExecutionReport::default();

        self.run_extract_stage(targets, &mut report).await?;
        if self.cancel.is_cancelled() {
            report.total_duration_ms = overall_start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        self.run_process_stage(&mut report).await?;
        if self.cancel.is_cancelled() {
            report.total_duration_ms = overall_start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        self.run_match_stage(profile, &mut report).await?;
        if self.cancel.is_cancelled() {
            report.total_duration_ms = overall_start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        self.run_submit_stage(&mut report).await?;

        report.total_duration_ms = overall_start.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn run_extract_stage(&mut self, targets: &[SearchTarget], report: &mut ExecutionReport) -> Result<()> {
        let start = Instant::now();
        for target in targets {
            if self.cancel.is_cancelled() {
                break;
            }
            let cfg = self.config.extractor.clone();
            let mut extractor = Extractor::new(self.browser.as_mut(), &self.store, cfg);
            match extractor.run_search(&target.site, &target.search_url).await {
                Ok(stats) => {
                    report.extract.attempted += stats.listings_seen;
                    report.extract.succeeded += stats.new_jobs;
                    report.skipped_by_dedup += stats.duplicates_skipped;
                }
                Err(e) => report.extract.record_error(&e.to_string()),
            }
        }
        report.extract.record_duration(start.elapsed());
        self.checkpoint("extract_complete", json!({ "attempted": report.extract.attempted }));
        Ok(())
    }

    async fn run_process_stage(&mut self, report: &mut ExecutionReport) -> Result<()> {
        let start = Instant::now();
        let processor = Processor::new(
            self.structured_extractor.clone(),
            ProcessorConfig {
                batch_size: self.config.processor.batch_size,
                worker_pool_size: self.config.processor.worker_pool_size,
            },
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let stats = processor.run_batch(&self.store, &self.vector_store).await?;
            if stats.attempted == 0 {
                break;
            }
            report.process.attempted += stats.attempted;
            report.process.succeeded += stats.llm_succeeded + stats.heuristic_fallback;
            report.process.failed += stats.failed;
        }
        report.process.record_duration(start.elapsed());
        self.checkpoint("process_complete", json!({ "attempted": report.process.attempted }));
        Ok(())
    }

    /// Scores every unmatched job concurrently through a bounded
    /// `WorkerPool` (§4.5, §4.8: matcher pool default 5-10 workers),
    /// applies the gate/priority decision per result, and persists the
    /// match. `report.decide` is populated here rather than as a
    /// separate pass — the decision itself happens inline with scoring.
    async fn run_match_stage(&mut self, profile: &ResumeProfile, report: &mut ExecutionReport) -> Result<()> {
        let start = Instant::now();
        let decider = Decider::new(self.config.decision.clone());

        let jobs = self.store.list_unmatched_jobs(self.config.processor.batch_size)?;
        report.matching.attempted = jobs.len();
        report.decide.attempted = jobs.len();

        let pool = WorkerPool::new(self.config.matcher.worker_pool_size);
        let vector_store = self.vector_store.clone();
        let skills = self.skills.clone();
        let weights = self.config.matcher.weights.clone();
        let profile = profile.clone();

        let results = pool
            .run_all(jobs, move |job| {
                let vector_store = vector_store.clone();
                let skills = skills.clone();
                let weights = weights.clone();
                let profile = profile.clone();
                async move {
                    let matcher = Matcher::new(&vector_store, &skills, weights);
                    let (dims, matched_skills) = matcher.score(&job, &profile).await?;
                    let overall = matcher.overall(&dims);
                    Ok((job, dims, matched_skills, overall))
                }
            })
            .await;

        for result in results {
            match result {
                Ok((job, dims, matched_skills, overall)) => {
                    let (decision, priority, should_submit) = decider.decide(&job, &dims, overall);
                    if decision == MatchDecision::RejectedByGate {
                        report.gate_rejected += 1;
                    } else {
                        report.decide.succeeded += 1;
                    }
                    let m = crate::core::ResumeMatch {
                        id: uuid::Uuid::new_v4(),
                        job_id: job.id,
                        overall_score: overall,
                        dimensions: dims,
                        matched_skills,
                        decision,
                        priority,
                        should_submit,
                        processed: false,
                        processed_at: None,
                        created_at: chrono::Utc::now(),
                    };
                    self.store.insert_match(&m)?;
                    report.matching.succeeded += 1;
                }
                Err(e) => report.matching.record_error(&e.to_string()),
            }
        }
        report.matching.record_duration(start.elapsed());
        report.decide.record_duration(start.elapsed());
        self.checkpoint("match_complete", json!({ "attempted": report.matching.attempted }));
        Ok(())
    }

    /// Pulls an adaptively-sized *raw* pool (§4.6) sized to survive the
    /// gate's historical rejection rate, applies `should_submit` in Rust
    /// (the store query only pushes the salary floor down), then submits
    /// up to `quota_remaining` of the survivors.
    async fn run_submit_stage(&mut self, report: &mut ExecutionReport) -> Result<()> {
        let start = Instant::now();
        let decider = Decider::new(self.config.decision.clone());
        let submitted_today = self.store.count_submissions_today()?;
        let quota_remaining = decider.remaining_quota(submitted_today);

        if quota_remaining == 0 {
            report.submission_breakdown.quota_exhausted = true;
            report.submit.record_duration(start.elapsed());
            return Ok(());
        }

        let raw_pool_size = decider.adaptive_batch_size(quota_remaining);
        let raw_matches = self
            .store
            .list_unprocessed_matches(raw_pool_size, Some(self.config.decision.salary_gate.default_min))?;

        let target = quota_remaining as usize;
        let mut matches = Vec::with_capacity(target.min(raw_matches.len()));
        for m in raw_matches {
            if !m.should_submit {
                report.gate_rejected += 1;
                continue;
            }
            if matches.len() < target {
                matches.push(m);
            }
        }

        let mut jobs_by_match = Vec::with_capacity(matches.len());
        for m in matches {
            if let Some(job) = self.store.get_job(m.job_id)? {
                let site = job.site.clone();
                jobs_by_match.push((m, job.url, site));
            }
        }

        let mut submitter = Submitter::new(self.browser.as_mut(), self.config.submitter.clone());
        let stats = submitter.run_batch(&mut self.store, &jobs_by_match, quota_remaining).await?;

        report.submit.attempted = stats.attempted;
        report.submit.succeeded = stats.succeeded;
        let success_rate = if stats.attempted == 0 {
            0.0
        } else {
            stats.succeeded as f64 / stats.attempted as f64
        };
        report.submission_breakdown = crate::report::SubmissionBreakdown {
            succeeded: stats.succeeded,
            already_applied: stats.already_applied,
            suspended_or_expired: stats.suspended_or_expired,
            button_not_found: stats.button_not_found,
            failed: stats.failed,
            login_required: stats.login_required,
            quota_exhausted: stats.quota_exhausted,
            success_rate,
        };
        report.submit.record_duration(start.elapsed());
        self.checkpoint(
            "submit_complete",
            json!({ "succeeded": stats.succeeded, "login_required": stats.login_required }),
        );
        Ok(())
    }

    /// Lightweight liveness probe for the `health-check` CLI subcommand:
    /// confirms the store and eventlog paths are reachable without
    /// running any stage.
    pub fn health_check(&self) -> Result<serde_json::Value> {
        let submitted_today = self.store.count_submissions_today()?;
        Ok(json!({
            "db_reachable": true,
            "eventlog_path": self.config.eventlog_path,
            "submitted_today": submitted_today,
        }))
    }
}

