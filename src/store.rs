// src/store.rs
//
// =============================================================================
// RESUMEPILOT: RELATIONAL JOB STORE
// =============================================================================
//
// Grounded on the orchestrator's `checkpoint.rs` `CheckpointStore`: a
// thin rusqlite wrapper, WAL + foreign_keys PRAGMAs set once at open,
// all multi-row writes wrapped in an explicit transaction, and
// defensive row-to-struct mapping at every read. The tables here
// (jobs, resume_matches, submission_logs) take the place of the
// orchestrator's single `jobs` checkpoint table, with the same
// "insert if new / accept no op" shape (§4.1).

use crate::core::{
    DimensionScores, Job, MatchDecision, Priority, ResumeMatch, SubmissionLog, SubmissionStatus,
};
use crate::error::PipelineError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, PipelineError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), PipelineError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id                  TEXT PRIMARY KEY,
                job_id              TEXT NOT NULL,
                fingerprint         TEXT NOT NULL,
                title               TEXT NOT NULL,
                company             TEXT NOT NULL,
                location            TEXT NOT NULL,
                salary_raw          TEXT NOT NULL,
                url                 TEXT NOT NULL,
                site                TEXT NOT NULL,
                description         TEXT NOT NULL,
                responsibilities    TEXT NOT NULL DEFAULT '[]',
                requirements        TEXT NOT NULL DEFAULT '[]',
                skills              TEXT NOT NULL DEFAULT '[]',
                education           TEXT NOT NULL DEFAULT '',
                experience          TEXT NOT NULL DEFAULT '',
                structured_fallback INTEGER NOT NULL DEFAULT 0,
                rag_processed       INTEGER NOT NULL DEFAULT 0,
                is_deleted          INTEGER NOT NULL DEFAULT 0,
                deleted_at          TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            -- Fingerprint uniqueness is scoped to live rows only (§9 Open
            -- Question): a soft-deleted job's fingerprint can reappear as a
            -- fresh extraction.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_fingerprint_live
                ON jobs(fingerprint) WHERE is_deleted = 0;

            CREATE INDEX IF NOT EXISTS idx_jobs_unprocessed
                ON jobs(rag_processed) WHERE is_deleted = 0 AND rag_processed = 0;

            CREATE TABLE IF NOT EXISTS resume_matches (
                id              TEXT PRIMARY KEY,
                job_id          TEXT NOT NULL REFERENCES jobs(id),
                overall_score   REAL NOT NULL,
                dim_semantic    REAL NOT NULL,
                dim_skill       REAL NOT NULL,
                dim_experience  REAL NOT NULL,
                dim_salary      REAL NOT NULL,
                dim_industry    REAL NOT NULL,
                matched_skills  TEXT NOT NULL DEFAULT '[]',
                decision        TEXT NOT NULL,
                priority        TEXT NOT NULL,
                should_submit   INTEGER NOT NULL,
                processed       INTEGER NOT NULL DEFAULT 0,
                processed_at    TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_matches_unprocessed
                ON resume_matches(processed) WHERE processed = 0;

            CREATE TABLE IF NOT EXISTS submission_logs (
                id              TEXT PRIMARY KEY,
                -- Not a hard FK: a JOB_SUSPENDED outcome cascade-deletes
                -- its resume_matches row in the same step that writes this
                -- log (§4.7 step 4), so match_id can legitimately outlive
                -- its parent row.
                match_id        TEXT NOT NULL,
                job_id          TEXT NOT NULL REFERENCES jobs(id),
                status          TEXT NOT NULL,
                reason          TEXT NOT NULL DEFAULT '',
                page_title      TEXT NOT NULL DEFAULT '',
                button_text     TEXT NOT NULL DEFAULT '',
                button_class    TEXT NOT NULL DEFAULT '',
                detection_ms    INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_submission_logs_created
                ON submission_logs(created_at);
            "#,
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    /// Cheap existence probe used by the Extract stage to skip a
    /// detail-page click-through for a listing already seen (§4.3 step 2).
    pub fn fingerprint_exists(&self, fingerprint: &str) -> Result<bool, PipelineError> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM jobs WHERE fingerprint = ?1 AND is_deleted = 0",
                params![fingerprint],
                |r| r.get(0),
            )
            .optional()?;
        Ok(existing.is_some())
    }

    /// Inserts a job if its fingerprint is not already present among live
    /// rows (§4.1, §4.3). Returns `true` if a new row was inserted.
    pub fn insert_job_if_new(&self, job: &Job) -> Result<bool, PipelineError> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM jobs WHERE fingerprint = ?1 AND is_deleted = 0",
                params![job.fingerprint],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }

        let res = self.conn.execute(
            r#"INSERT INTO jobs (
                id, job_id, fingerprint, title, company, location, salary_raw, url, site,
                description, responsibilities, requirements, skills, education, experience,
                structured_fallback, rag_processed, is_deleted, deleted_at, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,0,NULL,?18,?19)"#,
            params![
                job.id.to_string(),
                job.job_id,
                job.fingerprint,
                job.title,
                job.company,
                job.location,
                job.salary_raw,
                job.url,
                job.site,
                job.description,
                serde_json::to_string(&job.responsibilities).unwrap_or_default(),
                serde_json::to_string(&job.requirements).unwrap_or_default(),
                serde_json::to_string(&job.skills).unwrap_or_default(),
                job.education,
                job.experience,
                job.structured_fallback as i64,
                job.rag_processed as i64,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        );

        match res {
            Ok(_) => Ok(true),
            // A concurrent insert of the same fingerprint lost the race;
            // treat it as "already present", not an error.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, PipelineError> {
        self.conn
            .query_row("SELECT * FROM jobs WHERE id = ?1", params![job_id.to_string()], row_to_job)
            .optional()
            .map_err(Into::into)
    }

    /// All live (non-deleted) jobs that have completed the Process stage
    /// but have no corresponding `resume_matches` row yet — the Match
    /// stage's input set.
    pub fn list_unmatched_jobs(&self, limit: usize) -> Result<Vec<Job>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT j.* FROM jobs j LEFT JOIN resume_matches m ON m.job_id = j.id \
             WHERE j.is_deleted = 0 AND j.rag_processed = 1 AND m.id IS NULL \
             ORDER BY j.created_at ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_job)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_unprocessed_jobs(&self, limit: usize) -> Result<Vec<Job>, PipelineError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM jobs WHERE is_deleted = 0 AND rag_processed = 0 ORDER BY created_at ASC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_job)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn update_job_structured_fields(
        &self,
        job_id: Uuid,
        responsibilities: &[String],
        requirements: &[String],
        skills: &[String],
        education: &str,
        experience: &str,
        structured_fallback: bool,
    ) -> Result<(), PipelineError> {
        self.conn.execute(
            r#"UPDATE jobs SET responsibilities=?1, requirements=?2, skills=?3, education=?4,
               experience=?5, structured_fallback=?6, updated_at=?7 WHERE id=?8"#,
            params![
                serde_json::to_string(responsibilities).unwrap_or_default(),
                serde_json::to_string(requirements).unwrap_or_default(),
                serde_json::to_string(skills).unwrap_or_default(),
                education,
                experience,
                structured_fallback as i64,
                Utc::now().to_rfc3339(),
                job_id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn mark_job_processed(&self, job_id: Uuid) -> Result<(), PipelineError> {
        self.conn.execute(
            "UPDATE jobs SET rag_processed = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), job_id.to_string()],
        )?;
        Ok(())
    }

    /// Soft-deletes a job and cascades to any of its matches that have
    /// not yet been submitted (§4.1: "soft-delete cascades to
    /// unprocessed matches"). Matches already terminally processed are
    /// left untouched — at-most-once history is never rewritten.
    pub fn soft_delete_job(&mut self, job_id: Uuid) -> Result<(), PipelineError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE jobs SET is_deleted = 1, deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, job_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM resume_matches WHERE job_id = ?1 AND processed = 0",
            params![job_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    pub fn insert_match(&self, m: &ResumeMatch) -> Result<(), PipelineError> {
        self.conn.execute(
            r#"INSERT INTO resume_matches (
                id, job_id, overall_score, dim_semantic, dim_skill, dim_experience, dim_salary,
                dim_industry, matched_skills, decision, priority, should_submit, processed,
                processed_at, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)"#,
            params![
                m.id.to_string(),
                m.job_id.to_string(),
                m.overall_score,
                m.dimensions.semantic,
                m.dimensions.skill,
                m.dimensions.experience,
                m.dimensions.salary,
                m.dimensions.industry,
                serde_json::to_string(&m.matched_skills).unwrap_or_default(),
                decision_to_str(m.decision),
                priority_to_str(m.priority),
                m.should_submit as i64,
                m.processed as i64,
                m.processed_at.map(|t| t.to_rfc3339()),
                m.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Adaptive-sized *raw* pool of unprocessed matches, highest score
    /// first (§4.6). Deliberately does NOT filter on `should_submit`: the
    /// pool is sized to survive the decision engine's rejection rate, and
    /// the caller applies the gate filter itself after pulling it — doing
    /// the filtering here would defeat the point of adaptive sizing.
    /// `min_salary_score`, when given, pushes the salary-dimension floor
    /// down into the query since it's index-friendly; the full tiered
    /// gate still runs in Rust.
    pub fn list_unprocessed_matches(
        &self,
        limit: usize,
        min_salary_score: Option<f64>,
    ) -> Result<Vec<ResumeMatch>, PipelineError> {
        match min_salary_score {
            Some(floor) => {
                let mut stmt = self.conn.prepare(
                    "SELECT * FROM resume_matches WHERE processed = 0 AND dim_salary >= ?1 \
                     ORDER BY overall_score DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![floor, limit as i64], row_to_match)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT * FROM resume_matches WHERE processed = 0 \
                     ORDER BY overall_score DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], row_to_match)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
            }
        }
    }

    /// Startup repair (§4.7, §7): scans for the crash window between
    /// writing a terminal submission log and flipping its match's
    /// `processed` flag, and repairs by flipping the flag. A match that no
    /// longer exists (cascade-deleted by a JOB_SUSPENDED soft-delete) is
    /// not a violation — it's simply absent from the join. Returns the
    /// number of matches repaired.
    pub fn repair_integrity(&mut self) -> Result<usize, PipelineError> {
        let tx = self.conn.transaction()?;
        let stale_match_ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT sl.match_id FROM submission_logs sl \
                 JOIN resume_matches rm ON rm.id = sl.match_id \
                 WHERE sl.status != 'login_required' AND rm.processed = 0",
            )?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let now = Utc::now().to_rfc3339();
        for id in &stale_match_ids {
            tx.execute(
                "UPDATE resume_matches SET processed = 1, processed_at = ?1 WHERE id = ?2",
                params![now, id],
            )?;
        }
        tx.commit()?;
        if !stale_match_ids.is_empty() {
            let err = PipelineError::Integrity(format!(
                "{} match(es) had a terminal submission log but were never marked processed; repaired on startup",
                stale_match_ids.len()
            ));
            log::warn!("{err}");
        }
        Ok(stale_match_ids.len())
    }

    /// Marks a match processed. Enforces at-most-once submission: a
    /// match already marked processed is left alone and `false` is
    /// returned rather than allowing a second submission attempt to be
    /// recorded against it.
    pub fn mark_match_processed(&self, match_id: Uuid) -> Result<bool, PipelineError> {
        let updated = self.conn.execute(
            "UPDATE resume_matches SET processed = 1, processed_at = ?1 \
             WHERE id = ?2 AND processed = 0",
            params![Utc::now().to_rfc3339(), match_id.to_string()],
        )?;
        Ok(updated == 1)
    }

    // ------------------------------------------------------------------
    // Submission logs
    // ------------------------------------------------------------------

    pub fn append_submission_log(&self, log: &SubmissionLog) -> Result<(), PipelineError> {
        self.conn.execute(
            r#"INSERT INTO submission_logs (
                id, match_id, job_id, status, reason, page_title, button_text, button_class,
                detection_ms, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)"#,
            params![
                log.id.to_string(),
                log.match_id.to_string(),
                log.job_id.to_string(),
                status_to_str(log.status),
                log.reason,
                log.page_title,
                log.button_text,
                log.button_class,
                log.detection_ms as i64,
                log.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Count of `Success` submissions recorded today (local calendar
    /// date in UTC), used to enforce the daily quota (§4.6).
    pub fn count_submissions_today(&self) -> Result<u32, PipelineError> {
        self.count_submissions_on(Utc::now().date_naive())
    }

    pub fn count_submissions_on(&self, day: NaiveDate) -> Result<u32, PipelineError> {
        let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc().to_rfc3339();
        let end = (day + chrono::Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .to_rfc3339();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM submission_logs WHERE status = ?1 AND created_at >= ?2 AND created_at < ?3",
            params![status_to_str(SubmissionStatus::Success), start, end],
            |r| r.get(0),
        )?;
        Ok(count as u32)
    }
}

fn decision_to_str(d: MatchDecision) -> &'static str {
    match d {
        MatchDecision::Submit => "submit",
        MatchDecision::Skip => "skip",
        MatchDecision::RejectedByGate => "rejected_by_gate",
    }
}

fn decision_from_str(s: &str) -> MatchDecision {
    match s {
        "submit" => MatchDecision::Submit,
        "rejected_by_gate" => MatchDecision::RejectedByGate,
        _ => MatchDecision::Skip,
    }
}

fn priority_to_str(p: Priority) -> &'static str {
    match p {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

fn priority_from_str(s: &str) -> Priority {
    match s {
        "urgent" => Priority::Urgent,
        "high" => Priority::High,
        "medium" => Priority::Medium,
        _ => Priority::Low,
    }
}

fn status_to_str(s: SubmissionStatus) -> &'static str {
    match s {
        SubmissionStatus::Success => "success",
        SubmissionStatus::AlreadyApplied => "already_applied",
        SubmissionStatus::JobSuspended => "job_suspended",
        SubmissionStatus::JobExpired => "job_expired",
        SubmissionStatus::LoginRequired => "login_required",
        SubmissionStatus::ButtonNotFound => "button_not_found",
        SubmissionStatus::PageError => "page_error",
        SubmissionStatus::DryRun => "dry_run",
    }
}

fn status_from_str(s: &str) -> SubmissionStatus {
    match s {
        "success" => SubmissionStatus::Success,
        "already_applied" => SubmissionStatus::AlreadyApplied,
        "job_suspended" => SubmissionStatus::JobSuspended,
        "job_expired" => SubmissionStatus::JobExpired,
        "login_required" => SubmissionStatus::LoginRequired,
        "button_not_found" => SubmissionStatus::ButtonNotFound,
        "dry_run" => SubmissionStatus::DryRun,
        _ => SubmissionStatus::PageError,
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json_vec(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
    Ok(Job {
        id: Uuid::from_str(&row.get::<_, String>("id")?).unwrap_or_else(|_| Uuid::nil()),
        job_id: row.get("job_id")?,
        fingerprint: row.get("fingerprint")?,
        title: row.get("title")?,
        company: row.get("company")?,
        location: row.get("location")?,
        salary_raw: row.get("salary_raw")?,
        url: row.get("url")?,
        site: row.get("site")?,
        description: row.get("description")?,
        responsibilities: parse_json_vec(&row.get::<_, String>("responsibilities")?),
        requirements: parse_json_vec(&row.get::<_, String>("requirements")?),
        skills: parse_json_vec(&row.get::<_, String>("skills")?),
        education: row.get("education")?,
        experience: row.get("experience")?,
        structured_fallback: row.get::<_, i64>("structured_fallback")? != 0,
        rag_processed: row.get::<_, i64>("rag_processed")? != 0,
        is_deleted: row.get::<_, i64>("is_deleted")? != 0,
        deleted_at: row
            .get::<_, Option<String>>("deleted_at")?
            .map(|s| parse_dt(&s)),
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
        updated_at: parse_dt(&row.get::<_, String>("updated_at")?),
    })
}

fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<ResumeMatch> {
    Ok(ResumeMatch {
        id: Uuid::from_str(&row.get::<_, String>("id")?).unwrap_or_else(|_| Uuid::nil()),
        job_id: Uuid::from_str(&row.get::<_, String>("job_id")?).unwrap_or_else(|_| Uuid::nil()),
        overall_score: row.get("overall_score")?,
        dimensions: DimensionScores {
            semantic: row.get("dim_semantic")?,
            skill: row.get("dim_skill")?,
            experience: row.get("dim_experience")?,
            salary: row.get("dim_salary")?,
            industry: row.get("dim_industry")?,
        },
        matched_skills: parse_json_vec(&row.get::<_, String>("matched_skills")?),
        decision: decision_from_str(&row.get::<_, String>("decision")?),
        priority: priority_from_str(&row.get::<_, String>("priority")?),
        should_submit: row.get::<_, i64>("should_submit")? != 0,
        processed: row.get::<_, i64>("processed")? != 0,
        processed_at: row
            .get::<_, Option<String>>("processed_at")?
            .map(|s| parse_dt(&s)),
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
    })
}

#[allow(dead_code)]
fn row_to_submission_log(row: &rusqlite::Row) -> rusqlite::Result<SubmissionLog> {
    Ok(SubmissionLog {
        id: Uuid::from_str(&row.get::<_, String>("id")?).unwrap_or_else(|_| Uuid::nil()),
        match_id: Uuid::from_str(&row.get::<_, String>("match_id")?).unwrap_or_else(|_| Uuid::nil()),
        job_id: Uuid::from_str(&row.get::<_, String>("job_id")?).unwrap_or_else(|_| Uuid::nil()),
        status: status_from_str(&row.get::<_, String>("status")?),
        reason: row.get("reason")?,
        page_title: row.get("page_title")?,
        button_text: row.get("button_text")?,
        button_class: row.get("button_class")?,
        detection_ms: row.get::<_, i64>("detection_ms")? as u64,
        created_at: parse_dt(&row.get::<_, String>("created_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Job;

    fn sample_job(fp: &str) -> Job {
        Job::new(
            "JID-1",
            fp,
            "Python Developer",
            "Acme",
            "Beijing",
            "15-25K",
            "https://example.com/1",
            "acme-board",
            "Build things.",
        )
    }

    #[test]
    fn insert_is_idempotent_on_fingerprint() {
        let store = JobStore::open_in_memory().unwrap();
        let job = sample_job("fp-1");
        assert!(store.insert_job_if_new(&job).unwrap());
        let job2 = Job::new(
            "JID-2",
            "fp-1",
            "Python Developer",
            "Acme",
            "Beijing",
            "15-25K",
            "https://example.com/2",
            "acme-board",
            "Different text.",
        );
        assert!(!store.insert_job_if_new(&job2).unwrap());
    }

    #[test]
    fn soft_delete_allows_fingerprint_reuse() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = sample_job("fp-2");
        let id = job.id;
        store.insert_job_if_new(&job).unwrap();
        store.soft_delete_job(id).unwrap();

        let revived = sample_job("fp-2");
        assert!(store.insert_job_if_new(&revived).unwrap());
    }

    #[test]
    fn soft_delete_cascades_to_unprocessed_matches_only() {
        let mut store = JobStore::open_in_memory().unwrap();
        let job = sample_job("fp-3");
        let job_id = job.id;
        store.insert_job_if_new(&job).unwrap();

        let unprocessed = ResumeMatch {
            id: Uuid::new_v4(),
            job_id,
            overall_score: 0.9,
            dimensions: DimensionScores::default(),
            matched_skills: vec![],
            decision: MatchDecision::Submit,
            priority: Priority::High,
            should_submit: true,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        };
        let processed = ResumeMatch {
            id: Uuid::new_v4(),
            processed: true,
            processed_at: Some(Utc::now()),
            ..unprocessed.clone()
        };
        store.insert_match(&unprocessed).unwrap();
        store.insert_match(&processed).unwrap();

        store.soft_delete_job(job_id).unwrap();

        let remaining: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM resume_matches", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn mark_match_processed_is_at_most_once() {
        let store = JobStore::open_in_memory().unwrap();
        let job = sample_job("fp-4");
        store.insert_job_if_new(&job).unwrap();
        let m = ResumeMatch {
            id: Uuid::new_v4(),
            job_id: job.id,
            overall_score: 0.9,
            dimensions: DimensionScores::default(),
            matched_skills: vec![],
            decision: MatchDecision::Submit,
            priority: Priority::High,
            should_submit: true,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        };
        store.insert_match(&m).unwrap();

        assert!(store.mark_match_processed(m.id).unwrap());
        assert!(!store.mark_match_processed(m.id).unwrap());
    }

    #[test]
    fn count_submissions_today_counts_only_success() {
        let store = JobStore::open_in_memory().unwrap();
        let job = sample_job("fp-5");
        store.insert_job_if_new(&job).unwrap();
        let m = ResumeMatch {
            id: Uuid::new_v4(),
            job_id: job.id,
            overall_score: 0.9,
            dimensions: DimensionScores::default(),
            matched_skills: vec![],
            decision: MatchDecision::Submit,
            priority: Priority::High,
            should_submit: true,
            processed: false,
            processed_at: None,
            created_at: Utc::now(),
        };
        store.insert_match(&m).unwrap();

        store
            .append_submission_log(&SubmissionLog {
                id: Uuid::new_v4(),
                match_id: m.id,
                job_id: job.id,
                status: SubmissionStatus::Success,
                reason: String::new(),
                page_title: String::new(),
                button_text: String::new(),
                button_class: String::new(),
                detection_ms: 10,
                created_at: Utc::now(),
            })
            .unwrap();
        store
            .append_submission_log(&SubmissionLog {
                id: Uuid::new_v4(),
                match_id: m.id,
                job_id: job.id,
                status: SubmissionStatus::AlreadyApplied,
                reason: String::new(),
                page_title: String::new(),
                button_text: String::new(),
                button_class: String::new(),
                detection_ms: 10,
                created_at: Utc::now(),
            })
            .unwrap();

        assert_eq!(store.count_submissions_today().unwrap(), 1);
    }
}
