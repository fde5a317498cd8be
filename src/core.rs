// src/core.rs
//
// =============================================================================
// RESUMEPILOT: CORE DATA MODEL
// =============================================================================
//
// The data contracts shared by every stage of the pipeline: Extract ->
// Process -> Match -> Decide -> Submit. Mirrors the relational schema of
// §6 one-to-one; `store.rs` is the only place that knows how these get
// persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// 1. JOB
// ============================================================================

/// A discovered posting. Never physically deleted; `is_deleted` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Site-specific job id (may collide across sites; `fingerprint` is
    /// the actual dedup key).
    pub job_id: String,
    /// 12-char hash of normalized title+company+salary+location.
    pub fingerprint: String,

    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_raw: String,
    pub url: String,
    pub site: String,
    pub description: String,

    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub experience: String,
    /// Set by the structured processor's heuristic fallback, never by the
    /// happy-path extractor call.
    #[serde(default)]
    pub structured_fallback: bool,

    #[serde(default)]
    pub rag_processed: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: impl Into<String>,
        fingerprint: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        salary_raw: impl Into<String>,
        url: impl Into<String>,
        site: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id: job_id.into(),
            fingerprint: fingerprint.into(),
            title: title.into(),
            company: company.into(),
            location: location.into(),
            salary_raw: salary_raw.into(),
            url: url.into(),
            site: site.into(),
            description: description.into(),
            responsibilities: Vec::new(),
            requirements: Vec::new(),
            skills: Vec::new(),
            education: String::new(),
            experience: String::new(),
            structured_fallback: false,
            rag_processed: false,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// 2. JOB DOCUMENT (vector store unit)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Overview,
    Responsibility,
    Requirement,
    Skills,
    BasicRequirements,
}

impl DocumentType {
    /// Aggregation weight used by the semantic scoring dimension, §4.5.
    pub fn weight(self) -> f64 {
        match self {
            DocumentType::Overview => 0.30,
            DocumentType::Responsibility => 0.25,
            DocumentType::Requirement => 0.25,
            DocumentType::Skills => 0.15,
            DocumentType::BasicRequirements => 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocumentMetadata {
    pub job_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub site: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub document_type: DocumentType,
    pub text: String,
    /// Populated by the vector store adapter on upsert; `None` until then.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    pub metadata: JobDocumentMetadata,
}

// ============================================================================
// 3. RESUME PROFILE (read-only input, never persisted)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCategory {
    pub name: String,
    pub skills: Vec<String>,
    pub proficiency: String,
    pub years: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub name: String,
    pub total_experience_years: f64,
    pub current_position: String,
    pub skill_categories: Vec<SkillCategory>,
    #[serde(default)]
    pub work_history: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    pub salary_expectation: Option<SalaryRange>,
}

impl ResumeProfile {
    /// Flattened skill list across all categories, used by the matcher and
    /// the semantic query-text builder.
    pub fn all_skills(&self) -> Vec<&str> {
        self.skill_categories
            .iter()
            .flat_map(|c| c.skills.iter().map(String::as_str))
            .collect()
    }
}

// ============================================================================
// 4. RESUME MATCH
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchDecision {
    Submit,
    Skip,
    RejectedByGate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DimensionScores {
    pub semantic: f64,
    pub skill: f64,
    pub experience: f64,
    pub salary: f64,
    pub industry: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeMatch {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub job_id: Uuid,
    pub overall_score: f64,
    pub dimensions: DimensionScores,
    pub matched_skills: Vec<String>,
    pub decision: MatchDecision,
    pub priority: Priority,
    pub should_submit: bool,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// 5. SUBMISSION LOG (append-only)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Success,
    AlreadyApplied,
    JobSuspended,
    JobExpired,
    LoginRequired,
    ButtonNotFound,
    PageError,
    DryRun,
}

impl SubmissionStatus {
    /// A terminal status is one that must never be retried — it either
    /// succeeded or can never succeed. `LoginRequired` is the one
    /// non-terminal status: it aborts the *batch*, but the individual
    /// match is left untouched for a future run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::LoginRequired)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionLog {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub match_id: Uuid,
    pub job_id: Uuid,
    pub status: SubmissionStatus,
    pub reason: String,
    pub page_title: String,
    pub button_text: String,
    pub button_class: String,
    pub detection_ms: u64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// 6. SEARCH STRATEGY (vector store)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Hybrid,
    FreshFirst,
    Balanced,
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::Hybrid
    }
}

// ============================================================================
// 7. MISC VALUE CARRIERS
// ============================================================================

/// Raw fields visible on a search-results (list) page, before the detail
/// page is opened. Used to compute the fingerprint cheaply (§4.3 step 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_raw: String,
    pub site: String,
}

/// Full detail-page extraction, produced after a successful click-through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJobDetail {
    pub listing: RawListing,
    pub url: String,
    pub description: String,
}

/// Arbitrary structured metadata bag, kept for forward-compat the way the
/// orchestrator keeps `flow_context: HashMap<String, Value>` on `Job`.
pub type MetaBag = HashMap<String, Value>;
