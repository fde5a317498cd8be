// src/processor.rs
//
// =============================================================================
// RESUMEPILOT: PROCESS STAGE
// =============================================================================
//
// Turns a raw extracted `Job` into structured fields plus a handful of
// `JobDocument`s for the vector store (§4.4). Grounded on the
// orchestrator's `drivers/external.rs` `call_adapter("parse")` pattern:
// call an external backend, and on failure fall back to a local
// heuristic rather than failing the whole batch. Batched through
// `scheduler::WorkerPool`, same as the orchestrator batches node leases.

use crate::capabilities::StructuredExtractor;
use crate::core::{DocumentType, Job, JobDocument, JobDocumentMetadata};
use crate::scheduler::WorkerPool;
use crate::store::JobStore;
use crate::vector_store::VectorStoreAdapter;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct ProcessorConfig {
    pub batch_size: usize,
    pub worker_pool_size: usize,
}

pub struct Processor {
    extractor: Arc<dyn StructuredExtractor>,
    config: ProcessorConfig,
}

#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub attempted: usize,
    pub llm_succeeded: usize,
    pub heuristic_fallback: usize,
    pub failed: usize,
}

pub struct ProcessedJob {
    pub job_id: Uuid,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub skills: Vec<String>,
    pub education: String,
    pub experience: String,
    pub structured_fallback: bool,
    pub documents: Vec<JobDocument>,
}

impl Processor {
    pub fn new(extractor: Arc<dyn StructuredExtractor>, config: ProcessorConfig) -> Self {
        Self { extractor, config }
    }

    /// Processes one batch of unprocessed jobs: calls the structured
    /// extractor per job (bounded by the worker pool), falls back to the
    /// heuristic splitter on failure, upserts the derived documents into
    /// the vector store, persists the structured fields, and marks each
    /// job processed. A single job's failure never aborts the batch
    /// (§4.4 "partial-batch-failure isolation").
    pub async fn run_batch(&self, store: &JobStore, vector_store: &VectorStoreAdapter) -> Result<ProcessingStats> {
        let jobs = store.list_unprocessed_jobs(self.config.batch_size)?;
        let mut stats = ProcessingStats { attempted: jobs.len(), ..Default::default() };

        let pool = WorkerPool::new(self.config.worker_pool_size);
        let extractor = self.extractor.clone();
        let results = pool
            .run_all(jobs, move |job| {
                let extractor = extractor.clone();
                async move { process_one(&extractor, job).await }
            })
            .await;

        for result in results {
            match result {
                Ok(processed) => {
                    if processed.structured_fallback {
                        stats.heuristic_fallback += 1;
                    } else {
                        stats.llm_succeeded += 1;
                    }
                    if !processed.documents.is_empty() {
                        if let Err(e) = vector_store.upsert(&processed.documents).await {
                            log::warn!("vector store upsert failed for job {}: {e:#}", processed.job_id);
                        }
                    }
                    store.update_job_structured_fields(
                        processed.job_id,
                        &processed.responsibilities,
                        &processed.requirements,
                        &processed.skills,
                        &processed.education,
                        &processed.experience,
                        processed.structured_fallback,
                    )?;
                    store.mark_job_processed(processed.job_id)?;
                }
                Err(e) => {
                    log::warn!("job processing failed: {e:#}");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

async fn process_one(extractor: &Arc<dyn StructuredExtractor>, job: Job) -> Result<ProcessedJob> {
    let (responsibilities, requirements, skills, education, experience, fallback) =
        match extractor.extract(&job.description).await {
            Ok(fields) => (
                fields.responsibilities,
                fields.requirements,
                fields.skills,
                fields.education,
                fields.experience,
                false,
            ),
            Err(e) => {
                log::warn!("structured extractor failed for job {}: {e:#}, using heuristic fallback", job.job_id);
                let split = heuristic_split(&job.description);
                (split.0, split.1, split.2, split.3, split.4, true)
            }
        };

    let documents = build_documents(&job, &responsibilities, &requirements, &skills, &experience);

    Ok(ProcessedJob {
        job_id: job.id,
        responsibilities,
        requirements,
        skills,
        education,
        experience,
        structured_fallback: fallback,
        documents,
    })
}

/// Splits raw description text on common Chinese section headers when
/// the LLM backend is unavailable. Best-effort: anything not recognized
/// falls into `responsibilities` as a single block so the job still gets
/// indexed rather than dropped.
fn heuristic_split(text: &str) -> (Vec<String>, Vec<String>, Vec<String>, String, String) {
    const RESP_HEADERS: &[&str] = &["岗位职责", "工作职责", "职责描述"];
    const REQ_HEADERS: &[&str] = &["任职要求", "岗位要求", "职位要求"];
    const SKILL_HEADERS: &[&str] = &["技能要求", "技术要求"];

    let mut responsibilities = Vec::new();
    let mut requirements = Vec::new();
    let mut skills = Vec::new();

    let mut current = &mut responsibilities;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if RESP_HEADERS.iter().any(|h| trimmed.contains(h)) {
            current = &mut responsibilities;
            continue;
        }
        if REQ_HEADERS.iter().any(|h| trimmed.contains(h)) {
            current = &mut requirements;
            continue;
        }
        if SKILL_HEADERS.iter().any(|h| trimmed.contains(h)) {
            current = &mut skills;
            continue;
        }
        current.push(trimmed.trim_start_matches(['-', '•', '*']).trim().to_string());
    }

    if responsibilities.is_empty() && requirements.is_empty() && skills.is_empty() {
        responsibilities.push(text.trim().to_string());
    }

    (responsibilities, requirements, skills, String::new(), String::new())
}

/// One `JobDocument` per non-empty section plus an overview document
/// (§4.4: "4-6 documents per job" — Overview, Responsibility,
/// Requirement, Skills, and optionally BasicRequirements when the
/// experience string carries a basic-requirements clause).
fn build_documents(
    job: &Job,
    responsibilities: &[String],
    requirements: &[String],
    skills: &[String],
    experience: &str,
) -> Vec<JobDocument> {
    let mut docs = Vec::new();
    let meta = || JobDocumentMetadata {
        job_id: job.id,
        created_at: Utc::now(),
        site: job.site.clone(),
    };

    docs.push(JobDocument {
        id: Uuid::new_v4(),
        document_type: DocumentType::Overview,
        text: format!("{} at {} ({})", job.title, job.company, job.location),
        embedding: None,
        metadata: meta(),
    });

    if !responsibilities.is_empty() {
        docs.push(JobDocument {
            id: Uuid::new_v4(),
            document_type: DocumentType::Responsibility,
            text: responsibilities.join("\n"),
            embedding: None,
            metadata: meta(),
        });
    }
    if !requirements.is_empty() {
        docs.push(JobDocument {
            id: Uuid::new_v4(),
            document_type: DocumentType::Requirement,
            text: requirements.join("\n"),
            embedding: None,
            metadata: meta(),
        });
    }
    if !skills.is_empty() {
        docs.push(JobDocument {
            id: Uuid::new_v4(),
            document_type: DocumentType::Skills,
            text: skills.join(", "),
            embedding: None,
            metadata: meta(),
        });
    }
    if !experience.is_empty() {
        docs.push(JobDocument {
            id: Uuid::new_v4(),
            document_type: DocumentType::BasicRequirements,
            text: experience.to_string(),
            embedding: None,
            metadata: meta(),
        });
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fakes::{FailingStructuredExtractor, FakeStructuredExtractor};

    fn job(description: &str) -> Job {
        Job::new(
            "J1",
            "fp",
            "Python Developer",
            "Acme",
            "Beijing",
            "15-25K",
            "https://x",
            "site",
            description,
        )
    }

    #[tokio::test]
    async fn llm_path_marks_non_fallback() {
        let extractor: Arc<dyn StructuredExtractor> = Arc::new(FakeStructuredExtractor);
        let processed = process_one(&extractor, job("some description")).await.unwrap();
        assert!(!processed.structured_fallback);
        assert!(!processed.documents.is_empty());
    }

    #[tokio::test]
    async fn failing_extractor_triggers_heuristic_fallback() {
        let extractor: Arc<dyn StructuredExtractor> = Arc::new(FailingStructuredExtractor);
        let description = "岗位职责\n负责后端开发\n任职要求\n3年经验";
        let processed = process_one(&extractor, job(description)).await.unwrap();
        assert!(processed.structured_fallback);
        assert_eq!(processed.responsibilities, vec!["负责后端开发".to_string()]);
        assert_eq!(processed.requirements, vec!["3年经验".to_string()]);
    }

    #[tokio::test]
    async fn heuristic_fallback_without_headers_keeps_whole_text() {
        let extractor: Arc<dyn StructuredExtractor> = Arc::new(FailingStructuredExtractor);
        let processed = process_one(&extractor, job("just a plain paragraph")).await.unwrap();
        assert_eq!(processed.responsibilities, vec!["just a plain paragraph".to_string()]);
    }

    #[tokio::test]
    async fn run_batch_processes_and_marks_jobs() {
        let store = JobStore::open_in_memory().unwrap();
        let j = job("plain text");
        store.insert_job_if_new(&j).unwrap();

        let processor = Processor::new(Arc::new(FakeStructuredExtractor), ProcessorConfig {
            batch_size: 10,
            worker_pool_size: 2,
        });
        let vector_store = VectorStoreAdapter::new(Arc::new(crate::capabilities::fakes::FakeEmbeddingStore::new()));
        let stats = processor.run_batch(&store, &vector_store).await.unwrap();
        assert_eq!(stats.attempted, 1);
        assert_eq!(stats.llm_succeeded, 1);
        assert!(store.list_unprocessed_jobs(10).unwrap().is_empty());
    }
}
