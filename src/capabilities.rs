// src/capabilities.rs
//
// =============================================================================
// RESUMEPILOT: EXTERNAL CAPABILITY PORTS
// =============================================================================
//
// The Hexagonal Ports. Three external collaborators are consumed but not
// implemented here (§1 Non-goals): the browser automation driver, the LLM
// structured-extraction backend, and the embedding/vector-store engine.
// Each is a narrow `#[async_trait]`, exactly the shape the orchestrator
// uses for `CodeDriver`/`Transport`. In-memory fakes are provided for
// tests; production wiring plugs in a real implementation behind the
// same trait object.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

// ============================================================================
// 1. BROWSER DRIVER
// ============================================================================

/// A snapshot of one DOM element, captured at a point in time. Submitter
/// and Extractor never hold a live handle — every decision is made from a
/// single `page_source`/`find_all` pass (§4.7 step 2: "one-shot status
/// detection").
#[derive(Debug, Clone)]
pub struct Element {
    pub text: String,
    pub class: String,
    pub clickable: bool,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<()>;
    async fn page_source(&mut self) -> Result<String>;
    async fn find_all(&mut self, selector: &str) -> Result<Vec<Element>>;
    /// Clicks the first element matching `selector` using one of the
    /// standard/JS/action-chain/keyboard/scroll-then-click strategies.
    /// Returns `Ok(true)` if a click was actually delivered.
    async fn click(&mut self, selector: &str, strategy: ClickStrategy) -> Result<bool>;
    async fn title(&mut self) -> Result<String>;
    async fn execute_script(&mut self, js: &str) -> Result<Value>;
    async fn quit(self: Box<Self>) -> Result<()>;
}

/// §4.3/§4.7's "multi-strategy retry" as a tagged variant, not a trait
/// hierarchy (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    Standard,
    JsClick,
    ActionChain,
    Keyboard,
    ScrollThenClick,
}

impl ClickStrategy {
    /// The ordered set attempted by both the Extractor's detail-page
    /// click-through and the Submitter's apply-button click.
    pub const ORDER: [ClickStrategy; 5] = [
        ClickStrategy::Standard,
        ClickStrategy::JsClick,
        ClickStrategy::ActionChain,
        ClickStrategy::Keyboard,
        ClickStrategy::ScrollThenClick,
    ];
}

// ============================================================================
// 2. STRUCTURED EXTRACTOR (LLM backend)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StructuredFields {
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub skills: Vec<String>,
    pub education: String,
    pub experience: String,
}

#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, raw_text: &str) -> Result<StructuredFields>;
}

// ============================================================================
// 3. EMBEDDING STORE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DocFilter {
    pub job_id: Option<uuid::Uuid>,
}

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Batch upsert; returns one opaque doc-ref per input document, same
    /// order.
    async fn upsert(&self, docs: &[crate::core::JobDocument]) -> Result<Vec<String>>;

    /// Plain cosine similarity search. Scores are normalized to [0,1].
    async fn similarity_search(
        &self,
        query_text: &str,
        k: usize,
        filter: &DocFilter,
    ) -> Result<Vec<(crate::core::JobDocument, f64)>>;

    /// Time-aware search; strategy selection and the freshness blend are
    /// applied by the caller (`vector_store::VectorStoreAdapter`), not by
    /// the backend — the backend only needs to return candidates with
    /// their raw cosine score plus a `created_at` to blend against.
    async fn time_aware_search(
        &self,
        query_text: &str,
        k: usize,
        filter: &DocFilter,
    ) -> Result<Vec<(crate::core::JobDocument, f64)>>;
}

// ============================================================================
// 4. IN-MEMORY FAKES (test doubles)
// ============================================================================

pub mod fakes {
    use super::*;
    use crate::core::{DocumentType, Job, JobDocument, JobDocumentMetadata};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// A scripted browser: returns canned page sources / element lists per
    /// URL, recording navigation history for assertions.
    pub struct FakeBrowserDriver {
        pub pages: HashMap<String, String>,
        pub elements: HashMap<String, Vec<Element>>,
        pub visited: Mutex<Vec<String>>,
        pub click_should_succeed: bool,
        current_url: Mutex<String>,
    }

    impl FakeBrowserDriver {
        pub fn new() -> Self {
            Self {
                pages: HashMap::new(),
                elements: HashMap::new(),
                visited: Mutex::new(Vec::new()),
                click_should_succeed: true,
                current_url: Mutex::new(String::new()),
            }
        }
    }

    impl Default for FakeBrowserDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeBrowserDriver {
        async fn navigate(&mut self, url: &str) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            *self.current_url.lock().unwrap() = url.to_string();
            Ok(())
        }

        async fn page_source(&mut self) -> Result<String> {
            let url = self.current_url.lock().unwrap().clone();
            Ok(self.pages.get(&url).cloned().unwrap_or_default())
        }

        async fn find_all(&mut self, selector: &str) -> Result<Vec<Element>> {
            Ok(self.elements.get(selector).cloned().unwrap_or_default())
        }

        async fn click(&mut self, _selector: &str, _strategy: ClickStrategy) -> Result<bool> {
            Ok(self.click_should_succeed)
        }

        async fn title(&mut self) -> Result<String> {
            Ok("fake-page".to_string())
        }

        async fn execute_script(&mut self, _js: &str) -> Result<Value> {
            Ok(Value::Bool(true))
        }

        async fn quit(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    /// Splits on the Chinese section headers the source's fallback path
    /// looks for; always succeeds (tests exercise the LLM failure path by
    /// swapping in `FailingStructuredExtractor` instead).
    pub struct FakeStructuredExtractor;

    #[async_trait]
    impl StructuredExtractor for FakeStructuredExtractor {
        async fn extract(&self, raw_text: &str) -> Result<StructuredFields> {
            Ok(StructuredFields {
                responsibilities: vec![format!("Work on: {}", raw_text.chars().take(20).collect::<String>())],
                requirements: vec!["3+ years experience".to_string()],
                skills: vec!["Python".to_string()],
                education: "Bachelor's".to_string(),
                experience: "3-5 years".to_string(),
            })
        }
    }

    pub struct FailingStructuredExtractor;

    #[async_trait]
    impl StructuredExtractor for FailingStructuredExtractor {
        async fn extract(&self, _raw_text: &str) -> Result<StructuredFields> {
            Err(anyhow::anyhow!("structured extraction backend unavailable"))
        }
    }

    /// A trivial bag-of-words cosine stand-in: score = fraction of query
    /// tokens present in the document text. Deterministic, no external
    /// model dependency — exactly enough fidelity for pipeline tests.
    pub struct FakeEmbeddingStore {
        docs: Mutex<Vec<JobDocument>>,
    }

    impl FakeEmbeddingStore {
        pub fn new() -> Self {
            Self {
                docs: Mutex::new(Vec::new()),
            }
        }

        fn lexical_score(query: &str, text: &str) -> f64 {
            let q: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
            if q.is_empty() {
                return 0.0;
            }
            let text_lower = text.to_lowercase();
            let hits = q.iter().filter(|t| text_lower.contains(t.as_str())).count();
            hits as f64 / q.len() as f64
        }
    }

    impl Default for FakeEmbeddingStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl EmbeddingStore for FakeEmbeddingStore {
        async fn upsert(&self, docs: &[JobDocument]) -> Result<Vec<String>> {
            let mut store = self.docs.lock().unwrap();
            let mut refs = Vec::with_capacity(docs.len());
            for d in docs {
                refs.push(d.id.to_string());
                store.push(d.clone());
            }
            Ok(refs)
        }

        async fn similarity_search(
            &self,
            query_text: &str,
            k: usize,
            filter: &DocFilter,
        ) -> Result<Vec<(JobDocument, f64)>> {
            let store = self.docs.lock().unwrap();
            let mut scored: Vec<(JobDocument, f64)> = store
                .iter()
                .filter(|d| filter.job_id.map(|jid| jid == d.metadata.job_id).unwrap_or(true))
                .map(|d| (d.clone(), Self::lexical_score(query_text, &d.text)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            scored.truncate(k);
            Ok(scored)
        }

        async fn time_aware_search(
            &self,
            query_text: &str,
            k: usize,
            filter: &DocFilter,
        ) -> Result<Vec<(JobDocument, f64)>> {
            self.similarity_search(query_text, k, filter).await
        }
    }

    /// Helper for tests that need a well-formed `JobDocument`.
    pub fn make_doc(job: &Job, kind: DocumentType, text: &str) -> JobDocument {
        JobDocument {
            id: Uuid::new_v4(),
            document_type: kind,
            text: text.to_string(),
            embedding: None,
            metadata: JobDocumentMetadata {
                job_id: job.id,
                created_at: Utc::now(),
                site: job.site.clone(),
            },
        }
    }
}
