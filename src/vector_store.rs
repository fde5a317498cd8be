// src/vector_store.rs
//
// =============================================================================
// RESUMEPILOT: VECTOR STORE ADAPTER
// =============================================================================
//
// Wraps a `dyn EmbeddingStore` and applies the freshness blend the
// backend itself is agnostic to (§4.5): plain cosine for `Balanced`,
// a recency bonus for `FreshFirst`, and the blended formula for the
// default `Hybrid` strategy. Grounded on the orchestrator's
// `transport.rs` pattern of a thin adapter in front of a trait object
// doing the actual I/O.

use crate::capabilities::{DocFilter, EmbeddingStore};
use crate::core::{JobDocument, SearchStrategy};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

pub struct VectorStoreAdapter {
    backend: Arc<dyn EmbeddingStore>,
}

impl VectorStoreAdapter {
    pub fn new(backend: Arc<dyn EmbeddingStore>) -> Self {
        Self { backend }
    }

    pub async fn upsert(&self, docs: &[JobDocument]) -> Result<Vec<String>> {
        self.backend.upsert(docs).await
    }

    /// Blended time-aware search (§4.5):
    ///
    /// - `time_weight` decays by document age: linear from 1.0 (day 0) to
    ///   0.7 (day 7), linear from 0.7 (day 7) to 0.4 (day 30), then
    ///   exponential decay beyond day 30 with a 0.1 floor.
    /// - `Hybrid`: `0.7 * cosine + 0.3 * time_weight`, with a further
    ///   +0.2 bonus (capped at 1.0) for documents <= 7 days old.
    /// - `FreshFirst`: ranks purely by `time_weight`, cosine as tiebreak.
    /// - `Balanced`: plain cosine, no time component.
    pub async fn search(
        &self,
        query_text: &str,
        k: usize,
        filter: &DocFilter,
        strategy: SearchStrategy,
    ) -> Result<Vec<(JobDocument, f64)>> {
        let raw = self.backend.time_aware_search(query_text, k.max(1) * 3, filter).await?;
        let now = Utc::now();

        let mut scored: Vec<(JobDocument, f64)> = raw
            .into_iter()
            .map(|(doc, cosine)| {
                let age_days = ((now - doc.metadata.created_at).num_hours() as f64 / 24.0).max(0.0);
                let time_weight = time_weight(age_days);
                let blended = match strategy {
                    SearchStrategy::Balanced => cosine,
                    SearchStrategy::FreshFirst => time_weight + cosine * 1e-6,
                    SearchStrategy::Hybrid => {
                        let base = 0.7 * cosine + 0.3 * time_weight;
                        let bonus = if age_days <= 7.0 { 0.2 } else { 0.0 };
                        (base + bonus).min(1.0)
                    }
                };
                (doc, blended)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub async fn similarity_search(
        &self,
        query_text: &str,
        k: usize,
        filter: &DocFilter,
    ) -> Result<Vec<(JobDocument, f64)>> {
        self.backend.similarity_search(query_text, k, filter).await
    }
}

/// §4.5 freshness curve: linear 1.0→0.7 over days 0-7, linear 0.7→0.4 over
/// days 7-30, then exponential decay (rate 0.1/day) floored at 0.1.
fn time_weight(age_days: f64) -> f64 {
    if age_days <= 7.0 {
        1.0 - 0.3 * (age_days / 7.0)
    } else if age_days <= 30.0 {
        0.7 - 0.3 * ((age_days - 7.0) / 23.0)
    } else {
        (0.4 * (-0.1 * (age_days - 30.0)).exp()).max(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fakes::{make_doc, FakeEmbeddingStore};
    use crate::core::{DocumentType, Job};
    use chrono::Duration;

    #[test]
    fn time_weight_follows_the_piecewise_decay_curve() {
        assert!((time_weight(0.0) - 1.0).abs() < 1e-9);
        assert!((time_weight(7.0) - 0.7).abs() < 1e-9);
        assert!((time_weight(30.0) - 0.4).abs() < 1e-9);
        assert!(time_weight(3.5) < 1.0 && time_weight(3.5) > 0.7);
        assert!(time_weight(18.0) < 0.7 && time_weight(18.0) > 0.4);
        assert!(time_weight(365.0) >= 0.1);
        assert!(time_weight(365.0) < 0.4);
    }

    fn job() -> Job {
        Job::new(
            "J1",
            "fp",
            "Python Developer",
            "Acme",
            "Beijing",
            "15-25K",
            "https://x",
            "site",
            "desc",
        )
    }

    #[tokio::test]
    async fn hybrid_prefers_fresh_documents() {
        let backend = Arc::new(FakeEmbeddingStore::new());
        let j = job();

        let mut old_doc = make_doc(&j, DocumentType::Overview, "python backend engineer");
        old_doc.metadata.created_at = Utc::now() - Duration::days(60);
        let mut fresh_doc = make_doc(&j, DocumentType::Overview, "python backend engineer");
        fresh_doc.metadata.created_at = Utc::now() - Duration::days(1);

        backend.upsert(&[old_doc, fresh_doc]).await.unwrap();

        let adapter = VectorStoreAdapter::new(backend);
        let results = adapter
            .search("python backend engineer", 2, &DocFilter::default(), SearchStrategy::Hybrid)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        let fresh_age = Utc::now() - results[0].0.metadata.created_at;
        assert!(fresh_age.num_days() <= 7);
    }

    #[tokio::test]
    async fn balanced_ignores_recency() {
        let backend = Arc::new(FakeEmbeddingStore::new());
        let j = job();

        let mut old_doc = make_doc(&j, DocumentType::Overview, "python backend engineer expert");
        old_doc.metadata.created_at = Utc::now() - Duration::days(90);
        let mut fresh_doc = make_doc(&j, DocumentType::Overview, "unrelated topic only");
        fresh_doc.metadata.created_at = Utc::now();

        backend.upsert(&[old_doc, fresh_doc]).await.unwrap();

        let adapter = VectorStoreAdapter::new(backend);
        let results = adapter
            .search("python backend engineer expert", 2, &DocFilter::default(), SearchStrategy::Balanced)
            .await
            .unwrap();

        assert!(results[0].1 > results[1].1);
    }
}
