// src/matcher.rs
//
// =============================================================================
// RESUMEPILOT: MATCH STAGE
// =============================================================================
//
// Five-dimension scoring (§4.5): semantic via the vector store, skill
// via the three-layer `SkillExpander`, experience/salary via direct
// arithmetic. Weighted sum yields `overall_score`; gating happens later
// in the Decide stage. Grounded on the orchestrator's `workflow.rs`
// priority-recalculation pass: a pure function over already-fetched
// data, no I/O beyond the one vector-store round trip per job.

use crate::capabilities::DocFilter;
use crate::config::MatcherWeights;
use crate::core::{DimensionScores, DocumentType, Job, ResumeProfile, SearchStrategy};
use crate::fingerprint::parse_salary_range;
use crate::skills::SkillExpander;
use crate::vector_store::VectorStoreAdapter;
use anyhow::Result;

pub struct Matcher<'a> {
    vector_store: &'a VectorStoreAdapter,
    skills: &'a SkillExpander,
    weights: MatcherWeights,
}

impl<'a> Matcher<'a> {
    pub fn new(vector_store: &'a VectorStoreAdapter, skills: &'a SkillExpander, weights: MatcherWeights) -> Self {
        Self { vector_store, skills, weights }
    }

    pub async fn score(&self, job: &Job, profile: &ResumeProfile) -> Result<(DimensionScores, Vec<String>)> {
        let semantic = self.semantic_score(job, profile).await?;
        let (skill, matched_skills) = self.skill_score(job, profile);
        let experience = self.experience_score(job, profile);
        let salary = self.salary_score(job, profile);

        Ok((
            DimensionScores {
                semantic,
                skill,
                experience,
                salary,
                industry: 0.0,
            },
            matched_skills,
        ))
    }

    pub fn overall(&self, dims: &DimensionScores) -> f64 {
        (dims.semantic * self.weights.semantic
            + dims.skill * self.weights.skill
            + dims.experience * self.weights.experience
            + dims.salary * self.weights.salary
            + dims.industry * self.weights.industry)
            .clamp(0.0, 1.0)
    }

    /// Queries the vector store once per document type present for the
    /// job, aggregating by `DocumentType::weight()` (§4.5).
    async fn semantic_score(&self, job: &Job, profile: &ResumeProfile) -> Result<f64> {
        let query = format!(
            "{} {} {}",
            profile.current_position,
            profile.all_skills().join(" "),
            profile.work_history.join(" ")
        );
        let filter = DocFilter { job_id: Some(job.id) };
        let results = self.vector_store.search(&query, 10, &filter, SearchStrategy::Hybrid).await?;

        if results.is_empty() {
            return Ok(0.0);
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for dtype in [
            DocumentType::Overview,
            DocumentType::Responsibility,
            DocumentType::Requirement,
            DocumentType::Skills,
            DocumentType::BasicRequirements,
        ] {
            if let Some((_, score)) = results.iter().find(|(doc, _)| doc.document_type == dtype) {
                weighted_sum += score * dtype.weight();
                weight_total += dtype.weight();
            }
        }
        if weight_total == 0.0 {
            return Ok(0.0);
        }
        Ok((weighted_sum / weight_total).clamp(0.0, 1.0))
    }

    /// Fraction of the job's required skills matched by the candidate,
    /// expanded through the canonical/bilingual/variant tables (§4.5),
    /// plus a capped bonus for candidates who satisfy a requirement
    /// several times over (e.g. listing both "JS" and "JavaScript" against
    /// one required skill) rather than just clearing the bar.
    fn skill_score(&self, job: &Job, profile: &ResumeProfile) -> (f64, Vec<String>) {
        if job.skills.is_empty() {
            return (0.0, Vec::new());
        }
        let candidate_skills = profile.all_skills();
        let mut matched = Vec::new();
        let mut overmatch = 0usize;
        for required in &job.skills {
            let required_expanded = self.skills.expand(required);
            let hits = candidate_skills
                .iter()
                .filter(|c| self.skills.expand(c).intersection(&required_expanded).next().is_some())
                .count();
            if hits > 0 {
                matched.push(required.clone());
                overmatch += hits - 1;
            }
        }
        let base = (matched.len() as f64 / job.skills.len() as f64).clamp(0.0, 1.0);
        let bonus = (overmatch as f64 * 0.05).min(0.25);
        (base + bonus, matched)
    }

    /// `min(1, candidate_years / required_years)`. Required years are
    /// parsed from the job's `experience` field heuristically; absent a
    /// recognizable number, no penalty is applied (score 1.0) since the
    /// requirement couldn't be established.
    fn experience_score(&self, job: &Job, profile: &ResumeProfile) -> f64 {
        match extract_required_years(&job.experience) {
            Some(required) if required > 0.0 => {
                (profile.total_experience_years / required).min(1.0)
            }
            _ => 1.0,
        }
    }

    /// Overlap ratio between the job's parsed salary range and the
    /// candidate's expectation. Absent either side, the dimension is
    /// neutral (0.5) rather than penalizing.
    fn salary_score(&self, job: &Job, profile: &ResumeProfile) -> f64 {
        let Some(expectation) = &profile.salary_expectation else {
            return 0.5;
        };
        let Some(parsed) = parse_salary_range(&job.salary_raw) else {
            return 0.5;
        };
        parsed.overlap_ratio(expectation.min, expectation.max)
    }
}

fn extract_required_years(experience: &str) -> Option<f64> {
    let digits: String = experience
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if !digits.is_empty() {
        return digits.parse().ok();
    }
    // Try scanning for the first digit run anywhere in the string.
    let mut collecting = false;
    let mut buf = String::new();
    for c in experience.chars() {
        if c.is_ascii_digit() {
            collecting = true;
            buf.push(c);
        } else if collecting {
            break;
        }
    }
    if buf.is_empty() {
        None
    } else {
        buf.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fakes::FakeEmbeddingStore;
    use crate::core::{SalaryRange, SkillCategory};
    use std::sync::Arc;

    fn profile() -> ResumeProfile {
        ResumeProfile {
            name: "Jane".to_string(),
            total_experience_years: 4.0,
            current_position: "Backend Engineer".to_string(),
            skill_categories: vec![SkillCategory {
                name: "Languages".to_string(),
                skills: vec!["Python".to_string(), "Go".to_string()],
                proficiency: "expert".to_string(),
                years: 4.0,
            }],
            work_history: vec!["Acme".to_string()],
            preferred_locations: vec!["Beijing".to_string()],
            salary_expectation: Some(SalaryRange { min: 15.0, max: 25.0 }),
        }
    }

    fn job() -> Job {
        let mut j = Job::new(
            "J1",
            "fp",
            "Python Developer",
            "Acme",
            "Beijing",
            "15-25K",
            "https://x",
            "site",
            "desc",
        );
        j.skills = vec!["Python".to_string(), "Rust".to_string()];
        j.experience = "3-5 years".to_string();
        j
    }

    #[tokio::test]
    async fn skill_and_salary_dimensions_score_as_expected() {
        let backend = Arc::new(FakeEmbeddingStore::new());
        let vs = VectorStoreAdapter::new(backend);
        let skills = SkillExpander::new();
        let matcher = Matcher::new(&vs, &skills, MatcherWeights::default());

        let j = job();
        let p = profile();
        let (dims, matched) = matcher.score(&j, &p).await.unwrap();

        assert_eq!(matched, vec!["Python".to_string()]);
        assert!((dims.skill - 0.5).abs() < 1e-6);
        assert_eq!(dims.salary, 1.0);
        assert_eq!(dims.experience, 1.0);
    }

    #[test]
    fn skill_score_awards_overmatch_bonus() {
        let backend = Arc::new(FakeEmbeddingStore::new());
        let vs = VectorStoreAdapter::new(backend);
        let skills = SkillExpander::new();
        let matcher = Matcher::new(&vs, &skills, MatcherWeights::default());

        let mut j = job();
        j.skills = vec!["JavaScript".to_string()];
        let mut p = profile();
        p.skill_categories = vec![SkillCategory {
            name: "Languages".to_string(),
            skills: vec!["JavaScript".to_string(), "JS".to_string()],
            proficiency: "expert".to_string(),
            years: 4.0,
        }];

        let (score, matched) = matcher.skill_score(&j, &p);
        assert_eq!(matched, vec!["JavaScript".to_string()]);
        assert!((score - 1.05).abs() < 1e-6);
    }

    #[test]
    fn experience_score_scales_below_requirement() {
        let backend = Arc::new(FakeEmbeddingStore::new());
        let vs = VectorStoreAdapter::new(backend);
        let skills = SkillExpander::new();
        let matcher = Matcher::new(&vs, &skills, MatcherWeights::default());

        let mut j = job();
        j.experience = "10 years".to_string();
        let p = profile();
        let score = matcher.experience_score(&j, &p);
        assert!((score - 0.4).abs() < 1e-6);
    }
}
