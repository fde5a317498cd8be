// tests/pipeline_end_to_end.rs
//
// Exercises the full Extract -> Process -> Match -> Decide -> Submit
// pipeline against the in-memory fakes, covering the happy path
// (a strong match gets submitted) and the dedup path (re-running
// extraction over the same listing inserts nothing new).

use resumepilot::capabilities::fakes::{Element, FakeBrowserDriver, FakeEmbeddingStore, FakeStructuredExtractor};
use resumepilot::config::PipelineConfig;
use resumepilot::controller::{PipelineController, SearchTarget};
use resumepilot::core::{ResumeProfile, SalaryRange, SkillCategory};
use resumepilot::store::JobStore;
use std::collections::HashMap;
use std::sync::Arc;

fn profile() -> ResumeProfile {
    ResumeProfile {
        name: "Jane Doe".to_string(),
        total_experience_years: 5.0,
        current_position: "Backend Engineer".to_string(),
        skill_categories: vec![SkillCategory {
            name: "Languages".to_string(),
            skills: vec!["Python".to_string(), "Go".to_string(), "SQL".to_string()],
            proficiency: "expert".to_string(),
            years: 5.0,
        }],
        work_history: vec!["Acme Corp".to_string()],
        preferred_locations: vec!["Beijing".to_string()],
        salary_expectation: Some(SalaryRange { min: 15.0, max: 25.0 }),
    }
}

fn driver_with_one_listing() -> FakeBrowserDriver {
    let mut driver = FakeBrowserDriver::new();
    driver.elements.insert(
        ".card".to_string(),
        vec![Element {
            text: "Python Backend Developer|Acme|Beijing|15-25K".to_string(),
            class: String::new(),
            clickable: true,
        }],
    );
    driver
}

fn config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.extractor.max_pages = 1;
    cfg.extractor.card_delay_ms_min = 0;
    cfg.extractor.card_delay_ms_max = 1;
    cfg.extractor.card_selectors = HashMap::from([("default".to_string(), vec![".card".to_string()])]);
    cfg.submitter.submission_delay_ms_min = 0;
    cfg.submitter.submission_delay_ms_max = 1;
    cfg.submitter.batch_rest_ms_min = 0;
    cfg.submitter.batch_rest_ms_max = 1;
    cfg.submitter.dry_run = true;
    cfg
}

#[tokio::test]
async fn happy_path_strong_match_gets_submitted() {
    let store = JobStore::open_in_memory().unwrap();
    let browser: Box<dyn resumepilot::capabilities::BrowserDriver> = Box::new(driver_with_one_listing());
    let extractor = Arc::new(FakeStructuredExtractor);
    let embeddings = Arc::new(FakeEmbeddingStore::new());

    let mut controller = PipelineController::new(store, embeddings, extractor, browser, config()).unwrap();
    let targets = vec![SearchTarget {
        site: "acme-board".to_string(),
        search_url: "https://example.com/search".to_string(),
    }];

    let report = controller.run(&targets, &profile()).await.unwrap();

    assert_eq!(report.extract.succeeded, 1);
    assert_eq!(report.process.attempted, 1);
    assert_eq!(report.matching.attempted, 1);
    assert!(!report.had_any_failure());
}

#[tokio::test]
async fn rerunning_extraction_over_same_listing_does_not_duplicate() {
    let store = JobStore::open_in_memory().unwrap();
    let extractor = Arc::new(FakeStructuredExtractor);
    let embeddings = Arc::new(FakeEmbeddingStore::new());
    let targets = vec![SearchTarget {
        site: "acme-board".to_string(),
        search_url: "https://example.com/search".to_string(),
    }];

    let browser1: Box<dyn resumepilot::capabilities::BrowserDriver> = Box::new(driver_with_one_listing());
    let mut controller = PipelineController::new(store, embeddings.clone(), extractor.clone(), browser1, config()).unwrap();
    let first = controller.run(&targets, &profile()).await.unwrap();
    assert_eq!(first.extract.succeeded, 1);

    // Re-open the same store (would be the same on-disk DB in production;
    // here we reuse the controller, which holds the same in-memory store)
    // and run extraction again over an identical listing.
    let second = controller.run(&targets, &profile()).await.unwrap();
    assert_eq!(second.extract.succeeded, 0, "duplicate listing must not be re-inserted");
}
