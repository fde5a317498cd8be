// src/config.rs
//
// =============================================================================
// RESUMEPILOT: TYPED CONFIGURATION
// =============================================================================
//
// The source's nested free-form dictionaries become explicit, strongly
// typed structs here. Every struct rejects unknown keys at load time
// (`deny_unknown_fields`) so a typo in the YAML file is a Programmer
// error (§7), not a silently-ignored setting.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MatcherWeights {
    pub semantic: f64,
    pub skill: f64,
    pub experience: f64,
    pub salary: f64,
    pub industry: f64,
}

impl Default for MatcherWeights {
    fn default() -> Self {
        Self {
            semantic: 0.40,
            skill: 0.30,
            experience: 0.20,
            salary: 0.10,
            industry: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExtractorConfig {
    pub max_pages: usize,
    pub max_click_retries: usize,
    /// Randomized pacing delay between per-card actions, milliseconds.
    pub card_delay_ms_min: u64,
    pub card_delay_ms_max: u64,
    /// Ordered selector strategies, keyed by site tag; consulted in order.
    pub card_selectors: HashMap<String, Vec<String>>,
    pub next_page_selectors: HashMap<String, Vec<String>>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            max_click_retries: 5,
            card_delay_ms_min: 800,
            card_delay_ms_max: 2500,
            card_selectors: HashMap::new(),
            next_page_selectors: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProcessorConfig {
    pub batch_size: usize,
    pub worker_pool_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            worker_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MatcherConfig {
    pub weights: MatcherWeights,
    pub search_top_n_skills: usize,
    pub worker_pool_size: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            weights: MatcherWeights::default(),
            search_top_n_skills: 8,
            worker_pool_size: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SalaryGateTiers {
    pub default_min: f64,
    pub senior_min: f64,
    pub entry_min: f64,
}

impl Default for SalaryGateTiers {
    fn default() -> Self {
        Self {
            default_min: 0.30,
            senior_min: 0.50,
            entry_min: 0.20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DecisionConfig {
    pub salary_gate: SalaryGateTiers,
    pub max_submissions_per_day: u32,
    pub priority_urgent_threshold: f64,
    pub priority_high_threshold: f64,
    pub priority_medium_threshold: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            salary_gate: SalaryGateTiers::default(),
            max_submissions_per_day: 50,
            priority_urgent_threshold: 0.85,
            priority_high_threshold: 0.70,
            priority_medium_threshold: 0.55,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SubmitterConfig {
    pub apply_button_selectors: HashMap<String, Vec<String>>,
    pub suspension_phrases: Vec<String>,
    pub expiration_phrases: Vec<String>,
    pub login_required_phrases: Vec<String>,
    pub applied_indicator_texts: Vec<String>,
    pub disabled_indicator_classes: Vec<String>,
    pub apply_verbs: Vec<String>,
    pub submission_delay_ms_min: u64,
    pub submission_delay_ms_max: u64,
    pub batch_rest_every: usize,
    pub batch_rest_ms_min: u64,
    pub batch_rest_ms_max: u64,
    pub keepalive_probe_interval_ms: u64,
    pub max_click_retries: usize,
    pub dry_run: bool,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            apply_button_selectors: HashMap::new(),
            suspension_phrases: vec!["很抱歉，你选择的职位目前已经暂停招聘".to_string()],
            expiration_phrases: vec!["该职位已过期".to_string(), "职位已下线".to_string()],
            login_required_phrases: vec!["请先登录".to_string()],
            applied_indicator_texts: vec!["已申请".to_string()],
            disabled_indicator_classes: vec!["off".to_string(), "disabled".to_string()],
            apply_verbs: vec!["申请".to_string(), "apply".to_string()],
            submission_delay_ms_min: 3_000,
            submission_delay_ms_max: 8_000,
            batch_rest_every: 10,
            batch_rest_ms_min: 120_000,
            batch_rest_ms_max: 300_000,
            keepalive_probe_interval_ms: 30_000,
            max_click_retries: 5,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ControllerConfig {
    pub checkpoint_interval: u64,
    pub stage_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 20,
            stage_timeout_secs: 3_600,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub processor: ProcessorConfig,
    pub matcher: MatcherConfig,
    pub decision: DecisionConfig,
    pub submitter: SubmitterConfig,
    pub controller: ControllerConfig,
    pub db_path: String,
    pub eventlog_path: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            processor: ProcessorConfig::default(),
            matcher: MatcherConfig::default(),
            decision: DecisionConfig::default(),
            submitter: SubmitterConfig::default(),
            controller: ControllerConfig::default(),
            db_path: "resumepilot.sqlite3".to_string(),
            eventlog_path: "resumepilot.events.log".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads and validates a config file. Unknown keys or malformed YAML
    /// are Programmer errors — fail fast, never defaulted away silently.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {:?}: {}", path, e)))?;
        let cfg: PipelineConfig = serde_yaml::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("invalid config {:?}: {}", path, e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        let w = &self.matcher.weights;
        let sum = w.semantic + w.skill + w.experience + w.salary + w.industry;
        if !(0.0..=1.0001).contains(&sum) || sum < 0.5 {
            return Err(PipelineError::Config(format!(
                "matcher weights must sum to a sane fraction of 1.0, got {}",
                sum
            )));
        }
        if self.processor.worker_pool_size == 0 || self.matcher.worker_pool_size == 0 {
            return Err(PipelineError::Config(
                "worker pool sizes must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let yaml = "max_pages: 5\nbogus_key: true\n";
        let res: Result<ExtractorConfig, _> = serde_yaml::from_str(yaml);
        assert!(res.is_err());
    }

    #[test]
    fn default_weights_match_spec() {
        let w = MatcherWeights::default();
        assert_eq!(w.semantic, 0.40);
        assert_eq!(w.skill, 0.30);
        assert_eq!(w.experience, 0.20);
        assert_eq!(w.salary, 0.10);
    }
}
