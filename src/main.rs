// src/main.rs
//
// =============================================================================
// RESUMEPILOT: COMMANDER & ENTRY POINT
// =============================================================================
//
// Wiring center: loads config + resume profile, builds the three
// external capabilities, and drives the Controller. Modeled on the
// orchestrator's `Cli`/`Commands` clap structure and its `env_logger`
// init pattern.
//
// The browser driver, structured extractor, and embedding store are
// Non-goals of this crate (hexagonal ports only, §1) — production
// deployments inject real implementations from outside this crate.
// What's wired here are the in-memory fakes, so `run`/`resume` work
// end-to-end out of the box against a self-contained demo search
// target; swap `build_capabilities` for real adapters to go live.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resumepilot::capabilities::fakes::{FakeBrowserDriver, FakeEmbeddingStore, FakeStructuredExtractor};
use resumepilot::capabilities::{BrowserDriver, EmbeddingStore, StructuredExtractor};
use resumepilot::config::PipelineConfig;
use resumepilot::controller::{PipelineController, SearchTarget};
use resumepilot::core::ResumeProfile;
use resumepilot::store::JobStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser)]
#[command(name = "resumepilot", version, about = "Resume-matching job application pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline once: Extract -> Process -> Match -> Decide -> Submit.
    Run {
        /// Path to the pipeline config YAML.
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,

        /// Path to the resume profile YAML.
        #[arg(long, default_value = "profile.yaml")]
        profile: PathBuf,

        /// site=url pairs to search, e.g. "acme-board=https://example.com/search".
        #[arg(long = "target", num_args = 0..)]
        targets: Vec<String>,
    },

    /// Resume a previously interrupted run: skips Extract, drains whatever
    /// backlog already exists in the store.
    Resume {
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,

        #[arg(long, default_value = "profile.yaml")]
        profile: PathBuf,
    },

    /// Liveness probe: confirms the store and event log are reachable.
    HealthCheck {
        #[arg(long, default_value = "config.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Run { config, profile, targets } => run_pipeline(config, profile, targets).await,
        Commands::Resume { config, profile } => run_pipeline(config, profile, Vec::new()).await,
        Commands::HealthCheck { config } => run_health_check(config).await,
    };
    std::process::exit(code);
}

fn load_config(path: &PathBuf) -> Result<PipelineConfig> {
    if path.exists() {
        PipelineConfig::load(path).context("loading pipeline config")
    } else {
        log::warn!("config file {:?} not found, using defaults", path);
        Ok(PipelineConfig::default())
    }
}

fn load_profile(path: &PathBuf) -> Result<ResumeProfile> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading resume profile {:?}", path))?;
    serde_yaml::from_str(&raw).context("parsing resume profile")
}

fn parse_targets(raw: &[String]) -> Vec<SearchTarget> {
    raw.iter()
        .filter_map(|t| {
            let (site, url) = t.split_once('=')?;
            Some(SearchTarget { site: site.to_string(), search_url: url.to_string() })
        })
        .collect()
}

fn build_capabilities() -> (Box<dyn BrowserDriver>, Arc<dyn StructuredExtractor>, Arc<dyn EmbeddingStore>) {
    (
        Box::new(FakeBrowserDriver::new()),
        Arc::new(FakeStructuredExtractor),
        Arc::new(FakeEmbeddingStore::new()),
    )
}

/// Exit codes per §7: 0 every stage succeeded, 1 the pipeline ran to
/// completion but one or more stages reported a failure, 2 a fatal abort
/// (config/store/setup error) before or during the run.
async fn run_pipeline(config_path: PathBuf, profile_path: PathBuf, raw_targets: Vec<String>) -> i32 {
    let outcome: Result<resumepilot::report::ExecutionReport> = async {
        let config = load_config(&config_path)?;
        let profile = load_profile(&profile_path)?;
        let targets = parse_targets(&raw_targets);

        let store = JobStore::open(&config.db_path).context("opening job store")?;
        let (browser, extractor, embeddings) = build_capabilities();

        let mut controller = PipelineController::new(store, embeddings, extractor, browser, config)?;
        let cancel = controller.cancellation_token();

        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            log::warn!("interrupt received, finishing current stage then stopping");
            cancel.cancel();
        });

        controller.run(&targets, &profile).await
    }
    .await;

    match outcome {
        Ok(report) => {
            log::info!(
                "run complete: {}",
                serde_json::to_string_pretty(&report).unwrap_or_default()
            );
            if report.had_any_failure() {
                log::warn!("one or more stages recorded an error; see report for details");
                1
            } else {
                0
            }
        }
        Err(e) => {
            log::error!("pipeline aborted: {e:#}");
            2
        }
    }
}

async fn run_health_check(config_path: PathBuf) -> i32 {
    let outcome: Result<serde_json::Value> = async {
        let config = load_config(&config_path)?;
        let store = JobStore::open(&config.db_path).context("opening job store")?;
        let (browser, extractor, embeddings) = build_capabilities();
        let controller = PipelineController::new(store, embeddings, extractor, browser, config)?;
        controller.health_check()
    }
    .await;

    match outcome {
        Ok(status) => {
            println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
            0
        }
        Err(e) => {
            log::error!("health check failed: {e:#}");
            2
        }
    }
}
