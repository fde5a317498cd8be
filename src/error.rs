// src/error.rs
//
// =============================================================================
// RESUMEPILOT: ERROR TAXONOMY
// =============================================================================
//
// Closed set of error kinds, classified by recovery policy rather than by
// origin (§7). Stage code returns `anyhow::Result` at its public boundary
// (matching the rest of the pipeline's style) but constructs and matches
// these variants internally to decide what to do next.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network/timeout/driver-disconnect class. Retry with exponential
    /// backoff up to 3 attempts before escalating.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Site detected and is throttling/blocking us.
    #[error("rate limited or blocked: {0}")]
    RateLimited(String),

    /// Login session expired mid-batch; the caller should attempt one
    /// re-login and otherwise terminate the batch gracefully.
    #[error("session expired, login required: {0}")]
    SessionExpired(String),

    /// A single record (job/match) could not be processed; caller should
    /// log, skip, and continue. Never propagates past a stage boundary.
    #[error("per-record failure for {record_id}: {reason}")]
    PerRecord { record_id: String, reason: String },

    /// An integrity invariant was violated (terminal log without a
    /// processed match, or vice versa). Repaired on next startup.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Invalid configuration or a missing required field. Fails fast at
    /// construction; never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Propagated data-layer failure that isn't a uniqueness violation
    /// (those are converted to a business signal, not an error).
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl PipelineError {
    /// Whether this kind is safe to retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Transient(_) | PipelineError::RateLimited(_)
        )
    }
}
