use super::retry::{RetryPolicy, RetryState};
use crate::infrastructure::repositories::Artifact;
use std::time::Duration;

/// Tunables for one prefetch run
#[derive(Debug, Clone)]
pub struct PrefetchSettings {
    /// Maximum number of in-flight fetches
    pub concurrency: usize,
    /// Pause after every this many dispatched lines; 0 disables pacing
    pub pacing_every: usize,
    pub batch_pacing_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 3,
            pacing_every: 15,
            batch_pacing_delay: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// A line that survived deduplication and the cache check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLine {
    /// Position in the dispatch order, 1-based
    pub position: usize,
    pub text: String,
    pub key: String,
}

#[derive(Debug)]
pub enum LineStatus {
    Saved(Artifact),
    Failed(String),
}

/// Terminal state of one dispatched line
#[derive(Debug)]
pub struct LineOutcome {
    pub status: LineStatus,
    pub retries: RetryState,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub total_lines: usize,
    /// Lines with nothing speakable left after normalization
    pub blank: usize,
    /// Lines whose cache key was already seen earlier in the run
    pub duplicates: usize,
    /// Lines whose artifact was already on disk
    pub cached: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rate_limited_responses: u32,
    pub server_error_responses: u32,
    pub elapsed: Duration,
}

impl PrefetchReport {
    pub(crate) fn record(&mut self, outcome: &LineOutcome) {
        match outcome.status {
            LineStatus::Saved(_) => self.succeeded += 1,
            LineStatus::Failed(_) => self.failed += 1,
        }
        self.rate_limited_responses += outcome.retries.rate_limited;
        self.server_error_responses += outcome.retries.server_errors;
    }
}
