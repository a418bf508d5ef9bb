use super::cache_key::cache_key;
use super::model::{LineOutcome, LineStatus, PendingLine, PrefetchReport, PrefetchSettings};
use super::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::domain::lines::Line;
use crate::infrastructure::repositories::{
    ArtifactRepository, FailureLogRepository, FetchOutcome, TtsRepository,
};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Drives a prefetch run: filters lines against the artifact store, then
/// fetches the rest with bounded concurrency, retries and pacing.
pub struct PrefetchService {
    tts_repo: Arc<dyn TtsRepository>,
    artifact_repo: Arc<ArtifactRepository>,
    failure_log: Arc<FailureLogRepository>,
    settings: PrefetchSettings,
}

#[derive(Debug, Default)]
struct DispatchPlan {
    pending: Vec<PendingLine>,
    blank: usize,
    duplicates: usize,
    cached: usize,
}

impl PrefetchService {
    pub fn new(
        tts_repo: Arc<dyn TtsRepository>,
        artifact_repo: Arc<ArtifactRepository>,
        failure_log: Arc<FailureLogRepository>,
        mut settings: PrefetchSettings,
    ) -> Self {
        settings.concurrency = settings.concurrency.max(1);
        Self {
            tts_repo,
            artifact_repo,
            failure_log,
            settings,
        }
    }

    /// Process every line to a terminal state and report the totals.
    ///
    /// Lines are admitted in source order; at most `concurrency` of them are
    /// in flight at once, and a retrying line keeps its slot while it waits.
    pub async fn run(&self, lines: Vec<Line>) -> PrefetchReport {
        let started = Instant::now();
        let mut report = PrefetchReport {
            total_lines: lines.len(),
            ..PrefetchReport::default()
        };

        let plan = self.plan(lines).await;
        report.blank = plan.blank;
        report.duplicates = plan.duplicates;
        report.cached = plan.cached;

        tracing::info!(
            total_lines = report.total_lines,
            to_fetch = plan.pending.len(),
            cached = plan.cached,
            duplicates = plan.duplicates,
            blank = plan.blank,
            concurrency = self.settings.concurrency,
            "Prefetch plan ready"
        );

        let worker = LineWorker {
            tts_repo: self.tts_repo.clone(),
            artifact_repo: self.artifact_repo.clone(),
            failure_log: self.failure_log.clone(),
            retry: self.settings.retry.clone(),
            progress: Arc::new(Progress::new(plan.pending.len())),
        };
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks = JoinSet::new();

        for line in plan.pending {
            if self.should_pause(report.dispatched) {
                tracing::info!(
                    dispatched = report.dispatched,
                    pause_secs = self.settings.batch_pacing_delay.as_secs_f64(),
                    "Pacing pause before next batch"
                );
                tokio::time::sleep(self.settings.batch_pacing_delay).await;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "Dispatch semaphore closed, stopping dispatch");
                    break;
                }
            };

            report.dispatched += 1;
            let worker = worker.clone();
            tasks.spawn(async move {
                let outcome = match AssertUnwindSafe(worker.process(&line)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let reason = format!("worker panicked: {}", panic_message(&*payload));
                        let retries = RetryState::default();
                        LineOutcome {
                            status: worker.fail(&line, &retries, reason).await,
                            retries,
                        }
                    }
                };
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Prefetch task aborted");
                    report.failed += 1;
                }
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    /// Deduplicate by cache key and drop lines that are already on disk.
    /// Runs before anything is spawned, so the seen-set has a single owner.
    async fn plan(&self, lines: Vec<Line>) -> DispatchPlan {
        let mut plan = DispatchPlan::default();
        let mut seen: HashSet<String> = HashSet::new();

        for line in lines {
            if line.is_blank() {
                tracing::debug!(raw = ?line.raw, "Skipping blank line");
                plan.blank += 1;
                continue;
            }

            let key = cache_key(&line.text);
            if !seen.insert(key.clone()) {
                tracing::debug!(text = %line.text, key = %key, "Skipping duplicate line");
                plan.duplicates += 1;
                continue;
            }

            if self.artifact_repo.exists(&key).await {
                tracing::debug!(text = %line.text, key = %key, "Already downloaded");
                plan.cached += 1;
                continue;
            }

            plan.pending.push(PendingLine {
                position: plan.pending.len() + 1,
                text: line.text,
                key,
            });
        }

        plan
    }

    fn should_pause(&self, dispatched: usize) -> bool {
        let every = self.settings.pacing_every;
        every > 0
            && dispatched > 0
            && dispatched % every == 0
            && !self.settings.batch_pacing_delay.is_zero()
    }
}

struct Progress {
    total: usize,
    completed: AtomicUsize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Count one finished line, returning (completed, percent)
    fn advance(&self) -> (usize, f64) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = if self.total == 0 {
            100.0
        } else {
            completed as f64 * 100.0 / self.total as f64
        };
        (completed, percent)
    }
}

#[derive(Clone)]
struct LineWorker {
    tts_repo: Arc<dyn TtsRepository>,
    artifact_repo: Arc<ArtifactRepository>,
    failure_log: Arc<FailureLogRepository>,
    retry: RetryPolicy,
    progress: Arc<Progress>,
}

impl LineWorker {
    async fn process(&self, line: &PendingLine) -> LineOutcome {
        let mut retries = RetryState::default();

        loop {
            let wait = match self.tts_repo.fetch(&line.text).await {
                FetchOutcome::Success(audio) => {
                    let status = match self.artifact_repo.write(&line.key, audio).await {
                        Ok(artifact) => {
                            let (completed, percent) = self.progress.advance();
                            tracing::info!(
                                completed,
                                total = self.progress.total,
                                percent = %format!("{:.1}", percent),
                                position = line.position,
                                text = %line.text,
                                key = %artifact.key,
                                size = artifact.size,
                                retries = retries.retries(),
                                "Saved"
                            );
                            LineStatus::Saved(artifact)
                        }
                        Err(e) => {
                            self.fail(line, &retries, format!("failed to store audio: {}", e))
                                .await
                        }
                    };
                    return LineOutcome { status, retries };
                }
                FetchOutcome::RateLimited => {
                    retries.rate_limited += 1;
                    let wait = self.retry.rate_limit_wait(retries.rate_limited);
                    tracing::warn!(
                        position = line.position,
                        text = %line.text,
                        attempt = retries.rate_limited,
                        wait_secs = wait.as_secs_f64(),
                        "Rate limited, waiting before retry"
                    );
                    wait
                }
                FetchOutcome::ServerError(code) => {
                    retries.server_errors += 1;
                    match self.retry.on_server_error(retries.server_errors) {
                        RetryDecision::RetryAfter(wait) => {
                            tracing::warn!(
                                position = line.position,
                                text = %line.text,
                                status = code,
                                attempt = retries.server_errors,
                                wait_secs = wait.as_secs_f64(),
                                "Server error, waiting before retry"
                            );
                            wait
                        }
                        RetryDecision::GiveUp => {
                            let reason = format!(
                                "server error {} persisted after {} attempts",
                                code, retries.server_errors
                            );
                            let status = self.fail(line, &retries, reason).await;
                            return LineOutcome { status, retries };
                        }
                    }
                }
                FetchOutcome::ClientError(code) => {
                    let status = self
                        .fail(line, &retries, format!("HTTP status {}", code))
                        .await;
                    return LineOutcome { status, retries };
                }
                FetchOutcome::NetworkFailure(message) => {
                    let status = self.fail(line, &retries, message).await;
                    return LineOutcome { status, retries };
                }
            };

            tokio::time::sleep(wait).await;
        }
    }

    async fn fail(&self, line: &PendingLine, retries: &RetryState, reason: String) -> LineStatus {
        let (completed, percent) = self.progress.advance();
        tracing::error!(
            completed,
            total = self.progress.total,
            percent = %format!("{:.1}", percent),
            position = line.position,
            text = %line.text,
            retries = retries.retries(),
            reason = %reason,
            "Line failed permanently"
        );

        if let Err(e) = self.failure_log.append(&line.text).await {
            tracing::error!(
                error = %e,
                path = %self.failure_log.path().display(),
                text = %line.text,
                "Could not record failure"
            );
        }

        LineStatus::Failed(reason)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
