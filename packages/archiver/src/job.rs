//! A single archive job and its observable state.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use archive_core::{
    ARCHIVE_ARTIFACT, ArchiveError, CancelCause, JobEvent, JobId, JobSnapshot, JobStatus,
    TOTAL_STEPS,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{broadcast, watch};

use crate::context::CancelContext;
use crate::sleeper::Sleeper;

/// Shared handle to a running or finished job.
pub type JobHandle = Arc<ArchiveJob>;

/// Cause recorded when a job's task unwinds or is dropped before finishing.
pub const ABORTED_REASON: &str = "archive task aborted";

/// Outcome fields, written once when the job completes.
#[derive(Debug, Default)]
struct JobState {
    status: JobStatus,
    result: String,
    error: Option<ArchiveError>,
    completed_at: Option<DateTime<Utc>>,
}

/// One archive job.
///
/// The job is mutated only by its own task. Observers read progress through
/// an atomic counter and the outcome through a per-job lock, so they can poll
/// from any thread while the job runs.
#[derive(Debug)]
pub struct ArchiveJob {
    id: JobId,
    key: String,
    started_at: DateTime<Utc>,
    progress: AtomicU32,
    state: Mutex<JobState>,
    /// Flips to `true` exactly once, while `state` is locked.
    done: watch::Sender<bool>,
    events: Option<broadcast::Sender<JobEvent>>,
}

impl ArchiveJob {
    pub(crate) fn new(key: impl Into<String>, events: Option<broadcast::Sender<JobEvent>>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            id: JobId::new(),
            key: key.into(),
            started_at: Utc::now(),
            progress: AtomicU32::new(0),
            state: Mutex::new(JobState::default()),
            done,
            events,
        }
    }

    /// Execute the job's steps until they finish or `ctx` is cancelled.
    ///
    /// Cancellation is checked before every step; a cancel that lands while a
    /// step is sleeping is seen at the next check.
    pub(crate) async fn run(
        self: Arc<Self>,
        ctx: CancelContext,
        sleeper: Arc<dyn Sleeper>,
        max_step_delay: Duration,
    ) {
        tracing::info!(job_id = %self.id, key = %self.key, "Archive job started");
        let _guard = AbortGuard(&*self);

        for _ in 0..TOTAL_STEPS {
            if ctx.is_cancelled() {
                let cause = ctx.cause().unwrap_or(CancelCause::Canceled);
                self.fail(ArchiveError::Cancelled(cause));
                return;
            }

            sleeper.sleep(step_delay(max_step_delay)).await;

            let progress = self.progress.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(job_id = %self.id, progress, "Archive job progress");
            self.publish(JobEvent::Progressed {
                job_id: self.id,
                progress,
                timestamp: Utc::now(),
            });
        }

        self.complete(ARCHIVE_ARTIFACT);
    }

    fn complete(&self, artifact: &str) {
        if !self.finish(Ok(artifact.to_string())) {
            return;
        }
        tracing::info!(job_id = %self.id, result = artifact, "Archive job finished");
        self.publish(JobEvent::Completed {
            job_id: self.id,
            result: artifact.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn fail(&self, error: ArchiveError) {
        let message = error.to_string();
        if !self.finish(Err(error)) {
            return;
        }
        tracing::warn!(job_id = %self.id, error = %message, "Archive job failed");
        self.publish(JobEvent::Cancelled {
            job_id: self.id,
            error: message,
            timestamp: Utc::now(),
        });
    }

    /// Commit the outcome and fire the completion signal. Returns `false` if
    /// the job had already completed.
    fn finish(&self, outcome: Result<String, ArchiveError>) -> bool {
        let mut state = self.lock_state();
        if state.status.is_terminal() {
            return false;
        }
        match outcome {
            Ok(result) => state.result = result,
            Err(error) => state.error = Some(error),
        }
        state.status = JobStatus::Complete;
        state.completed_at = Some(Utc::now());
        self.done.send_replace(true);
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, event: JobEvent) {
        tracing::trace!("{}", event.description());
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    /// Wait until the job completes. Returns immediately if it already has.
    ///
    /// Any number of callers may wait at once; all are released together.
    /// Returning says nothing about success: check [`ArchiveJob::error`].
    pub async fn wait(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Non-blocking check of the completion signal.
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// Unique id of this job.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Key the job was started for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// When the job was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Steps committed so far, between 0 and [`TOTAL_STEPS`].
    pub fn progress(&self) -> u32 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Current lifecycle status; `Complete` once the completion signal fired.
    pub fn status(&self) -> JobStatus {
        self.lock_state().status
    }

    /// The produced artifact, or an empty string until the job succeeds.
    pub fn result(&self) -> String {
        self.lock_state().result.clone()
    }

    /// The failure, if the job was cancelled. `None` while running.
    pub fn error(&self) -> Option<ArchiveError> {
        self.lock_state().error.clone()
    }

    /// When the job completed, or `None` while it runs.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.lock_state().completed_at
    }

    /// Read the whole job state at once.
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.lock_state();
        JobSnapshot {
            id: self.id,
            key: self.key.clone(),
            status: state.status,
            progress: self.progress(),
            total_steps: TOTAL_STEPS,
            result: state.result.clone(),
            error: state.error.as_ref().map(ToString::to_string),
            started_at: self.started_at(),
            completed_at: state.completed_at,
        }
    }
}

/// Completes the job with an error if `run` exits without committing an
/// outcome (a panicking step or a dropped task). A no-op after `finish`.
struct AbortGuard<'a>(&'a ArchiveJob);

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if self.0.is_done() {
            return;
        }
        self.0.fail(ArchiveError::Cancelled(CancelCause::Reason(
            ABORTED_REASON.to_string(),
        )));
    }
}

/// Pick the simulated latency of one step, uniformly in `[0, max)`.
fn step_delay(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::sleeper::{FnSleeper, SleepFuture};

    fn counting_sleeper(calls: Arc<AtomicUsize>) -> Arc<dyn Sleeper> {
        Arc::new(FnSleeper::new(move |_| -> SleepFuture {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }))
    }

    #[test]
    fn step_delay_stays_below_max() {
        assert_eq!(step_delay(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(step_delay(Duration::from_millis(5)) < Duration::from_millis(5));
        }
    }

    #[test]
    fn new_job_is_in_progress() {
        let job = ArchiveJob::new("u1", None);
        assert_eq!(job.status(), JobStatus::InProgress);
        assert_eq!(job.progress(), 0);
        assert_eq!(job.result(), "");
        assert_eq!(job.error(), None);
        assert_eq!(job.completed_at(), None);
        assert!(!job.is_done());
    }

    #[tokio::test]
    async fn run_to_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(ArchiveJob::new("u1", None));

        job.clone()
            .run(
                CancelContext::background(),
                counting_sleeper(calls.clone()),
                Duration::from_secs(5),
            )
            .await;

        assert!(job.is_done());
        assert_eq!(job.progress(), TOTAL_STEPS);
        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.result(), ARCHIVE_ARTIFACT);
        assert_eq!(job.error(), None);
        assert!(job.completed_at().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn run_with_cancelled_context_does_no_steps() {
        let calls = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(ArchiveJob::new("u1", None));
        let ctx = CancelContext::background();
        ctx.cancel();

        job.clone()
            .run(ctx, counting_sleeper(calls.clone()), Duration::ZERO)
            .await;

        assert_eq!(job.progress(), 0);
        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.result(), "");
        assert_eq!(
            job.error().as_ref().map(ArchiveError::cause),
            Some(&CancelCause::Canceled)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn outcome_is_written_once() {
        let job = ArchiveJob::new("u1", None);
        job.complete(ARCHIVE_ARTIFACT);
        job.fail(ArchiveError::Cancelled(CancelCause::Canceled));

        assert_eq!(job.result(), ARCHIVE_ARTIFACT);
        assert_eq!(job.error(), None);
    }

    #[tokio::test]
    async fn wait_after_completion_returns_immediately() {
        let job = ArchiveJob::new("u1", None);
        job.complete(ARCHIVE_ARTIFACT);

        job.wait().await;
        job.wait().await;

        assert!(job.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_run_completes_with_error() {
        let job = Arc::new(ArchiveJob::new("u1", None));
        let stalled: Arc<dyn Sleeper> = Arc::new(FnSleeper::new(|_| -> SleepFuture {
            Box::pin(std::future::pending::<()>())
        }));

        let run = job
            .clone()
            .run(CancelContext::background(), stalled, Duration::ZERO);
        let timed_out = tokio::time::timeout(Duration::from_millis(10), run).await;

        assert!(timed_out.is_err());
        assert!(job.is_done());
        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.result(), "");
        assert_eq!(
            job.error().map(|e| e.cause().clone()),
            Some(CancelCause::Reason(ABORTED_REASON.to_string()))
        );
    }
}
