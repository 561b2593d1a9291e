//! Keyed registry that launches archive jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use archive_core::{ArchiverConfig, JobEvent};
use chrono::Utc;
use tokio::sync::broadcast;

use crate::context::CancelContext;
use crate::job::{ArchiveJob, JobHandle};
use crate::sleeper::{Sleeper, TokioSleeper};

/// Starts archive jobs and remembers the latest one per key.
///
/// Construct one at startup and share it (e.g. behind an `Arc`) with whatever
/// needs to start or look up jobs. Job tasks are detached: the archiver never
/// joins them, and a job whose key is reused keeps running until it finishes.
pub struct Archiver {
    jobs: Mutex<HashMap<String, JobHandle>>,
    sleeper: Arc<dyn Sleeper>,
    config: ArchiverConfig,
    event_tx: broadcast::Sender<JobEvent>,
}

impl Archiver {
    /// Create an archiver whose jobs sleep in real time.
    pub fn new(config: ArchiverConfig) -> Self {
        Self::with_sleeper(config, TokioSleeper)
    }

    /// Create an archiver that delays each step through `sleeper`.
    pub fn with_sleeper(config: ArchiverConfig, sleeper: impl Sleeper) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            jobs: Mutex::new(HashMap::new()),
            sleeper: Arc::new(sleeper),
            config,
            event_tx,
        }
    }

    /// Configuration every job started here runs with.
    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Start a new job for `key` and return its handle without waiting.
    ///
    /// Replaces any job previously stored under `key`. The job stops early if
    /// `ctx` is cancelled. Must be called from within a tokio runtime.
    pub fn start(&self, ctx: &CancelContext, key: impl Into<String>) -> JobHandle {
        let key = key.into();
        let job = Arc::new(ArchiveJob::new(key.clone(), Some(self.event_tx.clone())));

        {
            let mut jobs = self.lock_jobs();
            if let Some(previous) = jobs.insert(key.clone(), job.clone())
                && !previous.status().is_terminal()
            {
                tracing::debug!(
                    key = %key,
                    previous = %previous.id(),
                    "Replacing archive job that is still running"
                );
            }
        }

        job.publish(JobEvent::Started {
            job_id: job.id(),
            key,
            timestamp: Utc::now(),
        });

        tokio::spawn(job.clone().run(
            ctx.clone(),
            self.sleeper.clone(),
            self.config.max_step_delay,
        ));

        job
    }

    /// Get the latest job started for `key`.
    pub fn lookup(&self, key: &str) -> Option<JobHandle> {
        self.lock_jobs().get(key).cloned()
    }

    /// List all keys that have a job, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock_jobs().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of keys with a job.
    pub fn len(&self) -> usize {
        self.lock_jobs().len()
    }

    /// Whether no job has been started yet.
    pub fn is_empty(&self) -> bool {
        self.lock_jobs().is_empty()
    }

    /// Subscribe to events from every job this archiver starts.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<String, JobHandle>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(ArchiverConfig::default())
    }
}
