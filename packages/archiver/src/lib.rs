//! Asynchronous archive jobs with observable progress.
//!
//! This crate runs archive jobs on the tokio runtime and lets any number of
//! observers poll or await them while they run.
//!
//! # Architecture
//!
//! - `Archiver` - Registry that starts jobs and maps each key to its latest job
//! - `ArchiveJob` - One running job: progress counter, terminal outcome, completion signal
//! - `CancelContext` - Caller-owned cancellation with a cause, checked between steps
//! - `Sleeper` - Injectable delay used for each simulated work step
//!
//! # Usage
//!
//! ```ignore
//! use archiver::{Archiver, CancelContext};
//! use archive_core::ArchiverConfig;
//!
//! let archiver = Archiver::new(ArchiverConfig::default());
//! let job = archiver.start(&CancelContext::background(), "user-1");
//! job.wait().await;
//! assert_eq!(job.result(), "contacts.json");
//! ```

mod context;
mod job;
mod registry;
mod sleeper;

pub use context::CancelContext;
pub use job::{ABORTED_REASON, ArchiveJob, JobHandle};
pub use registry::Archiver;
pub use sleeper::{FnSleeper, SleepFuture, Sleeper, TokioSleeper};

/// Re-export core types for convenience.
pub use archive_core::{
    ARCHIVE_ARTIFACT, ArchiveError, ArchiverConfig, CancelCause, JobEvent, JobId, JobSnapshot,
    JobStatus, TOTAL_STEPS,
};
