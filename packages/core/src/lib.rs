//! Core domain types for the archive job subsystem.
//!
//! This crate contains the plain data shared by the runtime and its callers:
//! - JobId, JobStatus and JobSnapshot for observing archive jobs
//! - CancelCause and ArchiveError for the single failure mode
//! - JobEvent for progress notifications
//! - ArchiverConfig for runtime tuning

mod config;
mod error;
mod events;
mod job;

pub use config::{ArchiverConfig, ConfigError};
pub use error::{ArchiveError, CancelCause};
pub use events::JobEvent;
pub use job::{ARCHIVE_ARTIFACT, JobId, JobSnapshot, JobStatus, TOTAL_STEPS};
