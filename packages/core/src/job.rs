//! Archive job identity, status and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Number of work steps every archive job performs.
pub const TOTAL_STEPS: u32 = 10;

/// Identifier of the artifact a successful archive job produces.
pub const ARCHIVE_ARTIFACT: &str = "contacts.json";

/// Unique identifier for an archive job, sortable by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an archive job.
///
/// A job starts `InProgress` and moves to `Complete` exactly once, whether it
/// finished its steps or was cancelled. `Complete` never reverts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    InProgress,
    Complete,
}

impl JobStatus {
    /// Check if the job has reached its terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete)
    }

    /// Get a simple status string for display.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::InProgress => "in progress",
            JobStatus::Complete => "complete",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of an archive job, suitable for returning to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    /// Key the job was started for (e.g. a user id).
    pub key: String,
    pub status: JobStatus,
    /// Steps committed so far, between 0 and `total_steps`.
    pub progress: u32,
    pub total_steps: u32,
    /// Artifact identifier; empty unless the job completed successfully.
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Fraction of steps completed, in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.total_steps == 0 {
            return 1.0;
        }
        f64::from(self.progress) / f64::from(self.total_steps)
    }

    /// Whether the job finished without error.
    pub fn succeeded(&self) -> bool {
        self.status.is_terminal() && self.error.is_none()
    }
}
