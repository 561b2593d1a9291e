//! Event types for archive job notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Events emitted by archive jobs while they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A job was created and its task launched.
    Started {
        job_id: JobId,
        key: String,
        timestamp: DateTime<Utc>,
    },
    /// A job committed another step.
    Progressed {
        job_id: JobId,
        progress: u32,
        timestamp: DateTime<Utc>,
    },
    /// A job finished all steps.
    Completed {
        job_id: JobId,
        result: String,
        timestamp: DateTime<Utc>,
    },
    /// A job observed cancellation and stopped.
    Cancelled {
        job_id: JobId,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the job this event belongs to.
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Started { job_id, .. }
            | JobEvent::Progressed { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Cancelled { job_id, .. } => *job_id,
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::Started { timestamp, .. }
            | JobEvent::Progressed { timestamp, .. }
            | JobEvent::Completed { timestamp, .. }
            | JobEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this event ends the job's event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed { .. } | JobEvent::Cancelled { .. })
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::Started { job_id, key, .. } => format!("Job {} started for {}", job_id, key),
            JobEvent::Progressed {
                job_id, progress, ..
            } => format!("Job {} at step {}", job_id, progress),
            JobEvent::Completed { job_id, result, .. } => {
                format!("Job {} completed: {}", job_id, result)
            }
            JobEvent::Cancelled { job_id, error, .. } => {
                format!("Job {} cancelled: {}", job_id, error)
            }
        }
    }
}
