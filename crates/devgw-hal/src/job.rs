//! Job identifiers and outcomes.
//!
//! Jobs are synchronous from the client's point of view: a request either
//! returns counts or fails.
//!
//! ```text
//!   CallJob ──→ Success { counts, "job is succeeded" }
//!           └─→ Failure { message }
//! ```

use serde::{Deserialize, Serialize};

use crate::result::Counts;

/// Message returned with every successful job.
pub const SUCCESS_MESSAGE: &str = "job is succeeded";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Outcome of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    Failure,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

/// What a client gets back for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Counts keyed by classical-bit bitstring; empty on failure.
    pub counts: Counts,
    pub message: String,
}

impl JobResult {
    pub fn success(job_id: JobId, counts: Counts) -> Self {
        Self {
            job_id,
            status: JobStatus::Success,
            counts,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failure(job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Failure,
            counts: Counts::new(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}
