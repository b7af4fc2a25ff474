//! Job domain types
//!
//! A job tracks one generation request through the asynchronous path. Its
//! status follows a small state machine:
//!
//! ```text
//! Pending -> Queued -> Processing -> Completed | Failed
//!    \          \           \
//!     +----------+-----------+--> Cancelled
//! ```
//!
//! `Processing -> Queued` is the re-enqueue edge taken when a transient
//! failure leaves attempts in the budget. Terminal states are absorbing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::document::ContentDocument;
use crate::domain::request::GenerationRequest;
use crate::domain::stage::{StageKind, StageResult};

/// Job record
///
/// Structure shared between orchestrator (persists) and runner (updates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub request: GenerationRequest,
    #[serde(default)]
    pub stages: Vec<StageSnapshot>,
    pub document: Option<ContentDocument>,
    pub error: Option<JobFailure>,
    /// Number of times a worker claimed the job for processing
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// Structured error exposed by a failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Stage that failed, if the failure came from the pipeline
    pub stage: Option<StageKind>,
    pub message: String,
    pub attempts: u32,
    /// Whether the last error was classified transient
    pub transient: bool,
}

/// A stage result recorded on the job for progress visibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Job attempt during which the stage ran
    pub attempt: u32,
    pub result: StageResult,
    pub recorded_at: DateTime<Utc>,
}

/// Conditional update applied by the job store
///
/// The update only applies when the job currently has `expected_status`
/// and `expected_attempts`; otherwise the store reports a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub expected_status: JobStatus,
    pub expected_attempts: u32,
    pub new_status: JobStatus,
    #[serde(default)]
    pub fields: JobFields,
}

/// Optional fields written together with a status change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFields {
    #[serde(default)]
    pub attempts: Option<u32>,
    #[serde(default)]
    pub append_stage: Option<StageSnapshot>,
    #[serde(default)]
    pub document: Option<ContentDocument>,
    #[serde(default)]
    pub error: Option<JobFailure>,
}

/// Why a job update was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateRejected {
    #[error("job is {actual_status:?} (attempts {actual_attempts}), expected {expected_status:?} (attempts {expected_attempts})")]
    Conflict {
        expected_status: JobStatus,
        expected_attempts: u32,
        actual_status: JobStatus,
        actual_attempts: u32,
    },

    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    #[error("attempt counter cannot go from {from} to {to}")]
    AttemptsRegressed { from: u32, to: u32 },
}

impl JobStatus {
    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether an explicit cancellation may move the job to `Cancelled`
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::Queued | JobStatus::Processing
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// `Processing -> Processing` records stage progress without changing state.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, next),
            (Pending, Queued)
                | (Pending, Cancelled)
                | (Queued, Processing)
                | (Queued, Cancelled)
                | (Processing, Processing)
                | (Processing, Queued)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Queued => "Queued",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(JobStatus::Pending),
            "Queued" => Ok(JobStatus::Queued),
            "Processing" => Ok(JobStatus::Processing),
            "Completed" => Ok(JobStatus::Completed),
            "Failed" => Ok(JobStatus::Failed),
            "Cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

impl Job {
    /// Creates a new job record in `Pending`
    pub fn new(id: Uuid, request: GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            request,
            stages: Vec::new(),
            document: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks an update against the current state without applying it
    pub fn check_update(&self, update: &JobUpdate) -> Result<(), UpdateRejected> {
        update.check_transition()?;

        if self.status != update.expected_status || self.attempts != update.expected_attempts {
            return Err(UpdateRejected::Conflict {
                expected_status: update.expected_status,
                expected_attempts: update.expected_attempts,
                actual_status: self.status,
                actual_attempts: self.attempts,
            });
        }

        Ok(())
    }

    /// Applies a conditional update in place
    pub fn apply_update(
        &mut self,
        update: JobUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), UpdateRejected> {
        self.check_update(&update)?;

        self.status = update.new_status;
        if let Some(attempts) = update.fields.attempts {
            self.attempts = attempts;
        }
        if let Some(snapshot) = update.fields.append_stage {
            self.stages.push(snapshot);
        }
        if let Some(document) = update.fields.document {
            self.document = Some(document);
        }
        if let Some(error) = update.fields.error {
            self.error = Some(error);
        }
        self.updated_at = now;

        Ok(())
    }
}

impl JobUpdate {
    /// Checks the parts of an update that do not depend on the stored job
    pub fn check_transition(&self) -> Result<(), UpdateRejected> {
        if !self.expected_status.can_transition_to(self.new_status) {
            return Err(UpdateRejected::IllegalTransition {
                from: self.expected_status,
                to: self.new_status,
            });
        }

        if let Some(attempts) = self.fields.attempts {
            if attempts < self.expected_attempts {
                return Err(UpdateRejected::AttemptsRegressed {
                    from: self.expected_attempts,
                    to: attempts,
                });
            }
        }

        Ok(())
    }

    /// Plain status change
    pub fn transition(from: JobStatus, attempts: u32, to: JobStatus) -> Self {
        Self {
            expected_status: from,
            expected_attempts: attempts,
            new_status: to,
            fields: JobFields::default(),
        }
    }

    /// Atomic claim: `Queued` with the observed attempt counter becomes
    /// `Processing` with the counter incremented
    pub fn claim(observed_attempts: u32) -> Self {
        Self {
            expected_status: JobStatus::Queued,
            expected_attempts: observed_attempts,
            new_status: JobStatus::Processing,
            fields: JobFields {
                attempts: Some(observed_attempts + 1),
                ..Default::default()
            },
        }
    }

    /// Records a finished stage while the job stays in `Processing`
    pub fn record_stage(attempt: u32, result: StageResult) -> Self {
        Self {
            expected_status: JobStatus::Processing,
            expected_attempts: attempt,
            new_status: JobStatus::Processing,
            fields: JobFields {
                append_stage: Some(StageSnapshot {
                    attempt,
                    result,
                    recorded_at: Utc::now(),
                }),
                ..Default::default()
            },
        }
    }

    pub fn complete(attempt: u32, document: ContentDocument) -> Self {
        Self {
            expected_status: JobStatus::Processing,
            expected_attempts: attempt,
            new_status: JobStatus::Completed,
            fields: JobFields {
                document: Some(document),
                ..Default::default()
            },
        }
    }

    pub fn fail(attempt: u32, failure: JobFailure) -> Self {
        Self {
            expected_status: JobStatus::Processing,
            expected_attempts: attempt,
            new_status: JobStatus::Failed,
            fields: JobFields {
                error: Some(failure),
                ..Default::default()
            },
        }
    }

    /// Re-enqueue edge after a transient failure; the last error is kept
    /// for visibility until the job finishes
    pub fn requeue(attempt: u32, failure: JobFailure) -> Self {
        Self {
            expected_status: JobStatus::Processing,
            expected_attempts: attempt,
            new_status: JobStatus::Queued,
            fields: JobFields {
                error: Some(failure),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::GenerationRequest;

    fn job() -> Job {
        Job::new(
            Uuid::new_v4(),
            GenerationRequest::new("Topic", vec!["rust".into()], 500),
        )
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_cancel_allowed_from_non_terminal_states() {
        for status in [JobStatus::Pending, JobStatus::Queued, JobStatus::Processing] {
            assert!(status.is_cancellable());
            assert!(status.can_transition_to(JobStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in [
                JobStatus::Pending,
                JobStatus::Queued,
                JobStatus::Processing,
                JobStatus::Completed,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_completed_to_processing_rejected() {
        let mut job = job();
        job.status = JobStatus::Completed;
        job.attempts = 1;

        let update = JobUpdate::transition(JobStatus::Completed, 1, JobStatus::Processing);
        assert!(matches!(
            job.apply_update(update, Utc::now()),
            Err(UpdateRejected::IllegalTransition { .. })
        ));
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_claim_increments_attempts() {
        let mut job = job();
        job.status = JobStatus::Queued;

        job.apply_update(JobUpdate::claim(0), Utc::now()).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn test_stale_claim_conflicts() {
        let mut job = job();
        job.status = JobStatus::Queued;
        job.apply_update(JobUpdate::claim(0), Utc::now()).unwrap();

        let err = job.apply_update(JobUpdate::claim(0), Utc::now()).unwrap_err();
        assert!(matches!(err, UpdateRejected::Conflict { .. }));
    }

    #[test]
    fn test_attempts_cannot_regress() {
        let mut job = job();
        job.status = JobStatus::Processing;
        job.attempts = 2;

        let mut update = JobUpdate::transition(JobStatus::Processing, 2, JobStatus::Queued);
        update.fields.attempts = Some(1);
        assert!(matches!(
            job.check_update(&update),
            Err(UpdateRejected::AttemptsRegressed { .. })
        ));
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [JobStatus::Pending, JobStatus::Processing, JobStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("Running".parse::<JobStatus>().is_err());
    }
}
