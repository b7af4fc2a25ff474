//! Job Repository
//!
//! Handles all database operations related to jobs and exposes them as a
//! [`JobStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::domain::job::{Job, JobStatus, JobUpdate, StageSnapshot};
use quill_jobs::{JobFilter, JobStore, StoreError};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str =
    "id, status, request, stages, document, error, attempts, created_at, updated_at";

/// Job store backed by the `jobs` table
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: Job) -> Result<Job, StoreError> {
        create(&self.pool, job).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        find_by_id(&self.pool, id).await
    }

    async fn conditional_update(&self, id: Uuid, update: JobUpdate) -> Result<Job, StoreError> {
        conditional_update(&self.pool, id, update).await
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
        list(&self.pool, filter).await
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Insert a new job; an existing id is reported instead of overwritten
pub async fn create(pool: &PgPool, job: Job) -> Result<Job, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO jobs (id, status, request, stages, document, error, attempts, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(job.id)
    .bind(job.status.as_str())
    .bind(to_json(&job.request)?)
    .bind(to_json(&job.stages)?)
    .bind(job.document.as_ref().map(to_json).transpose()?)
    .bind(job.error.as_ref().map(to_json).transpose()?)
    .bind(job.attempts as i32)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await
    .map_err(backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::AlreadyExists(job.id));
    }

    Ok(job)
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, StoreError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {} FROM jobs WHERE id = $1",
        JOB_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(backend)?;

    row.map(Job::try_from).transpose()
}

/// List jobs, newest first
pub async fn list(pool: &PgPool, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
    let limit = filter.limit.map(|l| l as i64);

    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {}
        FROM jobs
        WHERE ($1::VARCHAR IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
        JOB_COLUMNS
    ))
    .bind(filter.status.map(|s| s.as_str()))
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(backend)?;

    rows.into_iter().map(Job::try_from).collect()
}

/// Apply an update only if the job still has the expected status and attempts
///
/// The guard lives in the `WHERE` clause, so concurrent writers race on a
/// single row update and exactly one of them wins.
pub async fn conditional_update(
    pool: &PgPool,
    id: Uuid,
    update: JobUpdate,
) -> Result<Job, StoreError> {
    update.check_transition()?;

    let appended: Vec<&StageSnapshot> = update.fields.append_stage.iter().collect();

    let row = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        UPDATE jobs
        SET status = $1,
            attempts = COALESCE($2, attempts),
            stages = stages || $3,
            document = COALESCE($4, document),
            error = COALESCE($5, error),
            updated_at = $6
        WHERE id = $7 AND status = $8 AND attempts = $9
        RETURNING {}
        "#,
        JOB_COLUMNS
    ))
    .bind(update.new_status.as_str())
    .bind(update.fields.attempts.map(|a| a as i32))
    .bind(to_json(&appended)?)
    .bind(update.fields.document.as_ref().map(to_json).transpose()?)
    .bind(update.fields.error.as_ref().map(to_json).transpose()?)
    .bind(Utc::now())
    .bind(id)
    .bind(update.expected_status.as_str())
    .bind(update.expected_attempts as i32)
    .fetch_optional(pool)
    .await
    .map_err(backend)?;

    if let Some(row) = row {
        return Job::try_from(row);
    }

    // Nothing matched: either the job is gone or someone else moved it
    let current = find_by_id(pool, id).await?.ok_or(StoreError::NotFound(id))?;
    Err(StoreError::Conflict {
        expected_status: update.expected_status,
        expected_attempts: update.expected_attempts,
        actual_status: current.status,
        actual_attempts: current.attempts,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(backend)
}

fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    column: &str,
) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Backend(format!("invalid {} column: {}", column, e)))
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    status: String,
    request: serde_json::Value,
    stages: serde_json::Value,
    document: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    attempts: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(StoreError::Backend)?;

        Ok(Job {
            id: row.id,
            status,
            request: from_json(row.request, "request")?,
            stages: from_json(row.stages, "stages")?,
            document: row.document.map(|d| from_json(d, "document")).transpose()?,
            error: row.error.map(|e| from_json(e, "error")).transpose()?,
            attempts: row.attempts.max(0) as u32,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::job::JobFailure;
    use quill_core::domain::request::GenerationRequest;
    use quill_core::domain::stage::StageKind;

    fn row(status: &str) -> JobRow {
        let job = Job::new(
            Uuid::new_v4(),
            GenerationRequest::new("Async Rust", vec!["tokio".into()], 500),
        );
        JobRow {
            id: job.id,
            status: status.to_string(),
            request: serde_json::to_value(&job.request).unwrap(),
            stages: serde_json::json!([]),
            document: None,
            error: Some(
                serde_json::to_value(JobFailure {
                    stage: Some(StageKind::Draft),
                    message: "timeout".to_string(),
                    attempts: 2,
                    transient: true,
                })
                .unwrap(),
            ),
            attempts: 2,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }

    #[test]
    fn test_row_converts_to_job() {
        let job = Job::try_from(row("Queued")).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 2);
        assert_eq!(job.request.topic, "Async Rust");
        assert_eq!(job.error.unwrap().stage, Some(StageKind::Draft));
        assert!(job.stages.is_empty());
    }

    #[test]
    fn test_unknown_status_is_a_backend_error() {
        assert!(matches!(
            Job::try_from(row("Running")),
            Err(StoreError::Backend(_))
        ));
    }
}
