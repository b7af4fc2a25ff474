//! Job API Handlers
//!
//! HTTP endpoints for the asynchronous job lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use quill_core::domain::job::{Job, JobStatus, JobUpdate};
use quill_core::dto::job::{CreateJob, JobStatusView, JobSummary};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::state::AppState;

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /jobs
/// Create a job and put it on the queue
pub async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    tracing::info!("Creating job for topic: {}", req.request.topic);

    let job = state.jobs.create_job(req).await?;

    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /jobs
/// List jobs, newest first
///
/// Query parameters:
/// - `status` (optional): only jobs in this status
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    tracing::debug!("Listing jobs (status: {:?})", params.status);

    let jobs = state.jobs.list_jobs(params.status).await?;

    Ok(Json(jobs))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
}

/// GET /jobs/{id}
/// Full job record
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = state.jobs.get_job(id).await?;

    Ok(Json(job))
}

/// GET /jobs/{id}/status
/// Status, stage progress and result or error
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobStatusView>> {
    tracing::debug!("Getting status of job: {}", id);

    let view = state.jobs.get_job_status(id).await?;

    Ok(Json(view))
}

/// POST /jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    tracing::info!("Cancelling job: {}", id);

    let job = state.jobs.cancel_job(id).await?;

    Ok(Json(job))
}

// =============================================================================
// Runner Endpoints
// =============================================================================

/// POST /jobs/{id}/update
/// Conditional update used by runners; answers 409 when the job moved on
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<JobUpdate>,
) -> ApiResult<Json<Job>> {
    tracing::debug!(
        "Updating job {}: {} -> {}",
        id,
        update.expected_status,
        update.new_status
    );

    let job = state.store.conditional_update(id, update).await?;

    Ok(Json(job))
}
