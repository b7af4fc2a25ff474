//! Queue API Handlers
//!
//! Delivery endpoints used by runners and by producers that re-enqueue jobs.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use quill_core::dto::queue::{Delivery, EnqueueRequest, LeaseRequest};
use std::time::Duration;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upper bound on deliveries handed out by a single lease call
const MAX_LEASE_BATCH: usize = 100;

/// POST /queue/enqueue
pub async fn enqueue(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<StatusCode> {
    tracing::debug!("Enqueueing job {} (delay {}s)", req.job_id, req.delay_secs);

    if state.store.get(req.job_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Job {} not found", req.job_id)));
    }

    state
        .tasks
        .enqueue(req.job_id, Duration::from_secs(req.delay_secs))
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// POST /queue/lease
pub async fn lease(
    State(state): State<AppState>,
    Json(req): Json<LeaseRequest>,
) -> ApiResult<Json<Vec<Delivery>>> {
    if req.max == 0 {
        return Err(ApiError::BadRequest("max must be greater than 0".to_string()));
    }

    let deliveries = state.deliveries.lease(req.max.min(MAX_LEASE_BATCH)).await?;

    if !deliveries.is_empty() {
        tracing::info!(
            "Leased {} deliveries to runner {}",
            deliveries.len(),
            req.runner_id
        );
    }

    Ok(Json(deliveries))
}

/// POST /queue/{delivery_id}/ack
pub async fn ack(
    State(state): State<AppState>,
    Path(delivery_id): Path<i64>,
) -> ApiResult<StatusCode> {
    tracing::debug!("Acknowledging delivery {}", delivery_id);

    state.deliveries.ack(delivery_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
