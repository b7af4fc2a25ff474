//! Synchronous Generation Handler
//!
//! Runs the whole pipeline inside the request, without the job store or the
//! queue.

use axum::{Json, extract::State};
use quill_core::domain::document::ContentDocument;
use quill_core::domain::request::GenerationRequest;

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /generate
pub async fn generate_sync(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Json<ContentDocument>> {
    tracing::info!("Generating synchronously: {}", request.topic);

    let document = state.pipeline.run(&request).await?;

    tracing::info!(
        "Generated '{}' ({} words, composite {:.1})",
        document.title,
        document.word_count,
        document.scores.composite
    );

    Ok(Json(document))
}
