//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod generate;
pub mod health;
pub mod job;
pub mod queue;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/jobs", post(job::create_job).get(job::list_jobs))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/status", get(job::get_job_status))
        .route("/jobs/{id}/cancel", post(job::cancel_job))
        .route("/jobs/{id}/update", post(job::update_job))
        // Synchronous generation
        .route("/generate", post(generate::generate_sync))
        // Queue endpoints
        .route("/queue/enqueue", post(queue::enqueue))
        .route("/queue/lease", post(queue::lease))
        .route("/queue/{delivery_id}/ack", post(queue::ack))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use quill_core::domain::job::{Job, JobStatus, JobUpdate};
    use quill_core::domain::request::GenerationRequest;
    use quill_core::domain::stage::StageKind;
    use quill_core::dto::job::{CreateJob, JobStatusView};
    use quill_core::dto::queue::{Delivery, EnqueueRequest, LeaseRequest};
    use quill_jobs::memory::{InMemoryJobStore, InMemoryTaskQueue};
    use quill_pipeline::testing::{SAMPLE_SEO_TITLE, ScriptedProvider};
    use quill_pipeline::{PipelineConfig, StageOrchestrator};
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        router: Router,
        provider: Arc<ScriptedProvider>,
    }

    fn app() -> TestApp {
        let provider = Arc::new(ScriptedProvider::new());
        let config = PipelineConfig {
            retry_backoff_ms: 1,
            max_retry_backoff_ms: 1,
            ..PipelineConfig::default()
        };

        let pipeline = Arc::new(StageOrchestrator::new(provider.clone(), config));
        let state = AppState::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryTaskQueue::default()),
            pipeline,
        );

        TestApp {
            router: create_router(state),
            provider,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("Async Rust", vec!["tokio".into()], 300)
    }

    async fn send<B: Serialize>(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<&B>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).unwrap()
    }

    const NO_BODY: Option<&()> = None;

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app.router, "GET", "/health", NO_BODY).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn test_create_then_poll_job() {
        let app = app();
        let create = CreateJob {
            id: None,
            request: request(),
        };

        let (status, body) = send(&app.router, "POST", "/jobs", Some(&create)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let job: Job = json(&body);
        assert_eq!(job.status, JobStatus::Queued);

        let (status, body) =
            send(&app.router, "GET", &format!("/jobs/{}/status", job.id), NO_BODY).await;
        assert_eq!(status, StatusCode::OK);
        let view: JobStatusView = json(&body);
        assert_eq!(view.status, JobStatus::Queued);
        assert!(view.stages.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_job_request_is_rejected() {
        let app = app();
        let mut create = CreateJob {
            id: None,
            request: request(),
        };
        create.request.topic = String::new();

        let (status, body) = send(&app.router, "POST", "/jobs", Some(&create)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: serde_json::Value = json(&body);
        assert!(error["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let app = app();
        let (status, _) = send(
            &app.router,
            "GET",
            &format!("/jobs/{}", Uuid::new_v4()),
            NO_BODY,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_and_list_by_status() {
        let app = app();
        let create = CreateJob {
            id: None,
            request: request(),
        };
        let (_, body) = send(&app.router, "POST", "/jobs", Some(&create)).await;
        let job: Job = json(&body);
        send(&app.router, "POST", "/jobs", Some(&create)).await;

        let (status, body) =
            send(&app.router, "POST", &format!("/jobs/{}/cancel", job.id), NO_BODY).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json::<Job>(&body).status, JobStatus::Cancelled);

        let (_, body) = send(&app.router, "GET", "/jobs?status=Cancelled", NO_BODY).await;
        let cancelled: Vec<serde_json::Value> = json(&body);
        assert_eq!(cancelled.len(), 1);

        let (_, body) = send(&app.router, "GET", "/jobs", NO_BODY).await;
        assert_eq!(json::<Vec<serde_json::Value>>(&body).len(), 2);
    }

    #[tokio::test]
    async fn test_stale_update_is_409() {
        let app = app();
        let create = CreateJob {
            id: None,
            request: request(),
        };
        let (_, body) = send(&app.router, "POST", "/jobs", Some(&create)).await;
        let job: Job = json(&body);
        let uri = format!("/jobs/{}/update", job.id);

        let (status, body) = send(&app.router, "POST", &uri, Some(&JobUpdate::claim(0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json::<Job>(&body).attempts, 1);

        let (status, _) = send(&app.router, "POST", &uri, Some(&JobUpdate::claim(0))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_lease_and_ack_deliveries() {
        let app = app();
        let create = CreateJob {
            id: None,
            request: request(),
        };
        let (_, body) = send(&app.router, "POST", "/jobs", Some(&create)).await;
        let job: Job = json(&body);

        let lease = LeaseRequest {
            runner_id: "runner-1".to_string(),
            max: 10,
        };
        let (status, body) = send(&app.router, "POST", "/queue/lease", Some(&lease)).await;
        assert_eq!(status, StatusCode::OK);
        let deliveries: Vec<Delivery> = json(&body);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].job_id, job.id);

        let ack = format!("/queue/{}/ack", deliveries[0].id);
        let (status, _) = send(&app.router, "POST", &ack, NO_BODY).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app.router, "POST", &ack, NO_BODY).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_enqueue_unknown_job_is_404() {
        let app = app();
        let req = EnqueueRequest {
            job_id: Uuid::new_v4(),
            delay_secs: 0,
        };
        let (status, _) = send(&app.router, "POST", "/queue/enqueue", Some(&req)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_sync() {
        let app = app();
        let (status, body) = send(&app.router, "POST", "/generate", Some(&request())).await;
        assert_eq!(status, StatusCode::OK);

        let document: serde_json::Value = json(&body);
        assert_eq!(document["title"], SAMPLE_SEO_TITLE);
        assert!(app.provider.total_calls() >= 3);
    }

    #[tokio::test]
    async fn test_generate_sync_reports_provider_failure() {
        let app = app();
        app.provider.fail_times(StageKind::Draft, 1, false);

        let (status, body) = send(&app.router, "POST", "/generate", Some(&request())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let error: serde_json::Value = json(&body);
        assert!(error["error"].as_str().unwrap().contains("draft"));
    }
}
