//! Shared handler state

use quill_jobs::{DeliverySource, JobService, JobStore, TaskQueue};
use quill_pipeline::StageOrchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobService,
    pub store: Arc<dyn JobStore>,
    pub tasks: Arc<dyn TaskQueue>,
    pub deliveries: Arc<dyn DeliverySource>,
    pub pipeline: Arc<StageOrchestrator>,
}

impl AppState {
    pub fn new<Q>(store: Arc<dyn JobStore>, queue: Arc<Q>, pipeline: Arc<StageOrchestrator>) -> Self
    where
        Q: TaskQueue + DeliverySource + 'static,
    {
        let tasks: Arc<dyn TaskQueue> = queue.clone();
        Self {
            jobs: JobService::new(store.clone(), tasks.clone()),
            store,
            tasks,
            deliveries: queue,
            pipeline,
        }
    }
}
