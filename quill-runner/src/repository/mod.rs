//! Repository layer
//!
//! HTTP-backed job store and task queue. The worker sees the same traits
//! it would see in-process; every call goes through the orchestrator API.

mod jobs;
mod queue;

pub use jobs::HttpJobStore;
pub use queue::HttpTaskQueue;
