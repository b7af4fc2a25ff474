//! Asynchronous job orchestration
//!
//! Job store and task queue abstractions, their in-memory implementations,
//! the lifecycle service used by the API and the worker entry point used by
//! runners.

pub mod memory;
pub mod queue;
pub mod service;
pub mod store;
pub mod worker;

pub use queue::{DeliverySource, QueueError, TaskQueue};
pub use service::{JobError, JobService};
pub use store::{JobFilter, JobStore, StoreError};
pub use worker::{DeliveryOutcome, Worker, WorkerConfig, WorkerError};
