//! Repository Module
//!
//! Postgres-backed implementations of the job store and the task queue.

pub mod job;
pub mod queue;

// Re-export for convenience
pub use job::PgJobStore;
pub use queue::PgTaskQueue;
