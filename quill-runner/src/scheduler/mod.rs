//! Scheduler layer for the runner
//!
//! Leases deliveries from the queue and hands each one to the worker,
//! bounded by the configured parallelism.

pub mod poller;

pub use poller::DeliveryPoller;
