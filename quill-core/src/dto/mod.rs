//! Data Transfer Objects for inter-service communication
//!
//! This module contains DTOs used for communication between Quill services
//! (orchestrator, runner, CLI). DTOs are lightweight representations of
//! domain entities optimized for network transfer.

pub mod job;
pub mod queue;
