//! Core domain types
//!
//! This module contains the core domain structures used across Quill services.
//! These types are shared between the orchestrator (for persistence), the
//! runner (for execution) and the pipeline library (for generation).

pub mod document;
pub mod job;
pub mod request;
pub mod stage;
pub mod warning;
