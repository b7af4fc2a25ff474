//! Quill Core
//!
//! Core types and abstractions for the Quill content generation system.
//!
//! This crate contains:
//! - Domain types: Core business entities (GenerationRequest, ContentDocument, Job, etc.)
//! - DTOs: Data transfer objects for inter-service communication

pub mod domain;
pub mod dto;
