//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by support-triage:
//! - Database services (e.g., SurrealDB) holding triage sessions
//! - Knowledge sources (e.g., a local document directory)
//! - LLM services (e.g., OpenAI)
//! - The HTTP surface (axum)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod db;
pub mod http;
pub mod knowledge;
pub mod llm;
