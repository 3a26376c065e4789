//! Core components, types, and utilities for support-triage.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Task directives and prompt builders for LLM interactions.
//! - Common types, the triage error taxonomy, and result handling.

pub mod config;
pub mod error;
pub mod prompts;
pub mod types;
