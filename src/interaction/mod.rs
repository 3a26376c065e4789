//! User-facing triage interactions.
//!
//! This module provides the two ways of driving a triage:
//! - Stateless operations on the [`assistant::Assistant`]
//! - The guided conversation in [`session::TriageSession`]

pub mod assistant;
pub mod session;
