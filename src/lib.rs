//! Library root for `support-triage`.
//!
//! Support-triage is an OpenAI-powered assistant for IT support desks designed to:
//! - Ask clarifying questions about a reported problem
//! - Diagnose the problem and propose a fix from the answers
//! - Escalate to a human with a formal ticket when the fix does not work
//! - Draft replies to submitted tickets and suggest quick fixes
//!
//! Answers are grounded in a local knowledge base of text documents.  The service is
//! exposed over HTTP with axum, keeps sessions in SurrealDB, and calls OpenAI for
//! generation.  The architecture is built around extensible traits that allow for
//! different implementations of each service.

pub mod base;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the support-triage runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with database, LLM, and knowledge clients
/// - Serves the HTTP surface until shutdown
pub async fn start(config: Config) -> Void {
    info!("Starting support-triage ...");

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
