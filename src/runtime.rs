//! Runtime services and shared state for support-triage.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::assistant::Assistant,
    service::{
        db::DbClient,
        http::{self, AppState},
        knowledge::KnowledgeClient,
        llm::LlmClient,
    },
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the session store, and the assistant.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The database client instance.
    pub db: DbClient,
    /// The triage assistant.
    pub assistant: Assistant,
}

impl Runtime {
    /// Create a new runtime instance from the configured services.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::surreal(&config).await?;

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Initialize the knowledge source.
        let knowledge = KnowledgeClient::from_config(&config);

        Ok(Self::with_services(config, db, llm, knowledge))
    }

    /// Assemble a runtime from already-constructed services.
    pub fn with_services(config: Config, db: DbClient, llm: LlmClient, knowledge: KnowledgeClient) -> Self {
        let assistant = Assistant::new(&config, llm, knowledge);

        Self { config, db, assistant }
    }

    /// The HTTP handler state for this runtime.
    pub fn app_state(&self) -> AppState {
        AppState::new(self.assistant.clone(), self.db.clone())
    }

    /// Serve the HTTP surface until shutdown.
    pub async fn start(&self) -> Void {
        http::serve(&self.config.server_bind_address, self.app_state()).await
    }
}
