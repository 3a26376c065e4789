//! SurrealDB implementation for session storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{
    RecordId, Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{debug, info, instrument};

use crate::{
    base::{config::Config, types::Res},
    interaction::session::TriageSession,
};

use super::{DbClient, GenericDbClient};

const SESSION_TABLE: &str = "session";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Connects to the database described by the configuration.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let credentials = match (&config.db_username, &config.db_password) {
            (Some(username), Some(password)) => Some((username.as_str(), password.as_str())),
            _ => None,
        };

        let client = SurrealDbClient::connect(&config.db_endpoint, &config.db_namespace, &config.db_database, credentials).await?;

        Ok(Self { inner: Arc::new(client) })
    }

    /// Creates a fresh in-memory database, mostly useful for tests.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::connect("mem://", "support", "triage", None).await?;

        Ok(Self { inner: Arc::new(client) })
    }
}

// Records.

/// A session record in the database.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurrealSession {
    pub id: Option<RecordId>,
    pub session: TriageSession,
    pub updated_at: DateTime<Utc>,
}

// Structs.

/// SurrealDB client, over any engine (`mem://`, `ws://`, `wss://`, ...).
#[derive(Clone)]
pub struct SurrealDbClient {
    db: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connect, optionally sign in as root, and select the namespace and database.
    #[instrument(name = "SurrealDbClient::connect", skip(credentials))]
    pub async fn connect(endpoint: &str, namespace: &str, database: &str, credentials: Option<(&str, &str)>) -> Res<Self> {
        let db = any::connect(endpoint).await?;

        if let Some((username, password)) = credentials {
            db.signin(Root { username, password }).await?;
        }

        db.use_ns(namespace).use_db(database).await?;

        info!("Database initialized successfully.");

        Ok(Self { db })
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn get_session(&self, session_id: &str) -> Res<Option<TriageSession>> {
        let record: Option<SurrealSession> = self.db.select((SESSION_TABLE, session_id)).await?;

        debug!("Session `{}` found: {}.", session_id, record.is_some());

        Ok(record.map(|record| record.session))
    }

    #[instrument(skip(self, session))]
    async fn save_session(&self, session_id: &str, session: &TriageSession) -> Res<()> {
        let record = SurrealSession {
            id: None,
            session: session.clone(),
            updated_at: Utc::now(),
        };

        let _: Option<SurrealSession> = self.db.upsert((SESSION_TABLE, session_id)).content(record).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, session_id: &str) -> Res<bool> {
        let deleted: Option<SurrealSession> = self.db.delete((SESSION_TABLE, session_id)).await?;

        Ok(deleted.is_some())
    }
}

// Tests.
