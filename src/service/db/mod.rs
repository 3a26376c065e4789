use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{base::types::Res, interaction::session::TriageSession};

pub mod surreal;

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines storage for triage sessions driven through the HTTP surface.
/// Implementing this trait allows different database backends to be used.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Gets a session by its ID, if it exists.
    async fn get_session(&self, session_id: &str) -> Res<Option<TriageSession>>;

    /// Inserts or replaces the session stored under the ID.
    async fn save_session(&self, session_id: &str, session: &TriageSession) -> Res<()>;

    /// Deletes the session, returning whether it existed.
    async fn delete_session(&self, session_id: &str) -> Res<bool>;
}

/// Database client for support-triage.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    pub inner: Arc<dyn GenericDbClient>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self { inner }
    }
}
