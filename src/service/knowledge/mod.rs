pub mod directory;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

// Traits.

/// Generic knowledge source trait that loaders must implement.
///
/// A knowledge source produces the reference text injected into prompts to ground the
/// model's answers.  Loading never fails: unreadable documents are skipped, and an empty
/// source yields a sentinel string.
#[async_trait]
pub trait GenericKnowledgeClient: Send + Sync + 'static {
    /// Load the concatenated knowledge context.
    async fn load_context(&self) -> String;
}

// Structs.

/// Knowledge client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct KnowledgeClient {
    inner: Arc<dyn GenericKnowledgeClient>,
}

impl Deref for KnowledgeClient {
    type Target = dyn GenericKnowledgeClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl KnowledgeClient {
    pub fn new(inner: Arc<dyn GenericKnowledgeClient>) -> Self {
        Self { inner }
    }

    /// A knowledge client that contributes nothing to prompts.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledKnowledgeClient))
    }
}

/// Knowledge source used when prompt augmentation is turned off.
struct DisabledKnowledgeClient;

#[async_trait]
impl GenericKnowledgeClient for DisabledKnowledgeClient {
    async fn load_context(&self) -> String {
        String::new()
    }
}
