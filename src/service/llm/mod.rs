pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{
    error::{TriageError, TriageResult},
    types::{CompletionOptions, PromptMessage},
};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This is the completion gateway: a single request/response exchange with an external
/// language model.  Implementing this trait allows different LLM providers to be used.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Send the prompt messages and return the model's raw text reply.
    ///
    /// Fails with `NotConfigured` when no credential is present, and with
    /// `UpstreamUnavailable` when the provider cannot be reached or returns an error.
    async fn complete(&self, messages: &[PromptMessage], options: CompletionOptions) -> TriageResult<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}

// Helpers.

/// Validate a completion request before it leaves the process.
pub fn check_request(messages: &[PromptMessage], options: CompletionOptions) -> TriageResult<()> {
    if messages.is_empty() {
        return Err(TriageError::invalid("a completion needs at least one message"));
    }

    if !(0.0..=1.0).contains(&options.temperature) {
        return Err(TriageError::invalid(format!("temperature {} is outside [0, 1]", options.temperature)));
    }

    Ok(())
}

// Mocks.


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_messages() {
        let result = check_request(&[], CompletionOptions::with_temperature(0.5));

        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let messages = [PromptMessage::user("hi")];

        assert!(check_request(&messages, CompletionOptions::with_temperature(1.2)).is_err());
        assert!(check_request(&messages, CompletionOptions::with_temperature(-0.1)).is_err());
        assert!(check_request(&messages, CompletionOptions::with_temperature(1.0)).is_ok());
    }
}
