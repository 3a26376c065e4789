//! Integration with the OpenAI chat completions API.
//!
//! This module provides the OpenAI implementation of the completion gateway: it maps
//! prompt messages onto chat completion requests, applies a per-request timeout, and
//! optionally retries with jittered exponential backoff.

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use rand::Rng;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::base::{
    config::Config,
    error::{TriageError, TriageResult},
    types::{CompletionOptions, PromptMessage, Role},
};

use super::{GenericLlmClient, LlmClient, check_request};

/// Base delay before the first retry.
const RETRY_DELAY_MS: u64 = 1000;

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
///
/// Without an API key the client is still constructed, but every completion fails with
/// `NotConfigured`.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Option<Client<OpenAIConfig>>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let client = config.api_key().map(|key| {
            let mut cfg = OpenAIConfig::new().with_api_key(key);

            if let Some(base) = &config.openai_api_base {
                cfg = cfg.with_api_base(base);
            }

            Client::with_config(cfg)
        });

        if client.is_none() {
            warn!("No OpenAI API key configured; every generation will fail until one is provided.");
        }

        Self { client, config: config.clone() }
    }

    /// Build the chat completion request.
    #[instrument(name = "OpenAiLlmClient::build_request", skip_all)]
    fn build_request(&self, messages: &[PromptMessage], options: CompletionOptions) -> TriageResult<CreateChatCompletionRequest> {
        let messages = messages.iter().map(to_openai_message).collect::<Result<Vec<_>, _>>().map_err(map_openai_error)?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_model)
            .messages(messages)
            .temperature(options.temperature)
            .max_completion_tokens(self.config.openai_max_tokens)
            .build()
            .map_err(map_openai_error)
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, client: &Client<OpenAIConfig>, request: CreateChatCompletionRequest) -> TriageResult<CreateChatCompletionResponse> {
        let max_retries = self.config.openai_max_retries;
        let request_timeout = Duration::from_secs(self.config.openai_request_timeout_secs);

        let mut retries = 0;

        loop {
            let result = timeout(request_timeout, client.chat().create(request.clone())).await;

            let failure = match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => map_openai_error(err),
                Err(_) => TriageError::UpstreamUnavailable(format!("request timed out after {}s", request_timeout.as_secs())),
            };

            // Only transport and provider failures are worth another attempt.
            if retries >= max_retries || !matches!(failure, TriageError::UpstreamUnavailable(_)) {
                return Err(failure);
            }

            retries += 1;
            warn!("OpenAI API call failed, retrying {retries}/{max_retries}: {failure}");

            tokio::time::sleep(backoff_delay(retries)).await;
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::complete", skip_all, fields(model = %self.config.openai_model, messages = messages.len()))]
    async fn complete(&self, messages: &[PromptMessage], options: CompletionOptions) -> TriageResult<String> {
        check_request(messages, options)?;

        let Some(client) = &self.client else {
            return Err(TriageError::NotConfigured);
        };

        let request = self.build_request(messages, options)?;
        let response = self.call_openai_api(client, request).await?;

        let content = response.choices.first().and_then(|choice| choice.message.content.clone()).unwrap_or_default();
        debug!("Completion returned {} characters.", content.len());

        Ok(content)
    }
}

// Helpers.

/// Map a prompt message onto the OpenAI request message type.
fn to_openai_message(message: &PromptMessage) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.clone();

    Ok(match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default().content(content).build()?.into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default().content(content).build()?.into(),
    })
}

/// Translate an `async-openai` error into the triage taxonomy.
fn map_openai_error(err: OpenAIError) -> TriageError {
    match err {
        OpenAIError::InvalidArgument(message) => TriageError::InvalidInput(message),
        other => TriageError::UpstreamUnavailable(other.to_string()),
    }
}

/// Exponential backoff with up to 50% random jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_DELAY_MS * 2_u64.pow(attempt.saturating_sub(1).min(10));
    let jitter = rand::thread_rng().gen_range(0..=base / 2);

    Duration::from_millis(base + jitter)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::config::ConfigInner;

    fn create_test_config(api_key: Option<&str>) -> Config {
        Config::from(ConfigInner {
            openai_api_key: api_key.map(str::to_string),
            openai_model: "gpt-4.1-mini".to_string(),
            openai_max_tokens: 200u32,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = LlmClient::openai(&create_test_config(None));

        let result = client.complete(&[PromptMessage::user("hello")], CompletionOptions::with_temperature(0.5)).await;

        assert_eq!(result, Err(TriageError::NotConfigured));
    }

    #[tokio::test]
    async fn invalid_request_fails_before_configuration_check() {
        let client = LlmClient::openai(&create_test_config(None));

        let result = client.complete(&[], CompletionOptions::with_temperature(0.5)).await;

        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn builds_request_with_every_message() {
        let client = OpenAiLlmClient::new(&create_test_config(Some("sk-test")));
        let messages = [
            PromptMessage::system("directive"),
            PromptMessage::user("issue"),
            PromptMessage { role: Role::Assistant, content: "earlier reply".to_string() },
        ];

        let request = client.build_request(&messages, CompletionOptions::with_temperature(0.3)).unwrap();

        assert_eq!(request.model, "gpt-4.1-mini");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_completion_tokens, Some(200));
    }

    #[test]
    fn backoff_grows_and_stays_bounded() {
        for attempt in 1..=4 {
            let base = RETRY_DELAY_MS * 2_u64.pow(attempt - 1);
            let delay = backoff_delay(attempt).as_millis() as u64;

            assert!(delay >= base && delay <= base + base / 2);
        }
    }
}
