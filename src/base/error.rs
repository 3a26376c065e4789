//! Error taxonomy for triage operations.

use thiserror::Error;

/// Failures surfaced by triage operations.
///
/// None of these are recovered locally: the caller sees the error, and any session
/// involved is left exactly as it was before the failed step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriageError {
    /// No credential for the completion service.
    #[error("the completion service is not configured: set `openai_api_key` or `OPENAI_API_KEY`")]
    NotConfigured,
    /// The completion service could not be reached, timed out, or returned an error.
    #[error("the completion service is unavailable: {0}")]
    UpstreamUnavailable(String),
    /// A required field was empty, or a step was attempted out of order.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The model replied, but nothing usable could be parsed from it.
    #[error("the model returned no usable output: {0}")]
    EmptyGeneration(String),
}

pub type TriageResult<T> = Result<T, TriageError>;

impl TriageError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::InvalidInput(_) => "invalid_input",
            Self::EmptyGeneration(_) => "empty_generation",
        }
    }
}

/// Fail with `InvalidInput` when a required text field is blank.
pub fn require_text(field: &str, value: &str) -> TriageResult<()> {
    if value.trim().is_empty() {
        return Err(TriageError::invalid(format!("`{field}` must not be empty")));
    }

    Ok(())
}
