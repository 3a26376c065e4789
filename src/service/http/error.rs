//! Mapping of failures onto HTTP responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::base::{error::TriageError, types::Err};

use super::dto::ErrorResponse;

/// A failed request.
#[derive(Debug)]
pub enum ApiError {
    /// A triage operation failed.
    Triage(TriageError),
    /// No session is stored under the ID.
    SessionNotFound(String),
    /// The session store failed.
    Store(Err),
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        Self::Triage(err)
    }
}

impl From<Err> for ApiError {
    fn from(err: Err) -> Self {
        Self::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Triage(TriageError::invalid(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Triage(TriageError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Triage(TriageError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Triage(TriageError::UpstreamUnavailable(_) | TriageError::EmptyGeneration(_)) => StatusCode::BAD_GATEWAY,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Triage(err) => err.kind(),
            Self::SessionNotFound(_) => "session_not_found",
            Self::Store(_) => "store_failure",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Triage(err) => err.to_string(),
            Self::SessionNotFound(id) => format!("no session with id `{id}`"),
            Self::Store(err) => format!("the session store failed: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed ({status}): {}", self.message());
        } else {
            warn!("Request rejected ({status}): {}", self.message());
        }

        let body = ErrorResponse {
            success: false,
            kind: self.kind().to_string(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}
