//! HTTP handlers.
//!
//! Stateless handlers call the assistant directly.  Session handlers hold the session's lock
//! across load, transition and save, so a session runs one operation at a time.  Bodies go
//! through [`ApiJson`], so a malformed one is an `invalid_input` error.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    base::types::{EscalationReason, HealthStatus, TicketRequest},
    interaction::session::TriageSession,
};

use super::{
    AppState,
    dto::{
        AnswerRequest, ChatStartRequest, ContactRequest, DiagnosisRequest, DiagnosisResponse, EscalationRequest, EscalationResponse, IssueRequest,
        QuestionsResponse, QuickHelpRequest, QuickHelpResponse, SessionDeletedResponse, SessionResponse, StopRequest, TicketCreatedResponse,
    },
    error::ApiError,
    extract::{ApiJson, OptionalApiJson},
};

type ApiResult<T> = Result<Json<T>, ApiError>;

// Stateless.

/// GET / - Liveness report.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.assistant.health())
}

/// POST /api/ticket/create - Draft the reply to a support ticket.
#[instrument(skip_all)]
pub async fn create_ticket(State(state): State<AppState>, ApiJson(request): ApiJson<TicketRequest>) -> ApiResult<TicketCreatedResponse> {
    let ticket = state.assistant.create_ticket(&request).await?;

    Ok(Json(ticket.into()))
}

/// POST /api/chat/start - Generate clarifying questions.
#[instrument(skip_all)]
pub async fn start_chat(State(state): State<AppState>, ApiJson(request): ApiJson<ChatStartRequest>) -> ApiResult<QuestionsResponse> {
    let questions = state.assistant.start_chat(&request.issue).await?;

    Ok(Json(QuestionsResponse { success: true, questions }))
}

/// POST /api/chat/diagnose - Diagnose from an issue and its answers.
#[instrument(skip_all)]
pub async fn diagnose(State(state): State<AppState>, ApiJson(request): ApiJson<DiagnosisRequest>) -> ApiResult<DiagnosisResponse> {
    let diagnosis = state.assistant.diagnose(&request.issue, &request.qa_history).await?;

    Ok(Json(DiagnosisResponse { success: true, diagnosis }))
}

/// POST /api/chat/escalate - Generate an escalation ticket.
#[instrument(skip_all)]
pub async fn escalate(State(state): State<AppState>, ApiJson(request): ApiJson<EscalationRequest>) -> ApiResult<EscalationResponse> {
    let ticket = state
        .assistant
        .escalate(&request.name, &request.email, &request.issue, &request.qa_history, EscalationReason::Direct)
        .await?;

    Ok(Json(ticket.into()))
}

/// POST /api/ticket/quick-help - Suggest quick fixes.
#[instrument(skip_all)]
pub async fn quick_help(State(state): State<AppState>, ApiJson(request): ApiJson<QuickHelpRequest>) -> ApiResult<QuickHelpResponse> {
    let suggestions = state.assistant.quick_help(&request.description).await?;

    Ok(Json(suggestions.into()))
}

// Sessions.

/// POST /api/session - Start a new session.
#[instrument(skip_all)]
pub async fn create_session(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let id = Uuid::new_v4().to_string();
    let session = TriageSession::new();

    state.db.save_session(&id, &session).await?;

    info!("Created session `{id}`.");

    Ok((StatusCode::CREATED, Json(SessionResponse::new(id, &session))))
}

/// GET /api/session/:id - View a session.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionResponse> {
    let session = state.load_session(&id).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// DELETE /api/session/:id - Discard a session.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionDeletedResponse> {
    let _guard = state.lock_session(&id).await;

    if !state.db.delete_session(&id).await? {
        return Err(ApiError::SessionNotFound(id));
    }

    Ok(Json(SessionDeletedResponse { success: true, session_id: id }))
}

/// POST /api/session/:id/issue - Submit the issue and get the questions.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn submit_issue(State(state): State<AppState>, Path(id): Path<String>, ApiJson(request): ApiJson<IssueRequest>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.submit_issue(&state.assistant, &request.issue).await?;
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/answer - Answer the current question.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn submit_answer(State(state): State<AppState>, Path(id): Path<String>, ApiJson(request): ApiJson<AnswerRequest>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.submit_answer(&request.answer)?;
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/stop - Stop questioning and escalate.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn stop_early(State(state): State<AppState>, Path(id): Path<String>, OptionalApiJson(request): OptionalApiJson<StopRequest>) -> ApiResult<SessionResponse> {
    let request = request.unwrap_or_default();

    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.stop_early(request.pending_answer.as_deref())?;
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/diagnosis - Get the diagnosis, generating it once.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn diagnose_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    let cached = session.diagnosis().is_some();

    session.diagnose(&state.assistant).await?;

    if !cached {
        state.db.save_session(&id, &session).await?;
    }

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/resolve - The diagnosis solved the problem.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn confirm_solved(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.confirm_solved()?;
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/reject - The diagnosis did not solve the problem.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn reject_diagnosis(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.reject_diagnosis()?;
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/escalate - Submit contact details and generate the ticket.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn submit_escalation(State(state): State<AppState>, Path(id): Path<String>, ApiJson(request): ApiJson<ContactRequest>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.submit_escalation(&state.assistant, &request.name, &request.email).await?;
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}

/// POST /api/session/:id/reset - Start the session over.
#[instrument(skip_all, fields(session_id = %id))]
pub async fn reset_session(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionResponse> {
    let _guard = state.lock_session(&id).await;

    let mut session = state.load_session(&id).await?;
    session.reset();
    state.db.save_session(&id, &session).await?;

    Ok(Json(SessionResponse::new(id, &session)))
}
