//! JSON HTTP surface for the assistant and for server-held triage sessions.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{
    net::TcpListener,
    sync::{Mutex as SessionMutex, OwnedMutexGuard},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

use crate::{
    base::types::Void,
    interaction::{assistant::Assistant, session::TriageSession},
    service::db::DbClient,
};

use self::error::ApiError;

type SessionLocks = Arc<Mutex<HashMap<String, Arc<SessionMutex<()>>>>>;

/// Shared state of the HTTP handlers.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct AppState {
    /// The triage assistant.
    pub assistant: Assistant,
    /// The session store.
    pub db: DbClient,
    locks: SessionLocks,
}

impl AppState {
    pub fn new(assistant: Assistant, db: DbClient) -> Self {
        Self {
            assistant,
            db,
            locks: Arc::default(),
        }
    }

    /// Wait for exclusive access to one session.
    ///
    /// The lock entry lives only while some request holds or waits for it.
    pub(crate) async fn lock_session(&self, session_id: &str) -> SessionGuard {
        let lock = lock_map(&self.locks).entry(session_id.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;

        SessionGuard {
            locks: self.locks.clone(),
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    pub(crate) async fn load_session(&self, session_id: &str) -> Result<TriageSession, ApiError> {
        self.db.get_session(session_id).await?.ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))
    }
}

/// Exclusive access to one session, released on drop.
pub(crate) struct SessionGuard {
    locks: SessionLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = lock_map(&self.locks);

        // Only the map's own reference is left, so nobody is waiting.
        if locks.get(&self.session_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.session_id);
        }
    }
}

fn lock_map(locks: &SessionLocks) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SessionMutex<()>>>> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/api/ticket/create", post(handlers::create_ticket))
        .route("/api/ticket/quick-help", post(handlers::quick_help))
        .route("/api/chat/start", post(handlers::start_chat))
        .route("/api/chat/diagnose", post(handlers::diagnose))
        .route("/api/chat/escalate", post(handlers::escalate))
        .route("/api/session", post(handlers::create_session))
        .route("/api/session/:id", get(handlers::get_session).delete(handlers::delete_session))
        .route("/api/session/:id/issue", post(handlers::submit_issue))
        .route("/api/session/:id/answer", post(handlers::submit_answer))
        .route("/api/session/:id/stop", post(handlers::stop_early))
        .route("/api/session/:id/diagnosis", post(handlers::diagnose_session))
        .route("/api/session/:id/resolve", post(handlers::confirm_solved))
        .route("/api/session/:id/reject", post(handlers::reject_diagnosis))
        .route("/api/session/:id/escalate", post(handlers::submit_escalation))
        .route("/api/session/:id/reset", post(handlers::reset_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router until ctrl-c.
#[instrument(skip(state))]
pub async fn serve(bind_address: &str, state: AppState) -> Void {
    let listener = TcpListener::bind(bind_address).await?;

    info!("Listening on http://{} ...", listener.local_addr()?);

    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped.");

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested.");
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header::CONTENT_TYPE},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        base::{
            error::TriageError,
            prompts::{DIAGNOSIS_DIRECTIVE, ESCALATION_DIRECTIVE, QUESTION_DIRECTIVE},
            types::PromptMessage,
        },
        service::llm::mock::MockLlm,
    };

    fn is_task(messages: &[PromptMessage], directive: &str) -> bool {
        messages.first().is_some_and(|m| m.content == directive)
    }

    async fn app(llm: MockLlm) -> Router {
        let db = DbClient::surreal_memory().await.unwrap();

        router(AppState::new(Assistant::with_llm(llm), db))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        let request = Request::builder().method(method).uri(uri).header(CONTENT_TYPE, "application/json").body(body).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };

        (status, json)
    }

    #[tokio::test]
    async fn health_reports_online() {
        let app = app(MockLlm::new()).await;

        let (status, body) = call(&app, Method::GET, "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn start_chat_returns_questions() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Ok("A?||B?||C?".to_string()));
        let app = app(llm).await;

        let (status, body) = call(&app, Method::POST, "/api/chat/start", Some(json!({ "issue": "router is down" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["questions"], json!(["A?", "B?", "C?"]));
    }

    #[tokio::test]
    async fn blank_input_is_bad_request() {
        let app = app(MockLlm::new()).await;

        let (status, body) = call(&app, Method::POST, "/api/ticket/quick-help", Some(json!({ "description": "  " }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn missing_credential_is_service_unavailable() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Err(TriageError::NotConfigured));
        let app = app(llm).await;

        let (status, body) = call(&app, Method::POST, "/api/chat/diagnose", Some(json!({ "issue": "no display", "qa_history": [] }))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "not_configured");
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Err(TriageError::UpstreamUnavailable("connection refused".to_string())));
        let app = app(llm).await;

        let request = json!({ "full_name": "Sam", "email": "sam@example.com", "category": "Network", "priority": "High", "description": "VPN drops" });
        let (status, body) = call(&app, Method::POST, "/api/ticket/create", Some(request)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "upstream_unavailable");
    }

    #[tokio::test]
    async fn stateless_escalation_returns_ticket() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Ok("Escalated.".to_string()));
        let app = app(llm).await;

        let request = json!({ "name": "Jane", "email": "jane@x.com", "issue": "no display", "qa_history": [] });
        let (status, body) = call(&app, Method::POST, "/api/chat/escalate", Some(request)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["ticket_id"].as_str().unwrap().starts_with("TICKET-"));
        assert_eq!(body["ticket_text"], "Escalated.");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app(MockLlm::new()).await;

        let (status, body) = call(&app, Method::GET, "/api/session/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "session_not_found");

        let (status, _) = call(&app, Method::POST, "/api/session/nope/answer", Some(json!({ "answer": "yes" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_flow_over_http() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .withf(|messages, _| is_task(messages, QUESTION_DIRECTIVE))
            .times(1)
            .returning(|_, _| Ok("Cable connected?||Backlight on?||External monitor tried?".to_string()));
        llm.expect_complete()
            .withf(|messages, _| is_task(messages, DIAGNOSIS_DIRECTIVE))
            .times(1)
            .returning(|_, _| Ok("1. **Diagnosis**: Panel.\n2. **Solution**: Replace it.".to_string()));
        llm.expect_complete()
            .withf(|messages, _| is_task(messages, ESCALATION_DIRECTIVE))
            .times(1)
            .returning(|_, _| Ok("Ticket body".to_string()));
        let app = app(llm).await;

        let (status, body) = call(&app, Method::POST, "/api/session", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["session_id"].as_str().unwrap().to_string();
        assert_eq!(body["session"]["phase"], "Intake");

        // Answering before the issue is a sequencing error.
        let (status, _) = call(&app, Method::POST, &format!("/api/session/{id}/answer"), Some(json!({ "answer": "yes" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, Method::POST, &format!("/api/session/{id}/issue"), Some(json!({ "issue": "screen is black" }))).await;
        assert_eq!(body["current_question"], "Cable connected?");

        for answer in ["Yes", "No", "Not yet"] {
            let (status, _) = call(&app, Method::POST, &format!("/api/session/{id}/answer"), Some(json!({ "answer": answer }))).await;
            assert_eq!(status, StatusCode::OK);
        }

        // Requested twice; generated once.
        call(&app, Method::POST, &format!("/api/session/{id}/diagnosis"), None).await;
        let (_, body) = call(&app, Method::POST, &format!("/api/session/{id}/diagnosis"), None).await;
        assert!(body["session"]["diagnosis"].as_str().unwrap().contains("**Solution**"));

        let (_, body) = call(&app, Method::POST, &format!("/api/session/{id}/reject"), None).await;
        assert_eq!(body["session"]["phase"], "Escalating");

        let (status, body) = call(&app, Method::POST, &format!("/api/session/{id}/escalate"), Some(json!({ "name": "Jane", "email": "jane@x.com" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["session"]["ticket"]["id"].as_str().unwrap().starts_with("TICKET-"));

        let (_, body) = call(&app, Method::GET, &format!("/api/session/{id}"), None).await;
        assert_eq!(body["session"]["answers"].as_array().unwrap().len(), 3);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/session/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::GET, &format!("/api/session/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stop_without_body_escalates() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Ok("A?||B?||C?".to_string()));
        let app = app(llm).await;

        let (_, body) = call(&app, Method::POST, "/api/session", None).await;
        let id = body["session_id"].as_str().unwrap().to_string();
        call(&app, Method::POST, &format!("/api/session/{id}/issue"), Some(json!({ "issue": "wifi" }))).await;

        let (status, body) = call(&app, Method::POST, &format!("/api/session/{id}/stop"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["phase"], "Escalating");
        assert_eq!(body["session"]["escalation_reason"], "UserAbandoned");

        let (_, body) = call(&app, Method::POST, &format!("/api/session/{id}/reset"), None).await;
        assert_eq!(body["session"]["phase"], "Intake");
    }

    #[tokio::test]
    async fn stop_with_malformed_body_is_rejected() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Ok("A?||B?||C?".to_string()));
        let app = app(llm).await;

        let (_, body) = call(&app, Method::POST, "/api/session", None).await;
        let id = body["session_id"].as_str().unwrap().to_string();
        call(&app, Method::POST, &format!("/api/session/{id}/issue"), Some(json!({ "issue": "wifi" }))).await;

        let (status, body) = call(&app, Method::POST, &format!("/api/session/{id}/stop"), Some(json!({ "pending_answer": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        let (_, body) = call(&app, Method::GET, &format!("/api/session/{id}"), None).await;
        assert_eq!(body["session"]["phase"], "Questioning");

        let (status, body) = call(&app, Method::POST, &format!("/api/session/{id}/stop"), Some(json!({ "pending_answer": "Only at home" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["phase"], "Escalating");
        assert_eq!(body["session"]["answers"][0]["answer"], "Only at home");
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_input() {
        let app = app(MockLlm::new()).await;

        let (status, body) = call(&app, Method::POST, "/api/chat/start", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "invalid_input");
        assert!(body["message"].as_str().unwrap().contains("issue"));

        let (status, body) = call(&app, Method::POST, "/api/ticket/create", Some(json!({ "full_name": "Sam", "priority": "Urgent" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn session_locks_do_not_outlive_requests() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Ok("A?||B?||C?".to_string()));
        let state = AppState::new(Assistant::with_llm(llm), DbClient::surreal_memory().await.unwrap());
        let app = router(state.clone());

        for i in 0..50 {
            let (status, _) = call(&app, Method::POST, &format!("/api/session/bogus{i}/reset"), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        let (status, _) = call(&app, Method::DELETE, "/api/session/bogus", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert!(lock_map(&state.locks).is_empty());

        // A session that is never deleted leaves nothing behind either.
        let (_, body) = call(&app, Method::POST, "/api/session", None).await;
        let id = body["session_id"].as_str().unwrap().to_string();
        let (status, _) = call(&app, Method::POST, &format!("/api/session/{id}/issue"), Some(json!({ "issue": "wifi" }))).await;
        assert_eq!(status, StatusCode::OK);

        assert!(lock_map(&state.locks).is_empty());
    }

    #[tokio::test]
    async fn waiting_request_keeps_the_lock_entry() {
        let state = AppState::new(Assistant::with_llm(MockLlm::new()), DbClient::surreal_memory().await.unwrap());

        let first = state.lock_session("shared").await;
        let waiter = tokio::spawn({
            let state = state.clone();
            async move {
                let _guard = state.lock_session("shared").await;
            }
        });

        // The map, the held guard and the waiter each own a reference.
        while Arc::strong_count(&lock_map(&state.locks)["shared"]) < 3 {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert!(lock_map(&state.locks).contains_key("shared"));

        waiter.await.unwrap();
        assert!(lock_map(&state.locks).is_empty());
    }
}
