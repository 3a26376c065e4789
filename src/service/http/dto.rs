//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};

use crate::{
    base::types::{QaPair, Ticket},
    interaction::session::TriageSession,
};

// Requests.

#[derive(Debug, Clone, Deserialize)]
pub struct ChatStartRequest {
    pub issue: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickHelpRequest {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosisRequest {
    pub issue: String,
    #[serde(default)]
    pub qa_history: Vec<QaPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscalationRequest {
    pub name: String,
    pub email: String,
    pub issue: String,
    #[serde(default)]
    pub qa_history: Vec<QaPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub issue: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

/// Body of an early stop; the answer being typed when the user gave up, if any.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopRequest {
    #[serde(default)]
    pub pending_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
}

// Responses.

#[derive(Debug, Clone, Serialize)]
pub struct TicketCreatedResponse {
    pub success: bool,
    pub ticket_id: String,
    pub message: String,
}

impl From<Ticket> for TicketCreatedResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            success: true,
            ticket_id: ticket.id.to_string(),
            message: ticket.body,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionsResponse {
    pub success: bool,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisResponse {
    pub success: bool,
    pub diagnosis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EscalationResponse {
    pub success: bool,
    pub ticket_id: String,
    pub ticket_text: String,
}

impl From<Ticket> for EscalationResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            success: true,
            ticket_id: ticket.id.to_string(),
            ticket_text: ticket.body,
        }
    }
}

/// Quick-help suggestions, both as a list and as a ready-to-render bullet block.
#[derive(Debug, Clone, Serialize)]
pub struct QuickHelpResponse {
    pub success: bool,
    pub suggestion: String,
    pub suggestions: Vec<String>,
}

impl From<Vec<String>> for QuickHelpResponse {
    fn from(suggestions: Vec<String>) -> Self {
        let suggestion = suggestions.iter().map(|s| format!("- {s}")).collect::<Vec<_>>().join("\n");

        Self { success: true, suggestion, suggestions }
    }
}

/// A stored session and the question awaiting an answer, if any.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session_id: String,
    pub current_question: Option<String>,
    pub session: TriageSession,
}

impl SessionResponse {
    pub fn new(session_id: impl Into<String>, session: &TriageSession) -> Self {
        Self {
            success: true,
            session_id: session_id.into(),
            current_question: session.current_question().map(str::to_string),
            session: session.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDeletedResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: String,
    pub message: String,
}
