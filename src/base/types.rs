use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

// Completion types.

/// The author of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Sampling options for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature, between 0 and 1.
    pub temperature: f32,
}

impl CompletionOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self { temperature }
    }
}

// Triage types.

/// A clarifying question and the user's answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Why a triage conversation was handed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationReason {
    /// The user stopped answering questions and asked for a ticket.
    UserAbandoned,
    /// The user read the diagnosis and said it did not solve the problem.
    DiagnosisRejected,
    /// The escalation came straight through the stateless API, with no session behind it.
    Direct,
}

/// Display identifier for a ticket, `TICKET-` followed by six digits.
///
/// Identifiers are random and not guaranteed unique; do not use them as a primary key
/// without an additional uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    pub const PREFIX: &'static str = "TICKET-";

    /// Draw a new identifier uniformly from `TICKET-100000` to `TICKET-999999`.
    pub fn generate() -> Self {
        let number = rand::thread_rng().gen_range(100_000..=999_999u32);
        Self(format!("{}{number}", Self::PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub body: String,
}

/// Ticket category, as offered on the ticket form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Category {
    Hardware,
    Software,
    Network,
    Access,
    #[default]
    Other,
}

/// Ticket priority, as offered on the ticket form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

/// A formal ticket submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    pub description: String,
}

/// Liveness report for the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_ids_have_six_digits_in_range() {
        for _ in 0..1000 {
            let id = TicketId::generate();
            let digits = id.as_str().strip_prefix(TicketId::PREFIX).expect("prefix");

            assert_eq!(digits.len(), 6);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));

            let number: u32 = digits.parse().unwrap();
            assert!((100_000..=999_999).contains(&number));
        }
    }

    #[test]
    fn ticket_request_defaults_category_and_priority() {
        let request: TicketRequest = serde_json::from_value(serde_json::json!({
            "full_name": "Jane",
            "email": "jane@x.com",
            "description": "Printer jams",
        }))
        .unwrap();

        assert_eq!(request.category, Category::Other);
        assert_eq!(request.priority, Priority::Low);
        assert_eq!(request.subject, None);
    }
}
