//! The triage conversation as an explicit state machine.
//!
//! A [`TriageSession`] is a plain value owned by the caller.  Each transition takes the
//! session by `&mut` and either applies completely or leaves it untouched:
//!
//! ```text
//! Intake ──issue──▶ Questioning ──last answer──▶ Diagnosing ──solved──▶ Resolved
//!                        │                           │
//!                        └──stop early──▶ Escalating ◀──not solved──┘
//! ```
//!
//! `reset` returns any state to `Intake`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::base::{
    error::{TriageError, TriageResult, require_text},
    types::{EscalationReason, QaPair, Ticket},
};

use super::assistant::Assistant;

/// Where a session is in the triage flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Intake,
    Questioning,
    Diagnosing,
    Resolved,
    Escalating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Intake => "intake",
            Phase::Questioning => "questioning",
            Phase::Diagnosing => "diagnosing",
            Phase::Resolved => "resolved",
            Phase::Escalating => "escalating",
        };

        f.write_str(name)
    }
}

/// State of one user's triage conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriageSession {
    original_issue: String,
    questions: Vec<String>,
    answers: Vec<QaPair>,
    current_index: usize,
    phase: Phase,
    diagnosis: Option<String>,
    escalation_requested: bool,
    escalation_reason: Option<EscalationReason>,
    ticket: Option<Ticket>,
}

impl TriageSession {
    /// A fresh session in `Intake`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn original_issue(&self) -> &str {
        &self.original_issue
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn answers(&self) -> &[QaPair] {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The question awaiting an answer, while questioning.
    pub fn current_question(&self) -> Option<&str> {
        if self.phase != Phase::Questioning {
            return None;
        }

        self.questions.get(self.current_index).map(String::as_str)
    }

    /// The cached diagnosis, once generated.
    pub fn diagnosis(&self) -> Option<&str> {
        self.diagnosis.as_deref()
    }

    pub fn escalation_requested(&self) -> bool {
        self.escalation_requested
    }

    pub fn escalation_reason(&self) -> Option<EscalationReason> {
        self.escalation_reason
    }

    /// The escalation ticket, once submitted.
    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    /// Whether no further transition other than `reset` is possible.
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Resolved || self.ticket.is_some()
    }

    // Transitions.

    /// Record the user's issue and generate the clarifying questions.
    ///
    /// On failure the session stays in `Intake` and may be retried.
    #[instrument(skip_all)]
    pub async fn submit_issue(&mut self, assistant: &Assistant, issue: &str) -> TriageResult<&[String]> {
        self.expect_phase(Phase::Intake, "submit an issue")?;
        require_text("issue", issue)?;

        let questions = assistant.start_chat(issue).await?;

        info!("Starting questioning with {} questions.", questions.len());

        self.original_issue = issue.to_string();
        self.questions = questions;
        self.phase = Phase::Questioning;

        Ok(&self.questions)
    }

    /// Answer the current question and advance.
    ///
    /// Returns the phase after the transition: still `Questioning`, or `Diagnosing` once the
    /// last question is answered.
    pub fn submit_answer(&mut self, answer: &str) -> TriageResult<Phase> {
        self.expect_phase(Phase::Questioning, "answer a question")?;
        require_text("answer", answer)?;

        self.record_answer(answer)?;

        if self.current_index >= self.questions.len() {
            self.phase = Phase::Diagnosing;
        }

        Ok(self.phase)
    }

    /// Stop questioning and go straight to escalation, skipping the diagnosis.
    ///
    /// An answer typed for the current question but not yet submitted is kept.
    pub fn stop_early(&mut self, pending_answer: Option<&str>) -> TriageResult<()> {
        self.expect_phase(Phase::Questioning, "stop questioning")?;

        if let Some(answer) = pending_answer.filter(|a| !a.trim().is_empty()) {
            self.record_answer(answer)?;
        }

        self.escalation_requested = true;
        self.escalation_reason = Some(EscalationReason::UserAbandoned);
        self.phase = Phase::Escalating;

        Ok(())
    }

    /// Get the diagnosis, generating it on first use.
    ///
    /// The diagnosis is generated at most once per session; later calls, including after the
    /// user confirms or rejects it, return the cached text without an upstream call.
    #[instrument(skip_all)]
    pub async fn diagnose(&mut self, assistant: &Assistant) -> TriageResult<&str> {
        let diagnosis = match self.diagnosis.take() {
            Some(cached) => cached,
            None => {
                self.expect_phase(Phase::Diagnosing, "request a diagnosis")?;
                assistant.diagnose(&self.original_issue, &self.answers).await?
            }
        };

        Ok(self.diagnosis.insert(diagnosis).as_str())
    }

    /// The user confirms the diagnosis solved the problem.
    pub fn confirm_solved(&mut self) -> TriageResult<()> {
        self.expect_diagnosis_shown("confirm the diagnosis")?;

        self.phase = Phase::Resolved;

        Ok(())
    }

    /// The user reports the diagnosis did not solve the problem.
    pub fn reject_diagnosis(&mut self) -> TriageResult<()> {
        self.expect_diagnosis_shown("reject the diagnosis")?;

        self.escalation_requested = true;
        self.escalation_reason = Some(EscalationReason::DiagnosisRejected);
        self.phase = Phase::Escalating;

        Ok(())
    }

    /// Generate the escalation ticket from whatever answers have accumulated.
    #[instrument(skip_all)]
    pub async fn submit_escalation(&mut self, assistant: &Assistant, name: &str, email: &str) -> TriageResult<&Ticket> {
        self.expect_phase(Phase::Escalating, "submit an escalation")?;

        if self.ticket.is_some() {
            return Err(TriageError::invalid("an escalation ticket was already submitted for this session; reset to start over"));
        }

        require_text("name", name)?;
        require_text("email", email)?;

        let reason = self.escalation_reason.unwrap_or(EscalationReason::Direct);
        let ticket = assistant.escalate(name, email, &self.original_issue, &self.answers, reason).await?;

        info!("Escalation ticket `{}` created ({:?}).", ticket.id, reason);

        Ok(&*self.ticket.insert(ticket))
    }

    /// Discard everything and return to `Intake`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // Helpers.

    fn expect_phase(&self, expected: Phase, action: &str) -> TriageResult<()> {
        if self.phase != expected {
            return Err(TriageError::invalid(format!("cannot {action} while the session is in the `{}` phase", self.phase)));
        }

        Ok(())
    }

    fn expect_diagnosis_shown(&self, action: &str) -> TriageResult<()> {
        self.expect_phase(Phase::Diagnosing, action)?;

        if self.diagnosis.is_none() {
            return Err(TriageError::invalid(format!("cannot {action} before the diagnosis has been generated")));
        }

        Ok(())
    }

    fn record_answer(&mut self, answer: &str) -> TriageResult<()> {
        let question = self
            .questions
            .get(self.current_index)
            .cloned()
            .ok_or_else(|| TriageError::invalid("there is no question left to answer"))?;

        self.answers.push(QaPair::new(question, answer));
        self.current_index += 1;

        Ok(())
    }
}

#[cfg(test)]
impl TriageSession {
    /// A session that has already received its questions.
    pub(crate) fn questioning(issue: &str, questions: Vec<String>) -> Self {
        Self {
            original_issue: issue.to_string(),
            questions,
            phase: Phase::Questioning,
            ..Self::default()
        }
    }
}

// Tests.
