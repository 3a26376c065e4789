//! Prompt templates and builders for each triage task.
//!
//! Every builder is a pure function of its inputs: it embeds each input verbatim so the
//! completion service sees the full context, and it never consults hidden state.

use crate::base::{
    config::Config,
    types::{EscalationReason, PromptMessage, QaPair, TicketId, TicketRequest},
};

/// Delimiter the question prompt asks the model to place between questions.
pub const QUESTION_DELIMITER: &str = "||";

/// Question generation directive.
pub const QUESTION_DIRECTIVE: &str = r#####"
# Prime Directive

You are an IT support triage bot.  A user has described a technical problem, and your task is to generate 3 to 5 critical clarifying questions that would help diagnose this _specific_ issue.  Do not provide a solution yet.  Just ask questions.

If internal knowledge base documents are provided, and they mention troubleshooting steps for this kind of issue, ask whether the user has already tried them.

## Formatting

Write the questions in a single block of text.  Separate each question with a double pipe symbol `||`.  Do not number the questions, and do not add any other text.

Example: Is the light blinking?||Have you tried restarting?||When did this start?
"#####;

/// Diagnosis directive.
pub const DIAGNOSIS_DIRECTIVE: &str = r#####"
# Prime Directive

You are an expert tier 2 technical support agent.  You will be given a user's original issue, and the clarifying questions they have answered.  Provide a final technical diagnosis and a solution based on these answers.

If internal knowledge base documents are provided, they are the priority source: always prefer a solution found there over general knowledge.

## Format

1. **Diagnosis**: What is likely wrong.
2. **Solution**: A step-by-step fix.
"#####;

/// Escalation ticket directive.
pub const ESCALATION_DIRECTIVE: &str = r#####"
# Prime Directive

You are a support ticket generator.  The user was working through an AI triage conversation, and the issue is now being escalated to a human agent.  Write a formal escalation ticket.

## Format

- Header: `Ticket #<ticket id> - Escalated to Human Support`
- Section 1: User Details & Original Issue.
- Section 2: Diagnostic Summary.  Briefly summarize the Q&A log, and state why the issue was escalated.  If the log is empty, say that the user provided no answers.
- Section 3: Action Required.  A human agent must follow up with the user.
"#####;

/// Standalone ticket reply directive.
pub const TICKET_DIRECTIVE: &str = r#####"
# Prime Directive

You are a support desk agent writing the formal reply to a newly submitted support ticket.  If the internal knowledge base documents contain a solution for the issue, include it.

## Format

- Header with the ticket ID, category, and priority.
- A short greeting addressed to the user by name.
- Root cause analysis: what is most likely causing the issue.
- Numbered steps the user can follow.
- A closing that tells the user how to follow up on the ticket.
"#####;

/// Quick-help directive.
pub const QUICK_HELP_DIRECTIVE: &str = r#####"
# Prime Directive

You are a helpful IT assistant.  The user is about to submit a support ticket with the description below.  Provide exactly 3 concise "quick fix" suggestions they can try first, based on the internal knowledge base if it applies.

## Format

Return exactly 3 bullet points, each on its own line and starting with `- `.  Do not add any other text.
"#####;

/// Task-specific prompt builders.
///
/// Holds the directive for each task so that deployments can override them from
/// configuration; all other content comes from the builder inputs.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub question_directive: String,
    pub diagnosis_directive: String,
    pub escalation_directive: String,
    pub ticket_directive: String,
    pub quick_help_directive: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            question_directive: QUESTION_DIRECTIVE.to_string(),
            diagnosis_directive: DIAGNOSIS_DIRECTIVE.to_string(),
            escalation_directive: ESCALATION_DIRECTIVE.to_string(),
            ticket_directive: TICKET_DIRECTIVE.to_string(),
            quick_help_directive: QUICK_HELP_DIRECTIVE.to_string(),
        }
    }
}

impl From<&Config> for Prompts {
    fn from(config: &Config) -> Self {
        Self {
            question_directive: config.question_directive.clone(),
            diagnosis_directive: config.diagnosis_directive.clone(),
            escalation_directive: config.escalation_directive.clone(),
            ticket_directive: config.ticket_directive.clone(),
            quick_help_directive: config.quick_help_directive.clone(),
        }
    }
}

impl Prompts {
    /// Build the clarifying-question prompt.
    pub fn build_question_prompt(&self, issue: &str, knowledge: Option<&str>) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage::system(self.question_directive.clone())];
        push_knowledge(&mut messages, knowledge);
        messages.push(PromptMessage::user(format!("# User Issue\n\n{issue}\n\n")));

        messages
    }

    /// Build the diagnosis prompt from the issue and the full Q&A history.
    pub fn build_diagnosis_prompt(&self, issue: &str, qa_history: &[QaPair], knowledge: Option<&str>) -> Vec<PromptMessage> {
        let history = if qa_history.is_empty() {
            "No clarifying questions were answered.".to_string()
        } else {
            qa_history.iter().map(|qa| format!("Q: {}\nA: {}", qa.question, qa.answer)).collect::<Vec<_>>().join("\n")
        };

        let mut messages = vec![PromptMessage::system(self.diagnosis_directive.clone())];
        push_knowledge(&mut messages, knowledge);
        messages.push(PromptMessage::user(format!("# User Issue\n\n{issue}\n\n## Clarifying Q&A\n\n{history}\n\n")));

        messages
    }

    /// Build the escalation ticket prompt.
    ///
    /// The history may be empty, partial, or complete; it is always rendered in full.
    pub fn build_escalation_prompt(&self, name: &str, email: &str, issue: &str, qa_history: &[QaPair], ticket_id: &TicketId, reason: EscalationReason) -> Vec<PromptMessage> {
        let history = if qa_history.is_empty() {
            "User provided no answers.".to_string()
        } else {
            qa_history.iter().map(|qa| format!("- Q: {}\n  A: {}", qa.question, qa.answer)).collect::<Vec<_>>().join("\n")
        };

        let reason = match reason {
            EscalationReason::UserAbandoned => "The user stopped the AI triage before it finished and asked for a human.  No AI diagnosis was attempted, so the log below is partial.",
            EscalationReason::DiagnosisRejected => "The user completed the AI triage, but the AI diagnosis did not solve the problem.",
            EscalationReason::Direct => "The issue was escalated directly to human support.",
        };

        vec![
            PromptMessage::system(self.escalation_directive.clone()),
            PromptMessage::system(format!("## Escalation Context\n\n{reason}\n\n")),
            PromptMessage::user(format!(
                "## User\n\n{name} ({email})\n\n## Ticket ID\n\n{ticket_id}\n\n## Original Issue\n\n{issue}\n\n## AI Chat Log\n\n{history}\n\n"
            )),
        ]
    }

    /// Build the standalone support ticket prompt.
    pub fn build_ticket_prompt(&self, request: &TicketRequest, ticket_id: &TicketId, knowledge: Option<&str>) -> Vec<PromptMessage> {
        let subject = request.subject.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or("(none)");

        let mut messages = vec![PromptMessage::system(self.ticket_directive.clone())];
        push_knowledge(&mut messages, knowledge);
        messages.push(PromptMessage::user(format!(
            "## Ticket Details\n\nTicket ID: {ticket_id}\nUser: {} ({})\nSubject: {subject}\nCategory: {:?}\nPriority: {:?}\n\n## Issue\n\n{}\n\n",
            request.full_name, request.email, request.category, request.priority, request.description
        )));

        messages
    }

    /// Build the quick-help prompt.
    pub fn build_quick_help_prompt(&self, description: &str, knowledge: Option<&str>) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage::system(self.quick_help_directive.clone())];
        push_knowledge(&mut messages, knowledge);
        messages.push(PromptMessage::user(format!("# Ticket Description\n\n{description}\n\n")));

        messages
    }
}

fn push_knowledge(messages: &mut Vec<PromptMessage>, knowledge: Option<&str>) {
    if let Some(knowledge) = knowledge {
        messages.push(PromptMessage::system(format!("## Internal Knowledge Base\n\n{knowledge}\n\n")));
    }
}

// Parsers.

/// Split the model's question block into individual questions.
///
/// Questions are separated by `||`; segments are trimmed and empty ones dropped.  A question
/// containing `||` itself cannot survive this format.  When the reply has no delimiter at all,
/// it is read as one question per line instead, with list markers removed.
pub fn parse_questions(text: &str) -> Vec<String> {
    let questions: Vec<&str> = if text.contains(QUESTION_DELIMITER) {
        text.split(QUESTION_DELIMITER).map(str::trim).collect()
    } else {
        text.lines().map(strip_list_marker).collect()
    };

    questions.into_iter().filter(|q| !q.is_empty()).map(str::to_string).collect()
}

/// Extract bullet suggestions from the model's quick-help reply.
///
/// Bulleted or numbered lines are preferred; without any, every non-empty line counts.
/// At most `limit` suggestions are returned.
pub fn parse_suggestions(text: &str, limit: usize) -> Vec<String> {
    let lines = text.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>();
    let bulleted = lines.iter().filter(|line| has_list_marker(line)).copied().collect::<Vec<_>>();

    let source = if bulleted.is_empty() { lines } else { bulleted };

    source.into_iter().map(strip_list_marker).filter(|s| !s.is_empty()).take(limit).map(str::to_string).collect()
}

fn has_list_marker(line: &str) -> bool {
    strip_list_marker(line).len() != line.trim().len()
}

/// Remove a leading `-`, `*`, `•`, `1.` or `1)` marker.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();

    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }

    line
}

// Tests.
