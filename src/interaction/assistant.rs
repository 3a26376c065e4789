//! Stateless triage operations.
//!
//! Each operation validates its input, loads the knowledge context, builds the task prompt,
//! calls the completion service once, and parses the reply.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        error::{TriageError, TriageResult, require_text},
        prompts::{Prompts, parse_questions, parse_suggestions},
        types::{CompletionOptions, EscalationReason, HealthStatus, PromptMessage, QaPair, Ticket, TicketId, TicketRequest},
    },
    service::{knowledge::KnowledgeClient, llm::LlmClient},
};

/// Fewest clarifying questions accepted from the model.
pub const MIN_QUESTIONS: usize = 3;

/// Most clarifying questions kept from the model.
pub const MAX_QUESTIONS: usize = 5;

/// Number of quick-help suggestions returned.
pub const QUICK_HELP_SUGGESTIONS: usize = 3;

/// Sampling temperature per task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    pub question: f32,
    pub diagnosis: f32,
    pub escalation: f32,
    pub ticket: f32,
    pub quick_help: f32,
}

impl From<&Config> for Temperatures {
    fn from(config: &Config) -> Self {
        Self {
            question: config.question_temperature,
            diagnosis: config.diagnosis_temperature,
            escalation: config.escalation_temperature,
            ticket: config.ticket_temperature,
            quick_help: config.quick_help_temperature,
        }
    }
}

/// The triage assistant.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Assistant {
    llm: LlmClient,
    knowledge: KnowledgeClient,
    prompts: Arc<Prompts>,
    temperatures: Temperatures,
}

impl Assistant {
    pub fn new(config: &Config, llm: LlmClient, knowledge: KnowledgeClient) -> Self {
        Self {
            llm,
            knowledge,
            prompts: Arc::new(Prompts::from(config)),
            temperatures: Temperatures::from(config),
        }
    }

    /// Liveness report.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "online".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Generate 3 to 5 clarifying questions for the issue.
    #[instrument(skip_all)]
    pub async fn start_chat(&self, issue: &str) -> TriageResult<Vec<String>> {
        require_text("issue", issue)?;

        let knowledge = self.knowledge_context().await;
        let messages = self.prompts.build_question_prompt(issue, knowledge.as_deref());
        let reply = self.generate(&messages, self.temperatures.question).await?;

        let mut questions = parse_questions(&reply);

        if questions.len() < MIN_QUESTIONS {
            return Err(TriageError::EmptyGeneration(format!(
                "expected at least {MIN_QUESTIONS} clarifying questions, got {}",
                questions.len()
            )));
        }

        if questions.len() > MAX_QUESTIONS {
            warn!("Model returned {} questions; keeping the first {MAX_QUESTIONS}.", questions.len());
            questions.truncate(MAX_QUESTIONS);
        }

        Ok(questions)
    }

    /// Generate a diagnosis and solution from the issue and its answered questions.
    #[instrument(skip_all)]
    pub async fn diagnose(&self, issue: &str, qa_history: &[QaPair]) -> TriageResult<String> {
        require_text("issue", issue)?;
        check_history(qa_history)?;

        let knowledge = self.knowledge_context().await;
        let messages = self.prompts.build_diagnosis_prompt(issue, qa_history, knowledge.as_deref());
        let reply = self.generate(&messages, self.temperatures.diagnosis).await?;

        non_empty(reply, "diagnosis")
    }

    /// Generate an escalation ticket for a human agent.
    #[instrument(skip_all, fields(reason = ?reason))]
    pub async fn escalate(&self, name: &str, email: &str, issue: &str, qa_history: &[QaPair], reason: EscalationReason) -> TriageResult<Ticket> {
        require_text("name", name)?;
        require_text("email", email)?;
        require_text("issue", issue)?;
        check_history(qa_history)?;

        let id = TicketId::generate();
        let messages = self.prompts.build_escalation_prompt(name, email, issue, qa_history, &id, reason);
        let body = non_empty(self.generate(&messages, self.temperatures.escalation).await?, "escalation ticket")?;

        info!("Generated escalation ticket `{id}`.");

        Ok(Ticket { id, body })
    }

    /// Draft the formal reply to a submitted support ticket.
    #[instrument(skip_all, fields(category = ?request.category, priority = ?request.priority))]
    pub async fn create_ticket(&self, request: &TicketRequest) -> TriageResult<Ticket> {
        require_text("full_name", &request.full_name)?;
        require_text("email", &request.email)?;
        require_text("description", &request.description)?;

        let id = TicketId::generate();
        let knowledge = self.knowledge_context().await;
        let messages = self.prompts.build_ticket_prompt(request, &id, knowledge.as_deref());
        let body = non_empty(self.generate(&messages, self.temperatures.ticket).await?, "ticket")?;

        info!("Generated ticket `{id}`.");

        Ok(Ticket { id, body })
    }

    /// Suggest three quick fixes to try before submitting a ticket; a reply with fewer is an error.
    #[instrument(skip_all)]
    pub async fn quick_help(&self, description: &str) -> TriageResult<Vec<String>> {
        require_text("description", description)?;

        let knowledge = self.knowledge_context().await;
        let messages = self.prompts.build_quick_help_prompt(description, knowledge.as_deref());
        let reply = self.generate(&messages, self.temperatures.quick_help).await?;

        let suggestions = parse_suggestions(&reply, QUICK_HELP_SUGGESTIONS);

        if suggestions.len() < QUICK_HELP_SUGGESTIONS {
            return Err(TriageError::EmptyGeneration(format!(
                "expected {QUICK_HELP_SUGGESTIONS} quick-help suggestions, got {}",
                suggestions.len()
            )));
        }

        Ok(suggestions)
    }

    // Helpers.

    async fn knowledge_context(&self) -> Option<String> {
        let context = self.knowledge.load_context().await;

        (!context.is_empty()).then_some(context)
    }

    async fn generate(&self, messages: &[PromptMessage], temperature: f32) -> TriageResult<String> {
        self.llm.complete(messages, CompletionOptions::with_temperature(temperature)).await
    }
}

#[cfg(test)]
impl Assistant {
    /// An assistant over `llm` with default settings and no knowledge base.
    pub(crate) fn with_llm(llm: impl crate::service::llm::GenericLlmClient) -> Self {
        Self::new(&Config::from(crate::base::config::ConfigInner::default()), LlmClient::new(Arc::new(llm)), KnowledgeClient::disabled())
    }
}

fn check_history(qa_history: &[QaPair]) -> TriageResult<()> {
    for qa in qa_history {
        require_text("question", &qa.question)?;
        require_text("answer", &qa.answer)?;
    }

    Ok(())
}

fn non_empty(reply: String, what: &str) -> TriageResult<String> {
    if reply.trim().is_empty() {
        return Err(TriageError::EmptyGeneration(format!("the {what} reply was empty")));
    }

    Ok(reply)
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        base::{
            config::ConfigInner,
            types::{Category, Priority},
        },
        service::llm::mock::MockLlm,
    };

    fn replying(reply: &'static str) -> MockLlm {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(move |_, _| Ok(reply.to_string()));
        llm
    }

    fn request() -> TicketRequest {
        TicketRequest {
            full_name: "Sam Doe".to_string(),
            email: "sam@example.com".to_string(),
            subject: None,
            category: Category::Network,
            priority: Priority::High,
            description: "VPN drops every 10 minutes".to_string(),
        }
    }

    #[tokio::test]
    async fn start_chat_returns_parsed_questions() {
        let assistant = Assistant::with_llm(replying("Is the light blinking?||Have you tried restarting?||When did this start?"));

        let questions = assistant.start_chat("router is down").await.unwrap();

        assert_eq!(questions, vec!["Is the light blinking?", "Have you tried restarting?", "When did this start?"]);
    }

    #[tokio::test]
    async fn start_chat_keeps_at_most_five_questions() {
        let assistant = Assistant::with_llm(replying("a?||b?||c?||d?||e?||f?||g?"));

        let questions = assistant.start_chat("router is down").await.unwrap();

        assert_eq!(questions, vec!["a?", "b?", "c?", "d?", "e?"]);
    }

    #[tokio::test]
    async fn start_chat_rejects_too_few_questions() {
        let assistant = Assistant::with_llm(replying("Only one question?"));

        let result = assistant.start_chat("router is down").await;

        assert!(matches!(result, Err(TriageError::EmptyGeneration(_))));
    }

    #[tokio::test]
    async fn blank_input_fails_before_any_upstream_call() {
        let assistant = Assistant::with_llm(MockLlm::new());

        assert!(matches!(assistant.start_chat("  ").await, Err(TriageError::InvalidInput(_))));
        assert!(matches!(assistant.diagnose("", &[]).await, Err(TriageError::InvalidInput(_))));
        assert!(matches!(assistant.quick_help("\n").await, Err(TriageError::InvalidInput(_))));
        assert!(matches!(
            assistant.escalate("Jane", "", "no display", &[], EscalationReason::Direct).await,
            Err(TriageError::InvalidInput(_))
        ));
        assert!(matches!(
            assistant.diagnose("no display", &[QaPair::new("Plugged in?", " ")]).await,
            Err(TriageError::InvalidInput(_))
        ));

        let mut blank = request();
        blank.full_name = " ".to_string();
        assert!(matches!(assistant.create_ticket(&blank).await, Err(TriageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn upstream_errors_pass_through() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|_, _| Err(TriageError::NotConfigured));

        let assistant = Assistant::with_llm(llm);

        assert_eq!(assistant.diagnose("no display", &[]).await, Err(TriageError::NotConfigured));
    }

    #[tokio::test]
    async fn empty_diagnosis_is_an_error() {
        let assistant = Assistant::with_llm(replying("  \n "));

        assert!(matches!(assistant.diagnose("no display", &[]).await, Err(TriageError::EmptyGeneration(_))));
    }

    #[tokio::test]
    async fn uses_task_temperatures() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .withf(|_, options| options.temperature == 0.3)
            .times(1)
            .returning(|_, _| Ok("1. **Diagnosis**: x\n2. **Solution**: y".to_string()));
        llm.expect_complete()
            .withf(|_, options| options.temperature == 0.5)
            .times(1)
            .returning(|_, _| Ok("a?||b?||c?".to_string()));

        let assistant = Assistant::with_llm(llm);

        assistant.start_chat("no display").await.unwrap();
        assistant.diagnose("no display", &[QaPair::new("Plugged in?", "Yes")]).await.unwrap();
    }

    #[tokio::test]
    async fn create_ticket_embeds_id_and_request() {
        let mut llm = MockLlm::new();
        llm.expect_complete().times(1).returning(|messages, _| {
            let user = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("REPLY\n{user}"))
        });

        let assistant = Assistant::with_llm(llm);
        let ticket = assistant.create_ticket(&request()).await.unwrap();

        assert!(ticket.body.contains(ticket.id.as_str()));
        assert!(ticket.body.contains("VPN drops every 10 minutes"));
        assert!(ticket.body.contains("Network"));
    }

    #[tokio::test]
    async fn quick_help_returns_three_suggestions() {
        let assistant = Assistant::with_llm(replying("- Restart the router\n- Check the cable\n- Rejoin the network\n- Call your ISP"));

        let suggestions = assistant.quick_help("wifi keeps dropping").await.unwrap();

        assert_eq!(suggestions, vec!["Restart the router", "Check the cable", "Rejoin the network"]);
    }

    #[tokio::test]
    async fn quick_help_rejects_too_few_suggestions() {
        let assistant = Assistant::with_llm(replying("- Restart the router\n- Check the cable"));

        let result = assistant.quick_help("wifi keeps dropping").await;

        assert!(matches!(result, Err(TriageError::EmptyGeneration(_))));
    }

    #[tokio::test]
    async fn escalation_ticket_carries_generated_id() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .withf(|messages, _| messages.iter().any(|m| m.content.contains(TicketId::PREFIX)))
            .times(1)
            .returning(|_, _| Ok("Ticket body".to_string()));

        let assistant = Assistant::with_llm(llm);
        let history = [QaPair::new("Plugged in?", "Yes")];

        let ticket = assistant.escalate("Jane", "jane@x.com", "no display", &history, EscalationReason::Direct).await.unwrap();

        assert!(ticket.id.as_str().starts_with(TicketId::PREFIX));
        assert_eq!(ticket.body, "Ticket body");
    }

    #[tokio::test]
    async fn knowledge_is_injected_when_available() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("printers.md"), "Power-cycle the printer spooler.").unwrap();

        let mut llm = MockLlm::new();
        llm.expect_complete()
            .withf(|messages, _| messages.iter().any(|m| m.content.contains("Power-cycle the printer spooler.")))
            .times(1)
            .returning(|_, _| Ok("- Restart the spooler\n- Clear the queue\n- Reinstall the driver".to_string()));

        let assistant = Assistant::new(
            &Config::from(ConfigInner::default()),
            LlmClient::new(Arc::new(llm)),
            KnowledgeClient::directory(dir.path(), None),
        );

        let suggestions = assistant.quick_help("printer stuck").await.unwrap();

        assert_eq!(suggestions, vec!["Restart the spooler", "Clear the queue", "Reinstall the driver"]);
    }

    #[test]
    fn health_reports_online() {
        let health = Assistant::with_llm(MockLlm::new()).health();

        assert_eq!(health.status, "online");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }
}
