//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::{Res, Void};

/// Default OpenAI model to use.
fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

/// Default max output tokens for the OpenAI model.
fn default_openai_max_tokens() -> u32 {
    4096
}

/// Default per-request timeout, in seconds.
fn default_openai_request_timeout_secs() -> u64 {
    120
}

/// Default sampling temperature for question generation.
fn default_question_temperature() -> f32 {
    0.5
}

/// Default sampling temperature for diagnosis generation.
fn default_diagnosis_temperature() -> f32 {
    0.3
}

/// Default sampling temperature for quick-help suggestions.
fn default_quick_help_temperature() -> f32 {
    0.7
}

/// Default sampling temperature for ticket drafting.
fn default_ticket_temperature() -> f32 {
    0.7
}

/// Default sampling temperature for escalation tickets.
fn default_escalation_temperature() -> f32 {
    0.7
}

fn default_question_directive() -> String {
    prompts::QUESTION_DIRECTIVE.to_string()
}

fn default_diagnosis_directive() -> String {
    prompts::DIAGNOSIS_DIRECTIVE.to_string()
}

fn default_escalation_directive() -> String {
    prompts::ESCALATION_DIRECTIVE.to_string()
}

fn default_ticket_directive() -> String {
    prompts::TICKET_DIRECTIVE.to_string()
}

fn default_quick_help_directive() -> String {
    prompts::QUICK_HELP_DIRECTIVE.to_string()
}

/// Default knowledge base directory.
fn default_knowledge_base_dir() -> PathBuf {
    PathBuf::from("knowledge_base")
}

fn default_true() -> bool {
    true
}

/// Default address for the HTTP server.
fn default_server_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// Default database endpoint (in-memory).
fn default_db_endpoint() -> String {
    "mem://".to_string()
}

fn default_db_namespace() -> String {
    "support".to_string()
}

fn default_db_database() -> String {
    "triage".to_string()
}

/// Configuration for the support-triage application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).  When absent, every generation fails with `NotConfigured`.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// OpenAI model to use (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Optional API base URL for OpenAI-compatible providers (`OPENAI_API_BASE`).
    #[serde(default)]
    pub openai_api_base: Option<String>,
    /// Max output tokens for the OpenAI model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Per-request timeout in seconds (`OPENAI_REQUEST_TIMEOUT_SECS`).
    #[serde(default = "default_openai_request_timeout_secs")]
    pub openai_request_timeout_secs: u64,
    /// Retries after a failed or timed out request (`OPENAI_MAX_RETRIES`).
    /// Zero, the default, reports the first failure immediately.
    #[serde(default)]
    pub openai_max_retries: u32,
    /// Sampling temperature for question generation (`QUESTION_TEMPERATURE`).
    #[serde(default = "default_question_temperature")]
    pub question_temperature: f32,
    /// Sampling temperature for diagnosis generation (`DIAGNOSIS_TEMPERATURE`).
    #[serde(default = "default_diagnosis_temperature")]
    pub diagnosis_temperature: f32,
    /// Sampling temperature for quick-help suggestions (`QUICK_HELP_TEMPERATURE`).
    #[serde(default = "default_quick_help_temperature")]
    pub quick_help_temperature: f32,
    /// Sampling temperature for ticket drafting (`TICKET_TEMPERATURE`).
    #[serde(default = "default_ticket_temperature")]
    pub ticket_temperature: f32,
    /// Sampling temperature for escalation tickets (`ESCALATION_TEMPERATURE`).
    #[serde(default = "default_escalation_temperature")]
    pub escalation_temperature: f32,
    /// Optional custom directive for question generation (`QUESTION_DIRECTIVE`).
    #[serde(default = "default_question_directive")]
    pub question_directive: String,
    /// Optional custom directive for diagnosis generation (`DIAGNOSIS_DIRECTIVE`).
    #[serde(default = "default_diagnosis_directive")]
    pub diagnosis_directive: String,
    /// Optional custom directive for escalation tickets (`ESCALATION_DIRECTIVE`).
    #[serde(default = "default_escalation_directive")]
    pub escalation_directive: String,
    /// Optional custom directive for ticket drafting (`TICKET_DIRECTIVE`).
    #[serde(default = "default_ticket_directive")]
    pub ticket_directive: String,
    /// Optional custom directive for quick-help suggestions (`QUICK_HELP_DIRECTIVE`).
    #[serde(default = "default_quick_help_directive")]
    pub quick_help_directive: String,
    /// Whether prompts are augmented with the knowledge base (`KNOWLEDGE_BASE_ENABLED`).
    #[serde(default = "default_true")]
    pub knowledge_base_enabled: bool,
    /// Directory holding `.txt` and `.md` reference documents (`KNOWLEDGE_BASE_DIR`).
    #[serde(default = "default_knowledge_base_dir")]
    pub knowledge_base_dir: PathBuf,
    /// Optional cap on the concatenated knowledge context, in characters (`KNOWLEDGE_BASE_MAX_CHARS`).
    #[serde(default)]
    pub knowledge_base_max_chars: Option<usize>,
    /// Address the HTTP server binds to (`SERVER_BIND_ADDRESS`).
    #[serde(default = "default_server_bind_address")]
    pub server_bind_address: String,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `mem://` or `ws://localhost:8000`.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Database username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: Option<String>,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: Option<String>,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_api_base: None,
            openai_max_tokens: default_openai_max_tokens(),
            openai_request_timeout_secs: default_openai_request_timeout_secs(),
            openai_max_retries: 0,
            question_temperature: default_question_temperature(),
            diagnosis_temperature: default_diagnosis_temperature(),
            quick_help_temperature: default_quick_help_temperature(),
            ticket_temperature: default_ticket_temperature(),
            escalation_temperature: default_escalation_temperature(),
            question_directive: default_question_directive(),
            diagnosis_directive: default_diagnosis_directive(),
            escalation_directive: default_escalation_directive(),
            ticket_directive: default_ticket_directive(),
            quick_help_directive: default_quick_help_directive(),
            knowledge_base_enabled: true,
            knowledge_base_dir: default_knowledge_base_dir(),
            knowledge_base_max_chars: None,
            server_bind_address: default_server_bind_address(),
            db_endpoint: default_db_endpoint(),
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            db_username: None,
            db_password: None,
        }
    }
}

impl Config {
    /// Load the configuration from `SUPPORT_TRIAGE_*` environment variables and an optional TOML file.
    ///
    /// The file is `explicit_path` if given, otherwise `.hidden/config.toml` when it exists.
    /// `bind_address` overrides every other source for the server address.
    pub fn load(explicit_path: Option<&std::path::Path>, bind_address: Option<&str>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("SUPPORT_TRIAGE"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        if let Some(bind_address) = bind_address {
            cfg = cfg.set_override("server_bind_address", bind_address)?;
        }

        let mut inner: ConfigInner = cfg.build()?.try_deserialize()?;

        // Fall back to the conventional variable used by OpenAI tooling.
        if inner.openai_api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
            inner.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.trim().is_empty());
        }

        inner.validate()?;

        Ok(Config::from(inner))
    }
}

impl ConfigInner {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Void {
        let temperatures = [
            ("question_temperature", self.question_temperature),
            ("diagnosis_temperature", self.diagnosis_temperature),
            ("quick_help_temperature", self.quick_help_temperature),
            ("ticket_temperature", self.ticket_temperature),
            ("escalation_temperature", self.escalation_temperature),
        ];

        for (name, value) in temperatures {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow::anyhow!("`{name}` must be between 0 and 1."));
            }
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.openai_request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("OpenAI request timeout must be at least one second."));
        }

        if self.knowledge_base_max_chars == Some(0) {
            return Err(anyhow::anyhow!("Knowledge base max chars must be positive when set."));
        }

        Ok(())
    }

    /// The API key, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}
