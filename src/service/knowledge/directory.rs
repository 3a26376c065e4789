//! Knowledge snippets read from a local directory of text documents.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::base::config::Config;

use super::{GenericKnowledgeClient, KnowledgeClient};

/// Returned when the knowledge directory did not exist (it is created on the spot).
pub const NO_KNOWLEDGE_BASE: &str = "No internal knowledge base documents found.";

/// Returned when the knowledge directory holds no readable documents.
pub const NO_DOCUMENTS: &str = "No internal documents found.";

/// Appended when the context was cut to the configured size.
pub const TRUNCATION_MARKER: &str = "\n[... knowledge base truncated ...]\n";

const DOCUMENT_EXTENSIONS: [&str; 2] = ["txt", "md"];

// Extra methods on `KnowledgeClient` applied by the directory implementation.

impl KnowledgeClient {
    /// Creates the knowledge client described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        if !config.knowledge_base_enabled {
            return Self::disabled();
        }

        Self::directory(config.knowledge_base_dir.clone(), config.knowledge_base_max_chars)
    }

    /// Creates a knowledge client reading from `dir`.
    pub fn directory(dir: impl Into<PathBuf>, max_chars: Option<usize>) -> Self {
        Self {
            inner: Arc::new(DirectoryKnowledgeClient { dir: dir.into(), max_chars }),
        }
    }
}

// Structs.

/// Reads every `.txt` and `.md` file in a directory.
pub struct DirectoryKnowledgeClient {
    dir: PathBuf,
    max_chars: Option<usize>,
}

#[async_trait]
impl GenericKnowledgeClient for DirectoryKnowledgeClient {
    #[instrument(name = "DirectoryKnowledgeClient::load_context", skip_all, fields(dir = %self.dir.display()))]
    async fn load_context(&self) -> String {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            info!("Knowledge base directory not found, creating it.");

            if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
                warn!("Failed to create knowledge base directory: {err}");
            }

            return NO_KNOWLEDGE_BASE.to_string();
        }

        let files = list_documents(&self.dir).await;
        let mut context = String::new();

        for path in &files {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    context.push_str(&format!("\n--- DOCUMENT: {name} ---\n"));
                    context.push_str(&text);
                    context.push('\n');
                }
                Err(err) => warn!("Skipping unreadable knowledge document `{name}`: {err}"),
            }
        }

        if context.is_empty() {
            return NO_DOCUMENTS.to_string();
        }

        if let Some(max_chars) = self.max_chars {
            truncate_context(&mut context, max_chars);
        }

        info!("Loaded {} knowledge documents ({} bytes).", files.len(), context.len());

        context
    }
}

// Helpers.

/// List the document files in `dir`, sorted by file name.
async fn list_documents(dir: &Path) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to list knowledge base directory: {err}");
            return Vec::new();
        }
    };

    let mut files = Vec::new();

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if is_document(&path) {
                    files.push(path);
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!("Failed to read knowledge base directory entry: {err}");
                break;
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Cut `context` to at most `max_chars` characters, marking the cut.
fn truncate_context(context: &mut String, max_chars: usize) {
    if let Some((byte_index, _)) = context.char_indices().nth(max_chars) {
        warn!("Knowledge context exceeds {max_chars} characters; truncating.");

        context.truncate(byte_index);
        context.push_str(TRUNCATION_MARKER);
    }
}

// Tests.
