//! Static prompt and canned response catalog.
//!
//! Both halves are loaded once at startup from JSON files and never change
//! afterwards. Loading is best-effort: a missing or malformed source leaves
//! that half empty, and every lookup degrades to a hardcoded last resort, so
//! lookups never fail.
//!
//! `system_prompts.json`:
//! ```json
//! { "general": "Tu es l'assistant...", "services": "..." }
//! ```
//!
//! `fallback_responses.json`:
//! ```json
//! { "fr": { "general": ["...", "..."] }, "en": { "general": ["..."] } }
//! ```

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::context::GENERAL_CONTEXT;
use crate::{Error, Result};

/// Language used as the last catalog fallback for canned responses.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Prompt used when the catalog has neither the requested key nor "general".
pub const LAST_RESORT_PROMPT: &str = "Tu es l'assistant virtuel de Kokotajlo, une équipe qui conçoit \
    des agents IA pour les entreprises françaises. Réponds de façon concise, utile et professionnelle, \
    dans la langue de l'utilisateur. / You are Kokotajlo's virtual assistant. Answer concisely, \
    helpfully and professionally, in the user's language.";

/// Canned answer used when the catalog has no usable response list.
pub const LAST_RESORT_GREETING: &str =
    "Bonjour ! Je suis l'assistant de Kokotajlo. Comment puis-je vous aider aujourd'hui ?";

/// Context key → system prompt.
pub type PromptCatalog = HashMap<String, String>;

/// Language → context key → canned responses.
pub type ResponseCatalog = HashMap<String, HashMap<String, Vec<String>>>;

/// Read-only prompt and response catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    prompts: PromptCatalog,
    responses: ResponseCatalog,
    last_resort: Vec<String>,
}

impl Catalog {
    /// Build a catalog from in-memory tables.
    pub fn new(prompts: PromptCatalog, responses: ResponseCatalog) -> Self {
        Self {
            prompts,
            responses,
            last_resort: vec![LAST_RESORT_GREETING.to_string()],
        }
    }

    /// A catalog with no entries; every lookup hits the hardcoded fallbacks.
    pub fn empty() -> Self {
        Self::new(HashMap::new(), HashMap::new())
    }

    /// Load both catalog halves, degrading to empty tables on any error.
    pub fn load(prompts_path: &Path, responses_path: &Path) -> Self {
        let prompts: PromptCatalog = load_source(prompts_path).unwrap_or_else(|e| {
            warn!("System prompts unavailable ({}): {}", prompts_path.display(), e);
            HashMap::new()
        });
        let responses: ResponseCatalog = load_source(responses_path).unwrap_or_else(|e| {
            warn!(
                "Fallback responses unavailable ({}): {}",
                responses_path.display(),
                e
            );
            HashMap::new()
        });

        let catalog = Self::new(prompts, responses);
        info!(
            prompts = catalog.prompt_count(),
            languages = catalog.responses.len(),
            responses = catalog.response_count(),
            "Catalog loaded"
        );
        catalog
    }

    /// Number of system prompts.
    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    /// Total number of canned responses across languages and contexts.
    pub fn response_count(&self) -> usize {
        self.responses
            .values()
            .flat_map(|contexts| contexts.values())
            .map(Vec::len)
            .sum()
    }

    /// System prompt for a context key.
    ///
    /// Falls back to the "general" prompt, then to [`LAST_RESORT_PROMPT`].
    pub fn system_prompt(&self, context_key: &str) -> String {
        if let Some(prompt) = self.prompts.get(context_key) {
            return prompt.clone();
        }

        if context_key != GENERAL_CONTEXT {
            warn!(context_key, "No system prompt for context, using general");
            if let Some(prompt) = self.prompts.get(GENERAL_CONTEXT) {
                return prompt.clone();
            }
        }

        warn!("No general system prompt, using last-resort prompt");
        LAST_RESORT_PROMPT.to_string()
    }

    /// Canned responses for a language and context key. Never empty.
    ///
    /// Lookup order: `(language, key)`, `(language, "general")`,
    /// `("en", "general")`, then a single hardcoded greeting.
    pub fn fallback_responses(&self, language: &str, context_key: &str) -> &[String] {
        if let Some(list) = self.lookup(language, context_key) {
            return list;
        }

        warn!(language, context_key, "No canned responses, trying general");
        if let Some(list) = self.lookup(language, GENERAL_CONTEXT) {
            return list;
        }

        warn!(language, "No general canned responses, trying English");
        if let Some(list) = self.lookup(FALLBACK_LANGUAGE, GENERAL_CONTEXT) {
            return list;
        }

        warn!("Canned response catalog empty, using last-resort greeting");
        &self.last_resort
    }

    fn lookup(&self, language: &str, context_key: &str) -> Option<&[String]> {
        self.responses
            .get(language)
            .and_then(|contexts| contexts.get(context_key))
            .filter(|list| !list.is_empty())
            .map(Vec::as_slice)
    }
}

/// Read and decode one JSON catalog source.
fn load_source<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Catalog(format!("{} is not a valid catalog: {}", path.display(), e)))
}
