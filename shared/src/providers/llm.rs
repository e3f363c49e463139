//! Hosted language model tier (OpenAI chat completions).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{LlmProvider, ProviderResult};
use crate::context::resolve_context_key;
use crate::{Catalog, ChatRequest, Error, Result};

/// Model requested from the provider.
pub const MODEL: &str = "gpt-3.5-turbo";

/// Completion length cap.
pub const MAX_TOKENS: u32 = 200;

/// Sampling temperature.
pub const TEMPERATURE: f64 = 0.7;

/// Upper bound for one completion call.
pub const LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder credential that disables the tier.
pub const STUB_API_KEY: &str = "stub";

/// Returned when no credential is configured.
pub const UNAVAILABLE_MESSAGE: &str = "OpenAI API key not configured";

/// Returned on runtime failure of the completion call.
pub const SERVICE_ERROR_MESSAGE: &str =
    "Le service d'IA est temporairement indisponible. Veuillez réessayer plus tard.";

/// Substituted when the model answers with nothing.
pub const EMPTY_ANSWER_MESSAGE: &str =
    "Je n'ai pas pu générer de réponse. N'hésitez pas à nous contacter directement.";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionContent,
}

#[derive(Deserialize)]
struct CompletionContent {
    content: Option<String>,
}

/// Client for the language model tier.
pub struct LlmTier {
    api_key: Option<String>,
    base_url: String,
    catalog: Arc<Catalog>,
    client: reqwest::Client,
}

impl LlmTier {
    /// Create a tier. Blank and placeholder keys leave it unconfigured.
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        Self::with_timeout(api_key, base_url, catalog, LLM_TIMEOUT)
    }

    /// Create a tier with a custom call timeout.
    pub fn with_timeout(
        api_key: Option<String>,
        base_url: impl Into<String>,
        catalog: Arc<Catalog>,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != STUB_API_KEY);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog,
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// One completion call. `Ok(None)` means the model returned no text.
    async fn complete(&self, api_key: &str, system_prompt: &str, message: &str) -> Result<Option<String>> {
        let body = CompletionRequest {
            model: MODEL,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: system_prompt,
                },
                CompletionMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenAI returned {}: {}",
                status,
                error_body.chars().take(200).collect::<String>()
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

#[async_trait]
impl LlmProvider for LlmTier {
    async fn attempt(&self, request: &ChatRequest, message: &str) -> ProviderResult {
        let Some(api_key) = self.api_key.as_deref() else {
            return ProviderResult::unconfigured(UNAVAILABLE_MESSAGE);
        };

        let context_key = resolve_context_key(request.context.as_ref());
        let system_prompt = self.catalog.system_prompt(&context_key);

        match self.complete(api_key, &system_prompt, message).await {
            Ok(Some(text)) => ProviderResult::success(text),
            Ok(None) => {
                info!(context_key = %context_key, "Model returned an empty completion");
                ProviderResult::success(EMPTY_ANSWER_MESSAGE)
            }
            Err(e) => {
                warn!("OpenAI call failed: {}", e);
                ProviderResult::failed(SERVICE_ERROR_MESSAGE)
            }
        }
    }
}
