//! Cascade orchestrator: remote workflow, then LLM, then canned responses.
//!
//! Tiers run one after another, never in parallel, and each gets exactly one
//! attempt. The first success wins and is tagged with its provenance. The
//! canned tier cannot fail, so resolution always produces an answer.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::providers::{
    CannedTier, FailureReason, LlmProvider, LlmTier, ProviderResult, RemoteProvider, WorkflowTier,
};
use crate::{Catalog, ChatRequest, ChatResponse, Config, Provenance};

/// Text chosen by the cascade and the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub provenance: Provenance,
}

enum Stage {
    TryRemote,
    TryLlm,
    TryCanned,
    Done(Resolution),
}

/// Drives the provider tiers in priority order.
pub struct Cascade {
    remote: Arc<dyn RemoteProvider>,
    llm: Arc<dyn LlmProvider>,
    canned: CannedTier,
    rng: Mutex<StdRng>,
}

impl Cascade {
    pub fn new(remote: Arc<dyn RemoteProvider>, llm: Arc<dyn LlmProvider>, canned: CannedTier) -> Self {
        Self {
            remote,
            llm,
            canned,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seed the conversation id generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Wire the production tiers.
    pub fn from_config(config: &Config, openai_api_key: Option<String>, catalog: Arc<Catalog>) -> Self {
        let remote = WorkflowTier::new(config.n8n_webhook_url.clone());
        let llm = LlmTier::new(
            openai_api_key,
            config.openai_base_url.clone(),
            Arc::clone(&catalog),
        );
        info!(
            n8n_configured = remote.is_configured(),
            openai_configured = llm.is_configured(),
            "Cascade tiers ready"
        );
        Self::new(Arc::new(remote), Arc::new(llm), CannedTier::new(catalog))
    }

    /// Run the cascade and pick the answer text.
    pub async fn resolve(&self, request: &ChatRequest) -> Resolution {
        let mut stage = Stage::TryRemote;
        loop {
            stage = match stage {
                Stage::TryRemote => {
                    let result = self.remote.attempt(request).await;
                    if result.succeeded {
                        Stage::Done(Resolution {
                            text: result.text,
                            provenance: Provenance::N8n,
                        })
                    } else {
                        log_skip(Provenance::N8n, &result);
                        Stage::TryLlm
                    }
                }
                Stage::TryLlm => {
                    let result = self.llm.attempt(request, &request.message).await;
                    if result.succeeded {
                        Stage::Done(Resolution {
                            text: result.text,
                            provenance: Provenance::OpenAi,
                        })
                    } else {
                        log_skip(Provenance::OpenAi, &result);
                        Stage::TryCanned
                    }
                }
                Stage::TryCanned => Stage::Done(Resolution {
                    text: self.canned.attempt(request),
                    provenance: Provenance::Fallback,
                }),
                Stage::Done(resolution) => {
                    info!(provenance = %resolution.provenance, "Cascade resolved");
                    return resolution;
                }
            };
        }
    }

    /// Run the cascade and build the caller-facing response.
    pub async fn respond(&self, request: &ChatRequest) -> ChatResponse {
        let resolution = self.resolve(request).await;
        ChatResponse::new(
            resolution.text,
            request.language.clone(),
            resolution.provenance,
            self.conversation_suffix(),
            Utc::now(),
        )
    }

    fn conversation_suffix(&self) -> u16 {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(1000..=9999)
    }
}

fn log_skip(tier: Provenance, result: &ProviderResult) {
    let reason = result.failure.map_or("unknown", |r| r.as_str());
    match result.failure {
        Some(FailureReason::ConfigurationGap) => {
            info!(tier = %tier, reason, "Tier skipped, moving on")
        }
        _ => warn!(tier = %tier, reason, detail = %result.text, "Tier failed, moving on"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PromptCatalog, ResponseCatalog};
    use crate::providers::stub::serve_once;
    use async_trait::async_trait;
    use std::collections::HashMap;

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct FakeRemote {
        result: ProviderResult,
        calls: CallLog,
    }

    #[async_trait]
    impl RemoteProvider for FakeRemote {
        async fn attempt(&self, _request: &ChatRequest) -> ProviderResult {
            self.calls.lock().unwrap().push("remote");
            self.result.clone()
        }
    }

    struct FakeLlm {
        result: ProviderResult,
        calls: CallLog,
    }

    #[async_trait]
    impl LlmProvider for FakeLlm {
        async fn attempt(&self, _request: &ChatRequest, message: &str) -> ProviderResult {
            assert_eq!(message, "Bonjour");
            self.calls.lock().unwrap().push("llm");
            self.result.clone()
        }
    }

    fn catalog() -> Arc<Catalog> {
        let mut responses = ResponseCatalog::new();
        responses.insert(
            "fr".to_string(),
            HashMap::from([(
                "general".to_string(),
                vec!["Réponse A".to_string(), "Réponse B".to_string()],
            )]),
        );
        Arc::new(Catalog::new(PromptCatalog::new(), responses))
    }

    fn cascade(remote: ProviderResult, llm: ProviderResult) -> (Cascade, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let cascade = Cascade::new(
            Arc::new(FakeRemote {
                result: remote,
                calls: Arc::clone(&calls),
            }),
            Arc::new(FakeLlm {
                result: llm,
                calls: Arc::clone(&calls),
            }),
            CannedTier::with_seed(catalog(), 1),
        )
        .with_seed(1);
        (cascade, calls)
    }

    fn request() -> ChatRequest {
        ChatRequest::new("Bonjour", "fr")
    }

    #[tokio::test]
    async fn test_remote_success_stops_cascade() {
        let (cascade, calls) = cascade(
            ProviderResult::success("depuis n8n"),
            ProviderResult::success("depuis openai"),
        );
        let resolution = cascade.resolve(&request()).await;
        assert_eq!(resolution.text, "depuis n8n");
        assert_eq!(resolution.provenance, Provenance::N8n);
        assert_eq!(*calls.lock().unwrap(), vec!["remote"]);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_to_llm() {
        let (cascade, calls) = cascade(
            ProviderResult::failed("boom"),
            ProviderResult::success("depuis openai"),
        );
        let resolution = cascade.resolve(&request()).await;
        assert_eq!(resolution.provenance, Provenance::OpenAi);
        assert_eq!(resolution.text, "depuis openai");
        assert_eq!(*calls.lock().unwrap(), vec!["remote", "llm"]);
    }

    #[tokio::test]
    async fn test_both_failing_uses_canned() {
        let (cascade, calls) = cascade(
            ProviderResult::unconfigured("service unavailable"),
            ProviderResult::failed("boom"),
        );
        let response = cascade.respond(&request()).await;
        assert!(["Réponse A", "Réponse B"].contains(&response.response.as_str()));
        assert_eq!(response.provenance_tag(), "fallback");
        assert_eq!(response.language, "fr");
        assert_eq!(*calls.lock().unwrap(), vec!["remote", "llm"]);
    }

    #[tokio::test]
    async fn test_tier_error_text_never_leaks() {
        let (cascade, _) = cascade(
            ProviderResult::failed("Le service est temporairement indisponible."),
            ProviderResult::failed("OpenAI exploded"),
        );
        let response = cascade.respond(&request()).await;
        assert!(!response.response.contains("indisponible"));
        assert!(!response.response.contains("OpenAI"));
    }

    #[tokio::test]
    async fn test_conversation_id_format() {
        let (cascade, _) = cascade(
            ProviderResult::success("ok"),
            ProviderResult::success("unused"),
        );
        let response = cascade.respond(&request()).await;
        let (tag, digits) = response.conversation_id.split_once('_').unwrap();
        assert_eq!(tag, "n8n");
        let suffix: u16 = digits.parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
        assert!(response.timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_unconfigured_production_tiers_use_canned() {
        let cascade = Cascade::from_config(&Config::default(), None, catalog());
        let response = cascade.respond(&request()).await;
        assert_eq!(response.provenance_tag(), "fallback");
        assert!(catalog()
            .fallback_responses("fr", "general")
            .contains(&response.response));
    }

    #[tokio::test]
    async fn test_remote_response_field_end_to_end() {
        let (url, _server) = serve_once(200, r#"{"response": "X"}"#).await;
        let config = Config {
            n8n_webhook_url: Some(url),
            ..Config::default()
        };
        let cascade = Cascade::from_config(&config, Some("sk-unused".to_string()), catalog());
        let response = cascade.respond(&request()).await;
        assert_eq!(response.response, "X");
        assert_eq!(response.provenance_tag(), "n8n");
    }

    #[tokio::test]
    async fn test_unconfigured_remote_goes_straight_to_llm() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Salut !"}}]}"#;
        let (url, server) = serve_once(200, body).await;
        let config = Config {
            openai_base_url: url,
            ..Config::default()
        };
        let cascade = Cascade::from_config(&config, Some("sk-test".to_string()), catalog());
        let response = cascade.respond(&request()).await;
        assert_eq!(response.response, "Salut !");
        assert_eq!(response.provenance_tag(), "openai");

        let captured = server.await.unwrap();
        assert_eq!(captured.path, "/chat/completions");
    }
}
