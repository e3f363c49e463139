//! Remote workflow (n8n) tier.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ProviderResult, RemoteProvider};
use crate::{ChatRequest, Error, Result};

/// Upper bound for one workflow call.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Returned when no webhook URL is configured.
pub const UNAVAILABLE_MESSAGE: &str = "service unavailable";

/// Returned on any runtime failure of the workflow call.
pub const SERVICE_ERROR_MESSAGE: &str =
    "Le service est temporairement indisponible. Veuillez réessayer plus tard.";

/// Reply fields checked in priority order.
const REPLY_FIELDS: [&str; 4] = ["output", "response", "text", "message"];

/// Body sent to the workflow webhook.
#[derive(Debug, Serialize)]
struct WorkflowPayload<'a> {
    message: &'a str,
    language: &'a str,
    context: Option<&'a Map<String, Value>>,
}

/// Decoded shape of a workflow reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowReply {
    /// Object carrying one of the known reply fields.
    Field { field: &'static str, text: String },
    /// Bare JSON string.
    Bare(String),
    /// Anything else.
    Unrecognized,
}

impl WorkflowReply {
    /// Decode a reply body.
    ///
    /// Objects are searched for `output`, `response`, `text` and `message`
    /// in that order; the first string that is non-empty after trimming wins.
    pub fn decode(value: &Value) -> Self {
        match value {
            Value::Object(fields) => REPLY_FIELDS
                .iter()
                .find_map(|&field| {
                    fields
                        .get(field)
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|text| !text.is_empty())
                        .map(|text| WorkflowReply::Field {
                            field,
                            text: text.to_string(),
                        })
                })
                .unwrap_or(WorkflowReply::Unrecognized),
            Value::String(text) if !text.trim().is_empty() => {
                WorkflowReply::Bare(text.trim().to_string())
            }
            _ => WorkflowReply::Unrecognized,
        }
    }

    /// Reply text, if the shape was recognized.
    pub fn into_text(self) -> Option<String> {
        match self {
            WorkflowReply::Field { text, .. } | WorkflowReply::Bare(text) => Some(text),
            WorkflowReply::Unrecognized => None,
        }
    }
}

/// Client for the remote workflow agent.
pub struct WorkflowTier {
    url: Option<String>,
    client: reqwest::Client,
}

impl WorkflowTier {
    /// Create a tier; `None` leaves it unconfigured.
    pub fn new(url: Option<String>) -> Self {
        Self::with_timeout(url, REMOTE_TIMEOUT)
    }

    /// Create a tier with a custom call timeout.
    pub fn with_timeout(url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { url, client }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    async fn call(&self, url: &str, request: &ChatRequest) -> Result<String> {
        let payload = WorkflowPayload {
            message: &request.message,
            language: &request.language,
            context: request.context.as_ref(),
        };

        let response = self.client.post(url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "workflow returned {}: {}",
                status,
                preview(&body)
            )));
        }

        let value: Value = response.json().await?;
        match WorkflowReply::decode(&value) {
            WorkflowReply::Field { field, text } => {
                debug!(field, "Workflow reply decoded");
                Ok(text)
            }
            WorkflowReply::Bare(text) => Ok(text),
            WorkflowReply::Unrecognized => Err(Error::Provider(format!(
                "unrecognized workflow reply: {}",
                preview(&value.to_string())
            ))),
        }
    }
}

#[async_trait]
impl RemoteProvider for WorkflowTier {
    async fn attempt(&self, request: &ChatRequest) -> ProviderResult {
        let Some(url) = self.url.as_deref() else {
            return ProviderResult::unconfigured(UNAVAILABLE_MESSAGE);
        };

        match self.call(url, request).await {
            Ok(text) => ProviderResult::success(text),
            Err(e) => {
                warn!("Workflow call failed: {}", e);
                ProviderResult::failed(SERVICE_ERROR_MESSAGE)
            }
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::{serve_once, serve_silence};
    use crate::providers::FailureReason;
    use serde_json::json;

    #[test]
    fn test_decode_field_priority() {
        let reply = WorkflowReply::decode(&json!({
            "message": "from message",
            "text": "from text",
            "output": "  ",
            "response": "from response"
        }));
        assert_eq!(
            reply,
            WorkflowReply::Field {
                field: "response",
                text: "from response".to_string()
            }
        );
    }

    #[test]
    fn test_decode_output_beats_later_fields() {
        let reply = WorkflowReply::decode(&json!({"response": "B", "output": "A", "text": "C"}));
        assert_eq!(
            reply,
            WorkflowReply::Field {
                field: "output",
                text: "A".to_string()
            }
        );
    }

    #[test]
    fn test_decode_skips_non_strings() {
        let reply = WorkflowReply::decode(&json!({"output": {"nested": true}, "text": "ok"}));
        assert_eq!(reply.into_text().as_deref(), Some("ok"));
    }

    #[test]
    fn test_decode_bare_and_unrecognized() {
        assert_eq!(
            WorkflowReply::decode(&json!("Bonjour")),
            WorkflowReply::Bare("Bonjour".to_string())
        );
        assert_eq!(WorkflowReply::decode(&json!("   ")), WorkflowReply::Unrecognized);
        assert_eq!(WorkflowReply::decode(&json!(["a"])), WorkflowReply::Unrecognized);
        assert_eq!(WorkflowReply::decode(&json!({"data": "x"})), WorkflowReply::Unrecognized);
        assert_eq!(WorkflowReply::decode(&json!(42)), WorkflowReply::Unrecognized);
    }

    #[tokio::test]
    async fn test_unconfigured_makes_no_call() {
        let tier = WorkflowTier::new(None);
        let result = tier.attempt(&ChatRequest::new("Bonjour", "fr")).await;
        assert!(!result.succeeded);
        assert_eq!(result.text, UNAVAILABLE_MESSAGE);
        assert_eq!(result.failure, Some(FailureReason::ConfigurationGap));
    }

    #[tokio::test]
    async fn test_response_field_is_returned() {
        let (url, server) = serve_once(200, r#"{"response": "X"}"#).await;
        let tier = WorkflowTier::new(Some(format!("{}/webhook/chat", url)));

        let mut context = Map::new();
        context.insert("page".to_string(), json!("services"));
        let request = ChatRequest::new("Quels services ?", "fr").with_context(context);

        let result = tier.attempt(&request).await;
        assert_eq!(result, ProviderResult::success("X"));

        let captured = server.await.unwrap();
        assert_eq!(captured.method, "POST");
        assert_eq!(captured.path, "/webhook/chat");
        let sent: Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(sent["message"], "Quels services ?");
        assert_eq!(sent["language"], "fr");
        assert_eq!(sent["context"]["page"], "services");
    }

    #[tokio::test]
    async fn test_bare_string_reply() {
        let (url, _server) = serve_once(200, r#""Salut !""#).await;
        let tier = WorkflowTier::new(Some(url));
        let result = tier.attempt(&ChatRequest::new("Salut", "fr")).await;
        assert_eq!(result.text, "Salut !");
        assert!(result.succeeded);
    }

    #[tokio::test]
    async fn test_error_status_is_transient_failure() {
        let (url, _server) = serve_once(502, r#"{"response": "gateway says hi"}"#).await;
        let tier = WorkflowTier::new(Some(url));
        let result = tier.attempt(&ChatRequest::new("Salut", "fr")).await;
        assert_eq!(result, ProviderResult::failed(SERVICE_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_unrecognized_shape_is_failure() {
        let (url, _server) = serve_once(200, r#"{"data": {"answer": "x"}}"#).await;
        let tier = WorkflowTier::new(Some(url));
        let result = tier.attempt(&ChatRequest::new("Salut", "fr")).await;
        assert_eq!(result.failure, Some(FailureReason::Transient));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let (url, _server) = serve_silence().await;
        let tier = WorkflowTier::with_timeout(Some(url), Duration::from_millis(200));
        let result = tier.attempt(&ChatRequest::new("Salut", "fr")).await;
        assert_eq!(result, ProviderResult::failed(SERVICE_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let tier = WorkflowTier::new(Some("http://127.0.0.1:9/hook".to_string()));
        let result = tier.attempt(&ChatRequest::new("Salut", "fr")).await;
        assert!(!result.succeeded);
    }
}
