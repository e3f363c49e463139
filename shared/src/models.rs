//! Shared data models.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::Validate;

use crate::{Error, Result};

/// Language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "fr";

/// Chat request payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    /// User's message
    #[validate(length(min = 1))]
    pub message: String,
    /// Language code ("fr", "en", ...)
    #[serde(default = "default_language", deserialize_with = "language_or_default")]
    pub language: String,
    /// Free-form page context sent by the frontend
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// `null` and blank languages fall back to the default.
fn language_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let language: Option<String> = Option::deserialize(deserializer)?;
    Ok(language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(default_language))
}

impl ChatRequest {
    /// Create a request with no context.
    pub fn new(message: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            language: language.into(),
            context: None,
        }
    }

    /// Attach a context mapping.
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Check the request before it enters the cascade.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        if self.message.trim().is_empty() {
            return Err(Error::Validation("message must not be blank".to_string()));
        }
        Ok(self)
    }
}

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "n8n")]
    N8n,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "fallback")]
    Fallback,
    /// Generic tag for responses not attributed to a tier. The cascade never
    /// produces it; it is accepted when decoding stored responses.
    #[serde(rename = "conv")]
    Conversation,
}

impl Provenance {
    /// Wire tag, also used as the conversation id prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::N8n => "n8n",
            Provenance::OpenAi => "openai",
            Provenance::Fallback => "fallback",
            Provenance::Conversation => "conv",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub language: String,
    /// ISO-8601 UTC timestamp
    pub timestamp: String,
    /// `<provenance>_<NNNN>`
    pub conversation_id: String,
}

impl ChatResponse {
    /// Build a response stamped at `at`.
    pub fn new(
        response: String,
        language: String,
        provenance: Provenance,
        suffix: u16,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            response,
            language,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            conversation_id: format!("{}_{}", provenance, suffix),
        }
    }

    /// Provenance tag encoded in the conversation id.
    pub fn provenance_tag(&self) -> &str {
        self.conversation_id
            .split_once('_')
            .map(|(tag, _)| tag)
            .unwrap_or(&self.conversation_id)
    }
}

/// Error envelope returned to HTTP callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub status_code: u16,
}

impl ErrorBody {
    pub fn new(status_code: u16, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.to_string(),
                status_code,
            },
        }
    }
}

impl From<&Error> for ErrorBody {
    fn from(error: &Error) -> Self {
        let message = match error {
            Error::Validation(msg) => msg.clone(),
            _ => "Erreur interne du serveur".to_string(),
        };
        ErrorBody::new(error.status_code(), error.kind(), message)
    }
}
