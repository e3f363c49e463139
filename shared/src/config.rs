//! Configuration management for the chat Lambda functions.

use std::env;
use std::path::PathBuf;

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default location of the system prompt catalog.
pub const DEFAULT_SYSTEM_PROMPTS_PATH: &str = "config/system_prompts.json";

/// Default location of the canned response catalog.
pub const DEFAULT_FALLBACK_RESPONSES_PATH: &str = "config/fallback_responses.json";

/// Application configuration loaded from environment variables.
///
/// Every field is optional in practice: a missing value disables the tier
/// that needs it instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote workflow (n8n) webhook URL
    pub n8n_webhook_url: Option<String>,
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// ARN of a secret holding the OpenAI API key
    pub openai_api_key_secret_arn: Option<String>,
    /// OpenAI-compatible API base URL
    pub openai_base_url: String,
    /// Path of the system prompt catalog (JSON)
    pub system_prompts_path: PathBuf,
    /// Path of the canned response catalog (JSON)
    pub fallback_responses_path: PathBuf,
    /// Debug flag reported by the status endpoint
    pub debug: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            n8n_webhook_url: non_blank("N8N_WEBHOOK_URL"),
            openai_api_key: non_blank("OPENAI_API_KEY"),
            openai_api_key_secret_arn: non_blank("OPENAI_API_KEY_SECRET_ARN"),
            openai_base_url: non_blank("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            system_prompts_path: non_blank("SYSTEM_PROMPTS_PATH")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPTS_PATH.to_string())
                .into(),
            fallback_responses_path: non_blank("FALLBACK_RESPONSES_PATH")
                .unwrap_or_else(|| DEFAULT_FALLBACK_RESPONSES_PATH.to_string())
                .into(),
            debug: env::var("DEBUG")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n8n_webhook_url: None,
            openai_api_key: None,
            openai_api_key_secret_arn: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            system_prompts_path: DEFAULT_SYSTEM_PROMPTS_PATH.into(),
            fallback_responses_path: DEFAULT_FALLBACK_RESPONSES_PATH.into(),
            debug: false,
        }
    }
}

/// Read an env var, treating blank values as unset.
fn non_blank(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
