//! AWS Secrets Manager integration for provider credentials.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{Config, Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// JSON form of the OpenAI credential secret.
#[derive(Debug, Deserialize)]
struct ApiKeySecret {
    #[serde(alias = "OPENAI_API_KEY")]
    api_key: String,
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Extract the API key from a secret string.
///
/// Accepts either a JSON object (`{"api_key": "..."}`) or the raw key.
pub fn parse_api_key(secret_string: &str) -> Option<String> {
    let key = match serde_json::from_str::<ApiKeySecret>(secret_string) {
        Ok(secret) => secret.api_key,
        Err(_) => secret_string.to_string(),
    };
    let key = key.trim();
    if key.is_empty() || key.starts_with('{') {
        None
    } else {
        Some(key.to_string())
    }
}

/// Resolve the OpenAI credential: environment first, then Secrets Manager.
///
/// Any failure leaves the credential unset so the LLM tier is skipped.
pub async fn resolve_openai_api_key(config: &Config) -> Option<String> {
    if let Some(key) = &config.openai_api_key {
        return Some(key.clone());
    }

    let secret_arn = config.openai_api_key_secret_arn.as_deref()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = SecretsClient::new(&aws_config);

    match get_secret(&client, secret_arn).await {
        Ok(secret_string) => {
            let key = parse_api_key(&secret_string);
            if key.is_none() {
                warn!("OpenAI secret {} holds no usable API key", secret_arn);
            } else {
                info!("Loaded OpenAI API key from Secrets Manager");
            }
            key
        }
        Err(e) => {
            warn!("Could not load OpenAI API key: {}", e);
            None
        }
    }
}
