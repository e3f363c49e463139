//! Chat Lambda - Handles the /chat endpoint.
//!
//! Parses the chat request, runs the provider cascade (n8n workflow, OpenAI,
//! canned responses) and returns whichever answer the cascade settled on.
//! Rate limiting and CORS are handled by API Gateway in front of this function.

use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_from, error_response, json_response};
use shared::{resolve_openai_api_key, Cascade, Catalog, ChatRequest, Config};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Characters of the user message kept in logs.
const LOG_PREVIEW_CHARS: usize = 100;

/// Application state shared across requests.
struct AppState {
    cascade: Arc<Cascade>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env();
        let catalog = Arc::new(Catalog::load(
            &config.system_prompts_path,
            &config.fallback_responses_path,
        ));
        let openai_api_key = resolve_openai_api_key(&config).await;

        Ok(Self::with_cascade(Cascade::from_config(
            &config,
            openai_api_key,
            catalog,
        )))
    }

    fn with_cascade(cascade: Cascade) -> Self {
        Self {
            cascade: Arc::new(cascade),
        }
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    if event.method() != Method::POST {
        return error_response(405, "method_not_allowed", "Method not allowed");
    }

    let request_id = Uuid::new_v4();

    let request: ChatRequest = shared::parse_body!(event.body());
    let request = match request.validated() {
        Ok(request) => request,
        Err(e) => {
            warn!(%request_id, "Rejected chat request: {}", e);
            return error_from(&e);
        }
    };

    info!(
        %request_id,
        language = %request.language,
        message = %preview(&request.message),
        "Chat request started"
    );

    let started = Instant::now();
    let cascade = Arc::clone(&state.cascade);
    // A panic inside the cascade surfaces here as a JoinError.
    let outcome = tokio::spawn(async move { cascade.respond(&request).await }).await;

    match outcome {
        Ok(response) => {
            info!(
                %request_id,
                provenance = response.provenance_tag(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Chat request completed"
            );
            json_response(200, &response)
        }
        Err(e) => {
            error!(%request_id, "Chat cascade aborted: {}", e);
            error_from(&shared::Error::Internal(e.to_string()))
        }
    }
}

fn preview(message: &str) -> String {
    if message.chars().count() > LOG_PREVIEW_CHARS {
        let head: String = message.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
