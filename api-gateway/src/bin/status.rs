//! Status Lambda - Handles /health and /api/v1/status.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::http::{error_response, json_response};
use shared::Config;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "kokotajlo-backend";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    features: [&'static str; 4],
    debug: bool,
}

async fn handler(config: Arc<Config>, event: Request) -> Result<Response<Body>, Error> {
    let path = event.uri().path().trim_end_matches('/');

    if path.ends_with("/health") {
        return json_response(
            200,
            &HealthResponse {
                status: "healthy",
                service: SERVICE_NAME,
            },
        );
    }

    if path.ends_with("/api/v1/status") {
        return json_response(
            200,
            &StatusResponse {
                status: "operational",
                version: env!("CARGO_PKG_VERSION"),
                features: ["chatbot", "n8n", "openai", "fallback"],
                debug: config.debug,
            },
        );
    }

    error_response(404, "not_found", "Not found")
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    run(service_fn(move |event| {
        let config = Arc::clone(&config);
        async move { handler(config, event).await }
    }))
    .await
}
