//! Shared library for the Kokotajlo chat backend.
//!
//! This crate holds the chat cascade (remote workflow, LLM, canned responses)
//! together with the configuration, error and HTTP helpers used by the Lambda
//! functions.

pub mod cascade;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod models;
pub mod providers;
pub mod secrets;

pub use cascade::{Cascade, Resolution};
pub use catalog::Catalog;
pub use config::Config;
pub use context::resolve_context_key;
pub use error::{Error, Result};
pub use models::{ChatRequest, ChatResponse, ErrorBody, Provenance};
pub use providers::{CannedTier, LlmTier, ProviderResult, WorkflowTier};
pub use secrets::{get_secret, resolve_openai_api_key};
