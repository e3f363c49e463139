//! Response providers tried by the cascade.
//!
//! Networked tiers never return errors: every failure becomes a
//! [`ProviderResult`] with `succeeded == false` and a readable `text`.

pub mod canned;
pub mod llm;
pub mod workflow;

use async_trait::async_trait;

use crate::ChatRequest;

pub use canned::CannedTier;
pub use llm::LlmTier;
pub use workflow::{WorkflowReply, WorkflowTier};

/// Why a tier did not produce an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Required URL or credential is missing; no call was made.
    ConfigurationGap,
    /// Network, timeout, status or payload failure.
    Transient,
}

impl FailureReason {
    /// Short label used in skip logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ConfigurationGap => "not configured",
            FailureReason::Transient => "runtime failure",
        }
    }
}

/// Outcome of one tier attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub text: String,
    pub succeeded: bool,
    /// Set when `succeeded` is false.
    pub failure: Option<FailureReason>,
}

impl ProviderResult {
    /// The tier answered with `text`.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            succeeded: true,
            failure: None,
        }
    }

    /// The tier was skipped without a call because it lacks a URL or credential.
    pub fn unconfigured(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            succeeded: false,
            failure: Some(FailureReason::ConfigurationGap),
        }
    }

    /// The tier made its call and it failed; `text` is a readable notice.
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            succeeded: false,
            failure: Some(FailureReason::Transient),
        }
    }
}

/// First tier: remote workflow agent.
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    async fn attempt(&self, request: &ChatRequest) -> ProviderResult;
}

/// Second tier: hosted language model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn attempt(&self, request: &ChatRequest, message: &str) -> ProviderResult;
}
