//! LLM integration.
//!
//! Supports:
//! - **Anthropic** and **OpenAI**: direct API access via rig-core, bridged by `RigAdapter`
//! - **Groq**, **Gemini** and any other OpenAI-compatible server: `/chat/completions`
//!   over reqwest via `OpenAiCompatProvider`
//!
//! Every model-backed component gets its own `LlmConfig`, so each one may talk
//! to a different backend and model.

pub mod openai_compat;
pub mod provider;
mod rig_adapter;
#[cfg(test)]
pub(crate) mod testing;

pub use openai_compat::OpenAiCompatProvider;
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::str::FromStr;
use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::{ConfigError, LlmError};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
    Groq,
    Gemini,
    /// Any OpenAI-compatible server; requires an explicit base URL.
    Compatible,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::Compatible => "compatible",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("claude-sonnet-4-20250514"),
            Self::OpenAi => Some("gpt-4o"),
            Self::Groq => Some("llama-3.3-70b-versatile"),
            Self::Gemini => Some("gemini-2.0-flash"),
            Self::Compatible => None,
        }
    }

    /// Base URL used when none is configured (OpenAI-compatible backends only).
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::Groq => Some(GROQ_BASE_URL),
            Self::Gemini => Some(GEMINI_BASE_URL),
            _ => None,
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "gemini" => Ok(Self::Gemini),
            "compatible" | "openai-compatible" => Ok(Self::Compatible),
            other => Err(ConfigError::InvalidValue {
                key: "LLM_BACKEND".into(),
                message: format!(
                    "unknown backend '{other}' (expected anthropic, openai, groq, gemini or compatible)"
                ),
            }),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Only used by OpenAI-compatible backends.
    pub base_url: Option<String>,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Anthropic => create_anthropic_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
        LlmBackend::Groq | LlmBackend::Gemini | LlmBackend::Compatible => {
            create_compatible_provider(config)
        }
    }
}

fn create_anthropic_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new(model, &config.model)))
}

fn create_compatible_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = config.backend.as_str();
    let base_url = config
        .base_url
        .as_deref()
        .or_else(|| config.backend.default_base_url())
        .ok_or_else(|| LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: "no base URL configured".into(),
        })?;

    tracing::info!("Using {} at {} (model: {})", provider, base_url, config.model);
    Ok(Arc::new(OpenAiCompatProvider::new(
        provider,
        base_url,
        config.api_key.clone(),
        &config.model,
    )))
}
