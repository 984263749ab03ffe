//! Error types for the mail advisor.

use std::time::Duration;

/// Errors raised while assembling components at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Configuration-related errors. Raised at startup, before any pipeline step.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mailbox and handoff-file errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to fetch mail on channel {name}: {reason}")]
    FetchFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Handoff file {path} failed: {reason}")]
    Handoff { path: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Data-service tool call errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} request failed: {reason}")]
    RequestFailed { name: String, reason: String },

    #[error("Tool {name} response could not be read: {reason}")]
    ResponseUnreadable { name: String, reason: String },
}

/// Errors that abort an orchestration run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Mailbox fetch failed: {0}")]
    MailboxFetch(ChannelError),

    #[error("Handoff failed: {0}")]
    Handoff(ChannelError),

    #[error("Reply send failed: {0}")]
    ReplySend(ChannelError),

    #[error("No stored message to replay in {0}")]
    NothingToReplay(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
