//! Error handling for kstats
//!
//! Provides a unified error type and result type for use across all kstats components.
//! Every failure is cycle-scoped: callers log or report it and carry on with the
//! next collection cycle.

/// Result type alias for kstats operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for kstats
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Stats or metadata endpoint unreachable, or its response was malformed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Auxiliary lookup failed (claim or volume not found, claim without a bound volume)
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Downstream consumer refused the batch
    #[error("Consumer rejected metrics: {0}")]
    ConsumerRejection(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// An external cancellation signal aborted the operation
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration parsing errors
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a consumer rejection error
    pub fn consumer_rejection(msg: impl Into<String>) -> Self {
        Self::ConsumerRejection(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Check if this error is retryable on a later cycle
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Http(_) | Error::Cancelled(_) | Error::ConsumerRejection(_)
        )
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Resolution(_) => "resolution",
            Error::ConsumerRejection(_) => "consumer_rejection",
            Error::InvalidConfiguration(_) => "configuration",
            Error::Cancelled(_) => "cancelled",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Config(_) => "config",
            Error::Http(_) => "http",
            Error::Other(_) => "other",
        }
    }
}
