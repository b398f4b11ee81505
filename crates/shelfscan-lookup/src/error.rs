//! # Lookup Error Types
//!
//! Error types for catalog lookups.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Lookup Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Payload             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  Parse                  │ │
//! │  │  MissingApiKey  │  │  Http (status)  │  │                         │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Inside the pipeline every variant means "this source did not answer". │
//! │  None of them ever reach the user.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for lookup operations.
pub type LookupResult<T> = Result<T, LookupError>;

/// Lookup error type covering all provider failures.
#[derive(Debug, Error)]
pub enum LookupError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid lookup configuration.
    #[error("Invalid lookup configuration: {0}")]
    InvalidConfig(String),

    /// Provider needs an API key that is not configured.
    #[error("{0} requires an API key")]
    MissingApiKey(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Request could not be sent or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Catalog answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Provider did not answer within the configured bound.
    #[error("{provider} did not answer within {millis} ms")]
    Timeout { provider: String, millis: u64 },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Response body was not the expected JSON.
    #[error("Malformed response: {0}")]
    Parse(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Provider implementation panicked.
    #[error("Provider {0} panicked")]
    Panicked(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            LookupError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            LookupError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for LookupError {
    fn from(err: url::ParseError) -> Self {
        LookupError::InvalidUrl(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl LookupError {
    /// Returns true if asking the same provider again later could succeed.
    ///
    /// Rate limiting (429) and server errors are transient; malformed
    /// payloads and configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::Network(_) | LookupError::Timeout { .. } => true,
            LookupError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LookupError::InvalidConfig(_) | LookupError::MissingApiKey(_) | LookupError::InvalidUrl(_)
        )
    }
}
