//! # App Error Type
//!
//! Unified error type for controller commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Shelfscan                              │
//! │                                                                         │
//! │  Presentation                Controller                                 │
//! │  ────────────                ──────────                                 │
//! │                                                                         │
//! │  submit "   "                                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command                                                         │  │
//! │  │  Result<T, AppError>                                             │  │
//! │  │         │                                                        │  │
//! │  │  ValidationError ───────────► VALIDATION_ERROR (transient)      │  │
//! │  │  CameraError ───────────────► CAMERA_ERROR (persistent banner)  │  │
//! │  │  ConfigError / LookupError ─► CONFIG_ERROR                      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  Provider failures never get here: the pipeline absorbs them.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use shelfscan_core::{CameraError, ValidationError};
use shelfscan_lookup::LookupError;

use crate::config::ConfigError;

/// Error returned from controller commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "barcode is required"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Manual input was rejected
    ValidationError,

    /// The camera could not be started
    CameraError,

    /// Configuration is unusable
    ConfigError,

    /// Nothing to act on (no product, no submitted code)
    NothingToOpen,

    /// Internal failure
    Internal,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::ValidationError, message)
    }

    pub fn nothing_to_open(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::NothingToOpen, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorCode::Internal, message)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::new(ErrorCode::CameraError, err.to_string())
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        if err.is_config_error() {
            AppError::new(ErrorCode::ConfigError, err.to_string())
        } else {
            tracing::error!("Lookup setup failed: {}", err);
            AppError::internal(err.to_string())
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let err = AppError::validation("barcode is required");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "barcode is required");
    }

    #[test]
    fn test_camera_error_keeps_banner_text() {
        let err = AppError::from(CameraError::PermissionDenied);

        assert_eq!(err.code, ErrorCode::CameraError);
        assert!(err.message.contains("permission denied"));
    }

    #[test]
    fn test_lookup_config_error() {
        let err = AppError::from(LookupError::InvalidConfig("bad".into()));
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
