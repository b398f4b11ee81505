//! # Error Types
//!
//! Domain-specific error types for shelfscan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelfscan-core errors (this file)                                     │
//! │  ├── CameraError      - Persistent camera banner (fatal to the scan)   │
//! │  ├── ValidationError  - Transient manual input message                 │
//! │  └── CoreError        - Wrapper for callers that want one type         │
//! │                                                                         │
//! │  shelfscan-lookup errors (separate crate)                              │
//! │  └── LookupError      - Absorbed by the pipeline, only ever logged     │
//! │                                                                         │
//! │  scanner app errors                                                    │
//! │  └── AppError         - What the presentation layer sees (serialized)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Camera Error
// =============================================================================

/// Why the camera could not be brought up.
///
/// Surfaced to the presentation layer as a persistent banner. It is only
/// cleared by a new start attempt (or an explicit reset).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
#[ts(export)]
pub enum CameraError {
    /// The user or platform refused camera access.
    #[error("Camera permission denied. Allow camera access in your system settings.")]
    PermissionDenied,

    /// No capture device matched any constraint set.
    #[error("No camera found. Check that a camera is connected.")]
    DeviceNotFound,

    /// Any other platform failure, with its detail message.
    #[error("Camera error: {0}")]
    Other(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements and are
/// shown as a transient, user-correctable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., control characters in a barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Core Error
// =============================================================================

/// Errors produced by the pure data model.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_messages() {
        assert!(CameraError::PermissionDenied
            .to_string()
            .contains("permission denied"));
        assert_eq!(
            CameraError::Other("device busy".into()).to_string(),
            "Camera error: device busy"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "barcode".to_string(),
        };
        assert_eq!(err.to_string(), "barcode is required");
    }

    #[test]
    fn test_camera_error_serializes_with_kind() {
        let json = serde_json::to_string(&CameraError::Other("busy".into())).unwrap();
        assert_eq!(json, r#"{"kind":"other","detail":"busy"}"#);

        let json = serde_json::to_string(&CameraError::DeviceNotFound).unwrap();
        assert_eq!(json, r#"{"kind":"device_not_found"}"#);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "barcode".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
