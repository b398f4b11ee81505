//! # Camera Error Types
//!
//! Platform-level acquisition failures and their projection onto the
//! user-facing [`CameraError`].
//!
//! ## Failure Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   Platform reports            AcquisitionErrorKind     CameraError     │
//! │   ─────────────────           ────────────────────     ───────────     │
//! │   NotAllowedError / EPERM ──► NotAllowed ─────────────► PermissionDenied│
//! │   NotFoundError / ENODEV ───► NotFound ───────────────► DeviceNotFound  │
//! │   anything else ────────────► Other ──────────────────► Other(message)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use shelfscan_core::CameraError;
use thiserror::Error;

/// Result type alias for camera operations.
pub type CameraResult<T> = Result<T, CameraError>;

/// Failure category reported by the media backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionErrorKind {
    /// Access to the device was refused.
    NotAllowed,
    /// No device satisfies the constraints.
    NotFound,
    /// Device busy, driver failure, anything else.
    Other,
}

/// One failed `get_user_media` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct AcquisitionError {
    pub kind: AcquisitionErrorKind,
    pub message: String,
}

impl AcquisitionError {
    pub fn new(kind: AcquisitionErrorKind, message: impl Into<String>) -> Self {
        AcquisitionError {
            kind,
            message: message.into(),
        }
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new(AcquisitionErrorKind::NotAllowed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AcquisitionErrorKind::NotFound, message)
    }
}

impl From<AcquisitionError> for CameraError {
    fn from(err: AcquisitionError) -> Self {
        match err.kind {
            AcquisitionErrorKind::NotAllowed => CameraError::PermissionDenied,
            AcquisitionErrorKind::NotFound => CameraError::DeviceNotFound,
            AcquisitionErrorKind::Other => CameraError::Other(err.message),
        }
    }
}

/// A decode primitive failed on one frame. Never fatal to the stream.
#[derive(Debug, Clone, Error)]
#[error("Decode failed: {0}")]
pub struct DecodeError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CameraError::from(AcquisitionError::not_allowed("denied")),
            CameraError::PermissionDenied
        );
        assert_eq!(
            CameraError::from(AcquisitionError::not_found("none")),
            CameraError::DeviceNotFound
        );
        assert_eq!(
            CameraError::from(AcquisitionError::new(AcquisitionErrorKind::Other, "busy")),
            CameraError::Other("busy".into())
        );
    }
}
