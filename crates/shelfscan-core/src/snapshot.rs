//! # Session Snapshot
//!
//! The state object published to the presentation layer on every transition.
//!
//! ## Snapshot Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ScanSnapshot                                    │
//! │                                                                         │
//! │  session_state ────────► Idle | Requesting | Streaming                  │
//! │                          | Error(CameraError) | Stopped                  │
//! │                                                                         │
//! │  last_submitted_code ──► Option<BarcodeValue>   (dedup key)             │
//! │                                                                         │
//! │  resolution                                                             │
//! │  ├── pending ──────────► bool                                           │
//! │  ├── current_provider ─► Some only while pending                        │
//! │  ├── result ───────────► Some only when NOT pending                     │
//! │  └── error ────────────► transient validation message                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Resolution` has private fields: the only way to build one is through
//! constructors that cannot express "pending with a result".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::CameraError;
use crate::types::{BarcodeValue, ProductRecord};

// =============================================================================
// Camera State
// =============================================================================

/// Lifecycle state of a camera session.
///
/// ```text
///  Idle ──start──► Requesting ──ok──► Streaming ──stop──► Stopped
///                      │                                     │
///                      └──both attempts fail──► Error ◄──────┘ (start again)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
#[ts(export)]
pub enum CameraState {
    /// Never started.
    #[default]
    Idle,
    /// Stream acquisition in progress.
    Requesting,
    /// A stream is live and (optionally) wired to detection.
    Streaming,
    /// Acquisition failed; cleared only by a new start.
    Error(CameraError),
    /// Stream released.
    Stopped,
}

impl CameraState {
    /// Returns true while the camera is being acquired or is live.
    pub fn is_active(&self) -> bool {
        matches!(self, CameraState::Requesting | CameraState::Streaming)
    }

    /// Returns the camera error, if any.
    pub fn error(&self) -> Option<&CameraError> {
        match self {
            CameraState::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraState::Idle => write!(f, "idle"),
            CameraState::Requesting => write!(f, "requesting"),
            CameraState::Streaming => write!(f, "streaming"),
            CameraState::Error(_) => write!(f, "error"),
            CameraState::Stopped => write!(f, "stopped"),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Progress of the current catalog lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Resolution {
    pending: bool,
    current_provider_name: Option<String>,
    result: Option<ProductRecord>,
    error: Option<String>,
}

impl Resolution {
    /// Nothing submitted yet (or cleared by reset).
    pub fn idle() -> Self {
        Resolution::default()
    }

    /// A run has started but no provider has been tried yet.
    pub fn pending() -> Self {
        Resolution {
            pending: true,
            ..Default::default()
        }
    }

    /// A run is currently asking `provider`.
    pub fn querying(provider: impl Into<String>) -> Self {
        Resolution {
            pending: true,
            current_provider_name: Some(provider.into()),
            ..Default::default()
        }
    }

    /// A run finished with a record.
    pub fn resolved(record: ProductRecord) -> Self {
        Resolution {
            result: Some(record),
            ..Default::default()
        }
    }

    /// Submission was rejected before any run started.
    pub fn rejected(message: impl Into<String>) -> Self {
        Resolution {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Same progress and result, with the transient input error replaced.
    ///
    /// A rejected submission must not hide a run that is still in flight.
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn current_provider_name(&self) -> Option<&str> {
        self.current_provider_name.as_deref()
    }

    pub fn result(&self) -> Option<&ProductRecord> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

// =============================================================================
// Scan Snapshot
// =============================================================================

/// Everything the presentation layer observes about a scan session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ScanSnapshot {
    /// Projection of the camera session state.
    pub session_state: CameraState,

    /// Last code fed into the pipeline (dedup key).
    pub last_submitted_code: Option<BarcodeValue>,

    /// Current lookup progress.
    pub resolution: Resolution,

    /// When this snapshot was produced.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        ScanSnapshot {
            session_state: CameraState::Idle,
            last_submitted_code: None,
            resolution: Resolution::idle(),
            updated_at: Utc::now(),
        }
    }
}

impl ScanSnapshot {
    /// Marks the snapshot as freshly updated.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True while the camera is being acquired or streaming.
    pub fn is_scanning(&self) -> bool {
        self.session_state.is_active()
    }

    /// True while a lookup is in flight.
    pub fn is_loading(&self) -> bool {
        self.resolution.is_pending()
    }

    /// Name of the provider currently being asked.
    pub fn current_source(&self) -> Option<&str> {
        self.resolution.current_provider_name()
    }

    /// The resolved product, if any.
    pub fn product(&self) -> Option<&ProductRecord> {
        self.resolution.result()
    }

    /// Persistent camera banner, if any.
    pub fn camera_error(&self) -> Option<&CameraError> {
        self.session_state.error()
    }

    /// Transient input error, if any.
    pub fn error(&self) -> Option<&str> {
        self.resolution.error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProductRecord {
        ProductRecord::fallback(&BarcodeValue::new("123").unwrap())
    }

    #[test]
    fn test_resolution_invariants() {
        let querying = Resolution::querying("UPCitemdb");
        assert!(querying.is_pending());
        assert_eq!(querying.current_provider_name(), Some("UPCitemdb"));
        assert!(querying.result().is_none());

        let resolved = Resolution::resolved(record());
        assert!(!resolved.is_pending());
        assert!(resolved.current_provider_name().is_none());
        assert!(resolved.result().is_some());

        let rejected = Resolution::rejected("barcode is required");
        assert!(!rejected.is_pending());
        assert_eq!(rejected.error(), Some("barcode is required"));
    }

    #[test]
    fn test_error_keeps_pending_run() {
        let querying = Resolution::querying("UPCitemdb").with_error(Some("barcode is required".into()));
        assert!(querying.is_pending());
        assert_eq!(querying.current_provider_name(), Some("UPCitemdb"));
        assert_eq!(querying.error(), Some("barcode is required"));

        let resolved = Resolution::resolved(record()).with_error(Some("barcode is required".into()));
        assert!(resolved.result().is_some());
        assert!(resolved.with_error(None).error().is_none());
    }

    #[test]
    fn test_snapshot_accessors() {
        let mut snapshot = ScanSnapshot::default();
        assert!(!snapshot.is_scanning());
        assert!(!snapshot.is_loading());

        snapshot.session_state = CameraState::Streaming;
        snapshot.resolution = Resolution::querying("Open Food Facts");
        assert!(snapshot.is_scanning());
        assert!(snapshot.is_loading());
        assert_eq!(snapshot.current_source(), Some("Open Food Facts"));

        snapshot.session_state = CameraState::Error(CameraError::DeviceNotFound);
        assert!(!snapshot.is_scanning());
        assert_eq!(snapshot.camera_error(), Some(&CameraError::DeviceNotFound));
    }

    #[test]
    fn test_camera_state_serialization() {
        let json = serde_json::to_string(&CameraState::Error(CameraError::PermissionDenied)).unwrap();
        assert_eq!(json, r#"{"state":"error","error":{"kind":"permission_denied"}}"#);
        assert_eq!(
            serde_json::to_string(&CameraState::Streaming).unwrap(),
            r#"{"state":"streaming"}"#
        );
    }
}
