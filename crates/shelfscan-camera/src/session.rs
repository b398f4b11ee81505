//! # Camera Session
//!
//! The state machine that owns the video stream and the detection
//! subscription.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──start──► Requesting ──primary ok──────────────► Streaming      │
//! │                      │                                      ▲   │       │
//! │                      └─ primary failed ── relaxed ok ───────┘   │       │
//! │                      │                                          │ stop  │
//! │                      └─ relaxed failed ──► Error(reason)        ▼       │
//! │                                               │              Stopped    │
//! │                                               └──start──► Requesting    │
//! │                                                                         │
//! │   start while Streaming: no-op                                          │
//! │   stop from any state: tracks stopped, detection cancelled, Stopped     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use shelfscan_core::{CameraError, CameraState};

use crate::detection::{DetectedCodes, DetectionCapability, DetectionHandle, DetectionStrategy, DetectionTiming};
use crate::device::{MediaDevices, StreamGuard, VideoConstraints};
use crate::error::CameraResult;
use crate::settings::CameraSettings;

/// One camera-on-to-camera-off lifecycle owner.
///
/// Only the session may start or stop the stream. Dropping the session
/// stops the tracks and aborts detection.
pub struct CameraSession {
    session_id: Uuid,
    devices: Arc<dyn MediaDevices>,
    capability: DetectionCapability,
    timing: DetectionTiming,
    constraints: VideoConstraints,
    state_tx: watch::Sender<CameraState>,
    stream: Option<StreamGuard>,
    detection: Option<DetectionHandle>,
}

impl CameraSession {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        capability: DetectionCapability,
        settings: &CameraSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(CameraState::Idle);
        let session_id = Uuid::new_v4();

        debug!(
            %session_id,
            backend = devices.name(),
            capability = ?capability,
            "Camera session created"
        );

        CameraSession {
            session_id,
            devices,
            capability,
            timing: settings.timing(),
            constraints: settings.primary_constraints(),
            state_tx,
            stream: None,
            detection: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> CameraState {
        self.state_tx.borrow().clone()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.state_tx.subscribe()
    }

    pub fn capability(&self) -> &DetectionCapability {
        &self.capability
    }

    pub fn is_streaming(&self) -> bool {
        matches!(*self.state_tx.borrow(), CameraState::Streaming)
    }

    fn set_state(&self, state: CameraState) {
        debug!(session_id = %self.session_id, state = %state, "Camera state");
        self.state_tx.send_replace(state);
    }

    /// Acquires the camera and starts detection.
    ///
    /// Returns `Ok(None)` when already streaming. On success the returned
    /// receiver yields the detected code.
    pub async fn start(&mut self) -> CameraResult<Option<DetectedCodes>> {
        if self.is_streaming() {
            debug!(session_id = %self.session_id, "Start ignored, already streaming");
            return Ok(None);
        }

        // Anything left over from an interrupted start goes first.
        self.release().await;
        self.set_state(CameraState::Requesting);

        let primary = self.constraints;
        let stream = match self.devices.get_user_media(&primary).await {
            Ok(stream) => StreamGuard::new(stream),
            Err(first) => {
                warn!(
                    session_id = %self.session_id,
                    facing = %primary.facing,
                    error = %first,
                    "Primary camera unavailable, retrying with relaxed constraints"
                );
                let relaxed = primary.relaxed();
                match self.devices.get_user_media(&relaxed).await {
                    Ok(stream) => StreamGuard::new(stream),
                    Err(second) => {
                        let reason = CameraError::from(second);
                        error!(session_id = %self.session_id, error = %reason, "Camera acquisition failed");
                        self.set_state(CameraState::Error(reason.clone()));
                        return Err(reason);
                    }
                }
            }
        };

        let Some(source) = stream.frame_source() else {
            let reason = CameraError::Other("stream released during start".into());
            self.set_state(CameraState::Error(reason.clone()));
            return Err(reason);
        };

        let strategy = DetectionStrategy::from_capability(&self.capability, self.timing);
        let name = strategy.name();
        let (handle, codes) = strategy.spawn(source);

        self.stream = Some(stream);
        self.detection = Some(handle);
        self.set_state(CameraState::Streaming);
        info!(session_id = %self.session_id, strategy = name, "Camera streaming");

        Ok(Some(codes))
    }

    /// Starts a fresh detection subscription on the live stream.
    ///
    /// Detection is one-shot; a consumer that discards a code calls this to
    /// keep scanning. Returns `None` unless streaming.
    pub async fn resume_detection(&mut self) -> Option<DetectedCodes> {
        if !self.is_streaming() {
            return None;
        }
        let source = self.stream.as_ref()?.frame_source()?;

        if let Some(previous) = self.detection.take() {
            previous.cancel().await;
        }
        let strategy = DetectionStrategy::from_capability(&self.capability, self.timing);
        let (handle, codes) = strategy.spawn(source);
        self.detection = Some(handle);

        trace!(session_id = %self.session_id, "Detection resumed");
        Some(codes)
    }

    /// Stops tracks, then cancels detection. Valid from any state.
    pub async fn stop(&mut self) {
        self.release().await;
        self.set_state(CameraState::Stopped);
        info!(session_id = %self.session_id, "Camera stopped");
    }

    async fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        if let Some(detection) = self.detection.take() {
            detection.cancel().await;
        }
    }
}
