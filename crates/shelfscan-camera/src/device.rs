//! # Media Devices
//!
//! The platform surface the camera session talks to: acquire a stream under
//! a constraint set, stop its tracks, read frames from it.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CameraSession ──owns──► StreamGuard ──owns──► Box<dyn MediaStream>     │
//! │                                                  │           │          │
//! │                                          tracks()│           │frame_    │
//! │                                                  ▼           ▼ source() │
//! │                                          MediaTrack    Arc<dyn FrameSrc>│
//! │                                                              │          │
//! │  detection task ───────────────── reads (clone of Arc) ◄─────┘          │
//! │                                                                         │
//! │  Only the session starts or stops the stream. Detection never sees it.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AcquisitionError;

// =============================================================================
// Constraints
// =============================================================================

/// Logical camera facing preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera, pointing at the shelf.
    Environment,
    /// Front camera.
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// Video constraint set for one acquisition attempt.
///
/// Width and height are hints; the backend may deliver anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl VideoConstraints {
    /// Rear-facing capture at the given resolution hint.
    pub fn primary(ideal_width: u32, ideal_height: u32) -> Self {
        VideoConstraints {
            facing: FacingMode::Environment,
            ideal_width,
            ideal_height,
        }
    }

    /// The retry set: any-facing capture, same resolution hint.
    pub fn relaxed(&self) -> Self {
        VideoConstraints {
            facing: FacingMode::User,
            ..*self
        }
    }
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self::primary(1280, 720)
    }
}

// =============================================================================
// Frames
// =============================================================================

/// One captured video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Monotonic frame counter of the source.
    pub sequence: u64,
}

/// Read side of a live stream.
pub trait FrameSource: Send + Sync {
    /// True when a decodable frame is available right now.
    fn is_frame_ready(&self) -> bool;

    /// Snapshot of the current frame, if any.
    fn current_frame(&self) -> Option<Frame>;
}

// =============================================================================
// Streams and Tracks
// =============================================================================

/// One track of a media stream.
pub trait MediaTrack: Send + Sync {
    fn label(&self) -> &str;

    /// Releases the underlying hardware. Idempotent.
    fn stop(&self);

    fn is_stopped(&self) -> bool;
}

/// An acquired video stream.
pub trait MediaStream: Send + Sync {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    fn frame_source(&self) -> Arc<dyn FrameSource>;
}

/// Platform media device access.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    async fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError>;
}

// =============================================================================
// Stream Guard
// =============================================================================

/// Holds an acquired stream and stops every track when dropped.
///
/// Wrapping the stream the moment `get_user_media` returns means no exit
/// path (error, cancellation, panic) can leave the camera running.
pub struct StreamGuard {
    stream: Option<Box<dyn MediaStream>>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        StreamGuard {
            stream: Some(stream),
        }
    }

    pub fn frame_source(&self) -> Option<Arc<dyn FrameSource>> {
        self.stream.as_ref().map(|s| s.frame_source())
    }

    /// Stops all tracks and releases the stream.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let tracks = stream.tracks();
            for track in &tracks {
                track.stop();
            }
            debug!(tracks = tracks.len(), "Media tracks stopped");
        }
    }

    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Unavailable Backend
// =============================================================================

/// Backend used when no capture device is configured.
///
/// Every acquisition fails with `NotFound`, which the session surfaces as
/// `DeviceNotFound`; manual entry keeps working.
pub struct UnavailableDevices;

#[async_trait]
impl MediaDevices for UnavailableDevices {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError> {
        Err(AcquisitionError::not_found(format!(
            "no capture device for facing={}",
            constraints.facing
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcquisitionErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Track(AtomicBool);

    impl MediaTrack for Track {
        fn label(&self) -> &str {
            "test"
        }
        fn stop(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
        fn is_stopped(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct NoFrames;

    impl FrameSource for NoFrames {
        fn is_frame_ready(&self) -> bool {
            false
        }
        fn current_frame(&self) -> Option<Frame> {
            None
        }
    }

    struct Stream(Arc<Track>);

    impl MediaStream for Stream {
        fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
            vec![self.0.clone()]
        }
        fn frame_source(&self) -> Arc<dyn FrameSource> {
            Arc::new(NoFrames)
        }
    }

    #[test]
    fn test_relaxed_keeps_resolution() {
        let primary = VideoConstraints::primary(1920, 1080);
        let relaxed = primary.relaxed();

        assert_eq!(primary.facing, FacingMode::Environment);
        assert_eq!(relaxed.facing, FacingMode::User);
        assert_eq!((relaxed.ideal_width, relaxed.ideal_height), (1920, 1080));
    }

    #[test]
    fn test_guard_stops_tracks_on_drop() {
        let track = Arc::new(Track(AtomicBool::new(false)));
        {
            let _guard = StreamGuard::new(Box::new(Stream(track.clone())));
            assert!(!track.is_stopped());
        }
        assert!(track.is_stopped());
    }

    #[test]
    fn test_guard_stop_is_idempotent() {
        let track = Arc::new(Track(AtomicBool::new(false)));
        let mut guard = StreamGuard::new(Box::new(Stream(track.clone())));

        guard.stop();
        guard.stop();

        assert!(guard.is_released());
        assert!(guard.frame_source().is_none());
        assert!(track.is_stopped());
    }

    #[tokio::test]
    async fn test_unavailable_reports_not_found() {
        let err = UnavailableDevices
            .get_user_media(&VideoConstraints::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, AcquisitionErrorKind::NotFound);
    }
}
