//! # shelfscan-camera: Live Camera and Barcode Detection
//!
//! Acquires a video stream, runs a detection strategy over its frames, and
//! guarantees the hardware is released on every exit path.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Camera Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   CameraSession (session.rs)                     │  │
//! │  │  Idle → Requesting → Streaming | Error → Stopped                 │  │
//! │  │  watch::Sender<CameraState> • uuid session_id                    │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  │ owns                         │ owns                  │
//! │  ┌───────────────▼──────────────┐  ┌────────────▼──────────────────┐   │
//! │  │ StreamGuard (device.rs)      │  │ DetectionHandle (detection.rs)│   │
//! │  │ stops tracks on drop         │  │ cancel flag + join            │   │
//! │  └───────────────┬──────────────┘  └────────────┬──────────────────┘   │
//! │                  │ frame_source()               │ reads frames         │
//! │                  └──────────────► FrameSource ◄─┘                      │
//! │                                                                         │
//! │  Backends: SyntheticDevices (stub://) • UnavailableDevices             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`session`] - `CameraSession` state machine
//! - [`detection`] - Native and sampling strategies, decoder trait
//! - [`device`] - Media device, stream, track and frame traits
//! - [`synthetic`] - `stub://` camera and decoder
//! - [`settings`] - `[camera]` config section
//! - [`error`] - Acquisition and decode errors

pub mod detection;
pub mod device;
pub mod error;
pub mod session;
pub mod settings;
pub mod synthetic;

pub use detection::{
    BarcodeDecoder, BarcodeFormat, DetectedBarcode, DetectedCodes, DetectionCapability,
    DetectionHandle, DetectionStrategy, DetectionTiming,
};
pub use device::{
    FacingMode, Frame, FrameSource, MediaDevices, MediaStream, MediaTrack, StreamGuard,
    UnavailableDevices, VideoConstraints,
};
pub use error::{AcquisitionError, AcquisitionErrorKind, CameraResult, DecodeError};
pub use session::CameraSession;
pub use settings::CameraSettings;
pub use synthetic::{SyntheticDecoder, SyntheticDevices};

use std::sync::Arc;

use tracing::warn;

/// Opens the media backend named by `settings.device` and probes its
/// decoding capability.
///
/// `stub://` URIs get the synthetic camera with its decoder, used natively
/// or behind the sampling strategy per `native_decoder`. Anything else has
/// no capture backend in this build and reports `DeviceNotFound` on start.
pub fn open_camera(settings: &CameraSettings) -> CameraSession {
    let synthetic = settings.device.as_deref().and_then(SyntheticDevices::from_uri);

    let (devices, decoder): (Arc<dyn MediaDevices>, Option<Arc<dyn BarcodeDecoder>>) = match synthetic {
        Some(synthetic) => {
            let decoder: Arc<dyn BarcodeDecoder> = Arc::new(SyntheticDecoder::new());
            (Arc::new(synthetic) as Arc<dyn MediaDevices>, Some(decoder))
        }
        None => {
            if let Some(device) = settings.device.as_deref() {
                warn!(device, "No capture backend for device, camera disabled");
            }
            (Arc::new(UnavailableDevices) as Arc<dyn MediaDevices>, None)
        }
    };

    let capability = if settings.native_decoder {
        DetectionCapability::probe(decoder, None)
    } else {
        DetectionCapability::probe(None, decoder)
    };

    CameraSession::new(devices, capability, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfscan_core::{CameraError, CameraState};

    #[tokio::test(start_paused = true)]
    async fn test_open_stub_camera() {
        let settings = CameraSettings {
            device: Some("stub://4006381333931".into()),
            ..Default::default()
        };
        let mut camera = open_camera(&settings);
        assert!(camera.capability().is_native());

        let mut codes = camera.start().await.unwrap().unwrap();
        assert_eq!(codes.recv().await.unwrap().as_str(), "4006381333931");
        camera.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_when_native_disabled() {
        let settings = CameraSettings {
            device: Some("stub://123".into()),
            native_decoder: false,
            ..Default::default()
        };
        let camera = open_camera(&settings);

        assert!(!camera.capability().is_native());
        assert!(camera.capability().can_decode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_device_reports_not_found() {
        let mut camera = open_camera(&CameraSettings::default());

        assert_eq!(camera.start().await.err(), Some(CameraError::DeviceNotFound));
        assert_eq!(camera.state(), CameraState::Error(CameraError::DeviceNotFound));
    }
}
