//! # Synthetic Camera
//!
//! A `stub://` media backend that produces frames carrying known barcode
//! payloads, plus the decoder that reads them back. Used by the terminal
//! front end when no capture hardware is present, and by tests.
//!
//! ## Device URI
//! ```text
//! stub://4006381333931              one code, repeated on every frame
//! stub://4006381333931,036000291452 codes cycle frame by frame
//! stub://                           frames with nothing to decode
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tracing::debug;

use crate::detection::{BarcodeDecoder, BarcodeFormat, DetectedBarcode};
use crate::device::{Frame, FrameSource, MediaDevices, MediaStream, MediaTrack, VideoConstraints};
use crate::error::{AcquisitionError, DecodeError};

/// URI scheme selecting the synthetic backend.
pub const STUB_SCHEME: &str = "stub://";

const PAYLOAD_PREFIX: &[u8] = b"SHELFSCAN:";

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Parses `stub://a,b` into its codes. `None` for any other scheme.
pub fn parse_stub_uri(uri: &str) -> Option<Vec<String>> {
    let rest = uri.trim().strip_prefix(STUB_SCHEME)?;
    Some(
        rest.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

// =============================================================================
// Frame Source
// =============================================================================

/// Generates frames whose bytes embed the configured codes.
pub struct SyntheticFrameSource {
    codes: Vec<String>,
    width: u32,
    height: u32,
    warmup: AtomicU64,
    sequence: AtomicU64,
}

impl SyntheticFrameSource {
    pub fn new(codes: Vec<String>) -> Self {
        SyntheticFrameSource {
            codes,
            width: 1280,
            height: 720,
            warmup: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Reports "not ready" for the first `frames` readiness checks.
    pub fn with_warmup(self, frames: u64) -> Self {
        self.warmup.store(frames, Ordering::SeqCst);
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl FrameSource for SyntheticFrameSource {
    fn is_frame_ready(&self) -> bool {
        self.warmup
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_err()
    }

    fn current_frame(&self) -> Option<Frame> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let data = if self.codes.is_empty() {
            vec![0u8; 16]
        } else {
            let code = &self.codes[(sequence as usize) % self.codes.len()];
            [PAYLOAD_PREFIX, code.as_bytes()].concat()
        };

        Some(Frame {
            width: self.width,
            height: self.height,
            data,
            sequence,
        })
    }
}

// =============================================================================
// Decoder
// =============================================================================

/// Reads payloads written by [`SyntheticFrameSource`].
#[derive(Default)]
pub struct SyntheticDecoder {
    fail_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl SyntheticDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the first `n` decode calls fail.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_remaining.store(n, Ordering::SeqCst);
        self
    }

    /// Number of `detect` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn guess_format(raw: &str) -> BarcodeFormat {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return BarcodeFormat::QrCode;
    }
    match raw.len() {
        13 => BarcodeFormat::Ean13,
        12 => BarcodeFormat::UpcA,
        8 => BarcodeFormat::Ean8,
        6 => BarcodeFormat::UpcE,
        _ => BarcodeFormat::Code128,
    }
}

#[async_trait]
impl BarcodeDecoder for SyntheticDecoder {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectedBarcode>, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DecodeError(format!("synthetic failure on frame {}", frame.sequence)));
        }

        let Some(payload) = frame.data.strip_prefix(PAYLOAD_PREFIX) else {
            return Ok(Vec::new());
        };
        let raw_value = String::from_utf8_lossy(payload).into_owned();
        let format = guess_format(&raw_value);

        Ok(vec![DetectedBarcode { raw_value, format }])
    }
}

// =============================================================================
// Tracks and Streams
// =============================================================================

pub struct SyntheticTrack {
    label: String,
    stopped: AtomicBool,
}

impl MediaTrack for SyntheticTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct SyntheticStream {
    track: Arc<SyntheticTrack>,
    source: Arc<SyntheticFrameSource>,
}

impl MediaStream for SyntheticStream {
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        vec![self.track.clone()]
    }

    fn frame_source(&self) -> Arc<dyn FrameSource> {
        self.source.clone()
    }
}

// =============================================================================
// Devices
// =============================================================================

/// Scripted media backend.
///
/// Queued failures are returned by the next acquisitions in order; once the
/// queue is empty every acquisition succeeds.
pub struct SyntheticDevices {
    codes: Vec<String>,
    failures: Mutex<VecDeque<AcquisitionError>>,
    requests: Mutex<Vec<VideoConstraints>>,
    tracks: Mutex<Vec<Arc<SyntheticTrack>>>,
    sources: Mutex<Vec<Weak<SyntheticFrameSource>>>,
}

impl SyntheticDevices {
    pub fn new(codes: Vec<String>) -> Self {
        SyntheticDevices {
            codes,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            tracks: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Builds a backend from a `stub://` URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        parse_stub_uri(uri).map(Self::new)
    }

    /// Queues a failure for the next acquisition.
    pub fn fail_next(self, error: AcquisitionError) -> Self {
        locked(&self.failures).push_back(error);
        self
    }

    /// Constraint sets requested so far, in order.
    pub fn requests(&self) -> Vec<VideoConstraints> {
        locked(&self.requests).clone()
    }

    /// Tracks handed out so far.
    pub fn track_count(&self) -> usize {
        locked(&self.tracks).len()
    }

    /// True when every track handed out has been stopped.
    pub fn all_tracks_stopped(&self) -> bool {
        locked(&self.tracks).iter().all(|t| t.is_stopped())
    }

    /// Frame sources still referenced by anyone.
    pub fn live_frame_sources(&self) -> usize {
        locked(&self.sources)
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Box<dyn MediaStream>, AcquisitionError> {
        locked(&self.requests).push(*constraints);

        if let Some(error) = locked(&self.failures).pop_front() {
            debug!(facing = %constraints.facing, error = %error, "Synthetic acquisition failure");
            return Err(error);
        }

        let track = Arc::new(SyntheticTrack {
            label: format!("synthetic {}", constraints.facing),
            stopped: AtomicBool::new(false),
        });
        let source = Arc::new(
            SyntheticFrameSource::new(self.codes.clone())
                .with_resolution(constraints.ideal_width, constraints.ideal_height),
        );

        locked(&self.tracks).push(track.clone());
        locked(&self.sources).push(Arc::downgrade(&source));

        Ok(Box::new(SyntheticStream { track, source }))
    }
}
