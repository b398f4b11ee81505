//! # Barcode Detection
//!
//! Turns a live [`FrameSource`] into a one-shot stream of barcode values.
//!
//! ## Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    DetectionCapability (resolved once)                  │
//! │                                                                         │
//! │  Native(decoder)                     Fallback(Option<decoder>)          │
//! │  ───────────────                     ─────────────────────────          │
//! │  NativeDetectorStrategy              SamplingFallbackStrategy           │
//! │  • tick every frame (16ms)           • tick every 2000ms                │
//! │  • first tick one frame out          • first tick one period out        │
//! │  • skip frames not ready             • no decoder: never emits          │
//! │  • decode error: log, next frame     • decoder: decode each sample      │
//! │  • first candidate: emit, stop       • first candidate: emit, stop      │
//! │                                                                         │
//! │  Both check the cancel flag before re-arming and before emitting.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Subscription
//! `spawn` consumes the strategy and returns a [`DetectionHandle`] (owned by
//! the camera session) and a [`DetectedCodes`] receiver (handed to the
//! consumer). A strategy cannot be restarted; start a new one instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use shelfscan_core::BarcodeValue;

use crate::device::{Frame, FrameSource};
use crate::error::DecodeError;

// =============================================================================
// Decoder Surface
// =============================================================================

/// Symbologies requested from a decode primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    QrCode,
}

impl BarcodeFormat {
    pub const RETAIL: [BarcodeFormat; 6] = [
        BarcodeFormat::Ean13,
        BarcodeFormat::Ean8,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
        BarcodeFormat::Code128,
        BarcodeFormat::QrCode,
    ];
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarcodeFormat::Ean13 => write!(f, "ean_13"),
            BarcodeFormat::Ean8 => write!(f, "ean_8"),
            BarcodeFormat::UpcA => write!(f, "upc_a"),
            BarcodeFormat::UpcE => write!(f, "upc_e"),
            BarcodeFormat::Code128 => write!(f, "code_128"),
            BarcodeFormat::QrCode => write!(f, "qr_code"),
        }
    }
}

/// One candidate found in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBarcode {
    pub raw_value: String,
    pub format: BarcodeFormat,
}

/// Injectable decode primitive.
///
/// Implementations must not keep the frame beyond the `detect` call.
#[async_trait]
pub trait BarcodeDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// Formats this decoder is asked to recognize.
    fn formats(&self) -> &[BarcodeFormat] {
        &BarcodeFormat::RETAIL
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectedBarcode>, DecodeError>;
}

/// What the host offers for decoding, probed once per camera session.
#[derive(Clone)]
pub enum DetectionCapability {
    /// A platform decode primitive is available.
    Native(Arc<dyn BarcodeDecoder>),
    /// No platform primitive; optionally an external decoder library.
    Fallback(Option<Arc<dyn BarcodeDecoder>>),
}

impl DetectionCapability {
    /// Picks native when the host has it, otherwise sampling.
    pub fn probe(
        native: Option<Arc<dyn BarcodeDecoder>>,
        external: Option<Arc<dyn BarcodeDecoder>>,
    ) -> Self {
        match native {
            Some(decoder) => DetectionCapability::Native(decoder),
            None => DetectionCapability::Fallback(external),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, DetectionCapability::Native(_))
    }

    /// True when frames can actually be decoded.
    pub fn can_decode(&self) -> bool {
        !matches!(self, DetectionCapability::Fallback(None))
    }
}

impl std::fmt::Debug for DetectionCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionCapability::Native(d) => write!(f, "Native({})", d.name()),
            DetectionCapability::Fallback(Some(d)) => write!(f, "Fallback({})", d.name()),
            DetectionCapability::Fallback(None) => write!(f, "Fallback(none)"),
        }
    }
}

// =============================================================================
// Timing
// =============================================================================

/// Frame pacing for the two strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionTiming {
    /// Native strategy tick, standing in for the render callback.
    pub frame_interval: Duration,
    /// Sampling strategy period.
    pub sampling_interval: Duration,
}

impl Default for DetectionTiming {
    fn default() -> Self {
        DetectionTiming {
            frame_interval: Duration::from_millis(16),
            sampling_interval: Duration::from_millis(2000),
        }
    }
}

// =============================================================================
// Subscription Halves
// =============================================================================

/// Consumer side of a detection subscription.
pub struct DetectedCodes {
    rx: mpsc::Receiver<BarcodeValue>,
}

impl DetectedCodes {
    /// Waits for the next code. `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<BarcodeValue> {
        self.rx.recv().await
    }

    /// Non-blocking poll.
    pub fn try_recv(&mut self) -> Option<BarcodeValue> {
        self.rx.try_recv().ok()
    }
}

/// Owner side of a detection subscription.
pub struct DetectionHandle {
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl DetectionHandle {
    /// Signals cancellation and waits for the task to finish.
    ///
    /// When this returns the task has dropped its frame source reference.
    pub async fn cancel(mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Detection task panicked before cancellation");
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// Decodes on every frame through a platform primitive.
pub struct NativeDetectorStrategy {
    decoder: Arc<dyn BarcodeDecoder>,
    frame_interval: Duration,
}

/// Periodic sampling with an optional external decoder.
pub struct SamplingFallbackStrategy {
    decoder: Option<Arc<dyn BarcodeDecoder>>,
    sampling_interval: Duration,
}

/// The strategy chosen for one camera session.
pub enum DetectionStrategy {
    Native(NativeDetectorStrategy),
    Sampling(SamplingFallbackStrategy),
}

impl DetectionStrategy {
    pub fn from_capability(capability: &DetectionCapability, timing: DetectionTiming) -> Self {
        match capability {
            DetectionCapability::Native(decoder) => {
                DetectionStrategy::Native(NativeDetectorStrategy {
                    decoder: decoder.clone(),
                    frame_interval: timing.frame_interval,
                })
            }
            DetectionCapability::Fallback(decoder) => {
                DetectionStrategy::Sampling(SamplingFallbackStrategy {
                    decoder: decoder.clone(),
                    sampling_interval: timing.sampling_interval,
                })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DetectionStrategy::Native(_) => "native",
            DetectionStrategy::Sampling(_) => "sampling",
        }
    }

    /// Starts detecting on `source`. Consumes the strategy.
    pub fn spawn(self, source: Arc<dyn FrameSource>) -> (DetectionHandle, DetectedCodes) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (code_tx, code_rx) = mpsc::channel(1);

        trace!(strategy = self.name(), "Detection starting");
        let task = match self {
            DetectionStrategy::Native(strategy) => {
                tokio::spawn(strategy.run(source, cancel_rx, code_tx))
            }
            DetectionStrategy::Sampling(strategy) => {
                tokio::spawn(strategy.run(source, cancel_rx, code_tx))
            }
        };

        (
            DetectionHandle {
                cancel_tx,
                task: Some(task),
            },
            DetectedCodes { rx: code_rx },
        )
    }
}

impl NativeDetectorStrategy {
    async fn run(
        self,
        source: Arc<dyn FrameSource>,
        mut cancel: watch::Receiver<bool>,
        out: mpsc::Sender<BarcodeValue>,
    ) {
        // First decode waits for the next frame, so a re-armed detector on a
        // code still in view runs at frame rate.
        let mut ticker = interval_at(Instant::now() + self.frame_interval, self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.changed() => break,
                _ = ticker.tick() => {}
            }
            if *cancel.borrow() {
                break;
            }
            if !source.is_frame_ready() {
                continue;
            }
            let Some(frame) = source.current_frame() else {
                continue;
            };

            let found = tokio::select! {
                biased;
                _ = cancel.changed() => break,
                found = decode_frame(self.decoder.as_ref(), &frame) => found,
            };

            if let Some(code) = found {
                emit(code, &mut cancel, &out).await;
                break;
            }
        }

        trace!("Native detection stopped");
    }
}

impl SamplingFallbackStrategy {
    async fn run(
        self,
        source: Arc<dyn FrameSource>,
        mut cancel: watch::Receiver<bool>,
        out: mpsc::Sender<BarcodeValue>,
    ) {
        let mut ticker = interval_at(
            Instant::now() + self.sampling_interval,
            self.sampling_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if self.decoder.is_none() {
            debug!("camera active, decoding unavailable");
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.changed() => break,
                _ = ticker.tick() => {}
            }
            if *cancel.borrow() {
                break;
            }

            let Some(decoder) = self.decoder.as_deref() else {
                trace!(frame_ready = source.is_frame_ready(), "Sample skipped, no decoder");
                continue;
            };
            if !source.is_frame_ready() {
                continue;
            }
            let Some(frame) = source.current_frame() else {
                continue;
            };

            let found = tokio::select! {
                biased;
                _ = cancel.changed() => break,
                found = decode_frame(decoder, &frame) => found,
            };

            if let Some(code) = found {
                emit(code, &mut cancel, &out).await;
                break;
            }
        }

        trace!("Sampling detection stopped");
    }
}

/// Runs the decoder on one frame and returns the first usable candidate.
///
/// Decode failures are logged and read as "nothing in this frame".
async fn decode_frame(decoder: &dyn BarcodeDecoder, frame: &Frame) -> Option<BarcodeValue> {
    let candidates = match decoder.detect(frame).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(decoder = decoder.name(), sequence = frame.sequence, error = %e, "Frame decode failed");
            return None;
        }
    };

    candidates.into_iter().find_map(|candidate| {
        match BarcodeValue::new(candidate.raw_value) {
            Ok(code) => {
                trace!(barcode = %code, format = %candidate.format, "Barcode decoded");
                Some(code)
            }
            Err(e) => {
                trace!(error = %e, "Candidate skipped");
                None
            }
        }
    })
}

async fn emit(code: BarcodeValue, cancel: &mut watch::Receiver<bool>, out: &mpsc::Sender<BarcodeValue>) {
    if *cancel.borrow() {
        return;
    }
    tokio::select! {
        biased;
        _ = cancel.changed() => {}
        sent = out.send(code) => {
            if sent.is_err() {
                debug!("Detection consumer gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{SyntheticDecoder, SyntheticFrameSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Blind {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BarcodeDecoder for Blind {
        fn name(&self) -> &str {
            "blind"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<DetectedBarcode>, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DetectedBarcode {
                raw_value: String::new(),
                format: BarcodeFormat::Code128,
            }])
        }
    }

    fn timing() -> DetectionTiming {
        DetectionTiming::default()
    }

    #[test]
    fn test_probe_prefers_native() {
        let decoder: Arc<dyn BarcodeDecoder> = Arc::new(SyntheticDecoder::new());

        assert!(DetectionCapability::probe(Some(decoder.clone()), None).is_native());
        assert!(!DetectionCapability::probe(None, Some(decoder)).is_native());
        assert!(!DetectionCapability::probe(None, None).can_decode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_emits_first_candidate_once() {
        let source = Arc::new(SyntheticFrameSource::new(vec!["4006381333931".into()]));
        let capability = DetectionCapability::Native(Arc::new(SyntheticDecoder::new()));
        let (handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        assert_eq!(codes.recv().await.unwrap().as_str(), "4006381333931");
        // One-shot: the task ends and the channel closes.
        assert!(codes.recv().await.is_none());
        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_emits_long_qr_payload() {
        let payload = format!("https://example.com/p?{}", "a".repeat(300));
        let source = Arc::new(SyntheticFrameSource::new(vec![payload.clone()]));
        let capability = DetectionCapability::Native(Arc::new(SyntheticDecoder::new()));
        let (handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        let code = tokio::time::timeout(Duration::from_secs(10), codes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code.as_str(), payload);
        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_rearm_waits_one_frame() {
        let source: Arc<dyn FrameSource> =
            Arc::new(SyntheticFrameSource::new(vec!["4006381333931".into()]));
        let decoder = Arc::new(SyntheticDecoder::new());
        let capability = DetectionCapability::Native(decoder.clone());
        let started = Instant::now();

        for _ in 0..10 {
            let (handle, mut codes) =
                DetectionStrategy::from_capability(&capability, timing()).spawn(source.clone());
            assert_eq!(codes.recv().await.unwrap().as_str(), "4006381333931");
            handle.cancel().await;
        }

        assert_eq!(decoder.calls(), 10);
        assert!(started.elapsed() >= timing().frame_interval * 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_skips_frames_not_ready() {
        let source = Arc::new(SyntheticFrameSource::new(vec!["12345670".into()]).with_warmup(5));
        let decoder = Arc::new(SyntheticDecoder::new());
        let capability = DetectionCapability::Native(decoder.clone());
        let (_handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        assert_eq!(codes.recv().await.unwrap().as_str(), "12345670");
        assert_eq!(decoder.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_survives_decode_errors() {
        let source = Arc::new(SyntheticFrameSource::new(vec!["036000291452".into()]));
        let decoder = Arc::new(SyntheticDecoder::new().failing_first(3));
        let capability = DetectionCapability::Native(decoder.clone());
        let (_handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        assert_eq!(codes.recv().await.unwrap().as_str(), "036000291452");
        assert_eq!(decoder.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_candidates_are_skipped() {
        let source = Arc::new(SyntheticFrameSource::new(vec!["1".into()]));
        let blind = Arc::new(Blind {
            calls: AtomicUsize::new(0),
        });
        let capability = DetectionCapability::Native(blind.clone());
        let (handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(codes.try_recv().is_none());
        assert!(blind.calls.load(Ordering::SeqCst) > 1);

        handle.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_without_decoder_never_emits() {
        let source = Arc::new(SyntheticFrameSource::new(vec!["4006381333931".into()]));
        let capability = DetectionCapability::Fallback(None);
        let (handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        let waited = tokio::time::timeout(Duration::from_secs(30), codes.recv()).await;
        assert!(waited.is_err());

        handle.cancel().await;
        assert!(codes.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampling_with_decoder_waits_one_period() {
        let source = Arc::new(SyntheticFrameSource::new(vec!["4006381333931".into()]));
        let capability = DetectionCapability::Fallback(Some(Arc::new(SyntheticDecoder::new())));
        let started = Instant::now();
        let (_handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        assert_eq!(codes.recv().await.unwrap().as_str(), "4006381333931");
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_frame_source() {
        let source = Arc::new(SyntheticFrameSource::new(Vec::new()));
        let weak = Arc::downgrade(&source);
        let capability = DetectionCapability::Native(Arc::new(SyntheticDecoder::new()));
        let (handle, mut codes) =
            DetectionStrategy::from_capability(&capability, timing()).spawn(source);

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel().await;

        assert!(weak.upgrade().is_none());
        assert!(codes.recv().await.is_none());
    }
}
