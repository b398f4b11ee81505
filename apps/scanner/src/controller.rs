//! # Scan Session Controller
//!
//! Top-level orchestrator: owns the camera session, feeds detected and typed
//! codes into the resolution pipeline, and publishes one coherent snapshot.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Scan Session Flow                                    │
//! │                                                                         │
//! │  start_scan() ──► CameraSession::start ──► DetectedCodes                │
//! │                                                │                        │
//! │                                 listener task  ▼                        │
//! │                          code == last_submitted_code?                   │
//! │                           │ yes                    │ no                 │
//! │                           ▼                        ▼                    │
//! │                  resume_detection()        camera.stop()                │
//! │                                                    │                    │
//! │  submit_code(raw, force) ── parse ─────────────────┤                    │
//! │                                                    ▼                    │
//! │                              begin_run: generation += 1                 │
//! │                              abort previous run task                    │
//! │                              Resolution::pending()                      │
//! │                                                    │                    │
//! │                              ResolutionPipeline::resolve                │
//! │                              ├─ Attempting ──► Resolution::querying     │
//! │                              └─ record ──────► Resolution::resolved     │
//! │                                 (dropped if generation is stale)        │
//! │                                                                         │
//! │  Every transition ──► watch::Sender<ScanSnapshot>                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Resubmission
//! A new submission while a run is pending cancels the previous run and
//! adopts the latest code. Progress and results carry the generation they
//! were started with; anything from an older generation is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use shelfscan_camera::{CameraSession, DetectedCodes};
use shelfscan_core::validation::parse_manual_code;
use shelfscan_core::{search_url, BarcodeValue, CameraState, Resolution, ScanSnapshot};
use shelfscan_lookup::{ProgressEvent, ProgressSink, ResolutionPipeline};

use crate::error::AppError;
use crate::opener::ExternalOpener;

// =============================================================================
// Shared Run State
// =============================================================================

#[derive(Default)]
struct RunState {
    generation: u64,
    last_submitted: Option<BarcodeValue>,
    task: Option<JoinHandle<()>>,
}

/// Snapshot channel plus run bookkeeping, shared with in-flight runs.
struct Shared {
    snapshot_tx: watch::Sender<ScanSnapshot>,
    run: Mutex<RunState>,
}

impl Shared {
    fn run(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, update: impl FnOnce(&mut ScanSnapshot)) {
        self.snapshot_tx.send_modify(|snapshot| {
            update(snapshot);
            snapshot.touch();
        });
    }

    /// Publishes only if `generation` is still the current run.
    fn publish_if_current(&self, generation: u64, update: impl FnOnce(&mut ScanSnapshot)) -> bool {
        let run = self.run();
        if run.generation != generation {
            debug!(generation, current = run.generation, "Discarding stale run update");
            return false;
        }
        self.publish(update);
        true
    }
}

/// Progress sink bound to one run.
struct RunProgress {
    shared: Arc<Shared>,
    generation: u64,
}

impl ProgressSink for RunProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        if let ProgressEvent::Attempting { provider, .. } = event {
            let provider = provider.clone();
            self.shared.publish_if_current(self.generation, |snapshot| {
                advance(snapshot, Resolution::querying(provider));
            });
        }
    }
}

/// Moves a run forward without dropping a transient input error; only the
/// next submission or a reset clears it.
fn advance(snapshot: &mut ScanSnapshot, next: Resolution) {
    let error = snapshot.resolution.error().map(str::to_owned);
    snapshot.resolution = next.with_error(error);
}

// =============================================================================
// Controller
// =============================================================================

struct Inner {
    camera: AsyncMutex<CameraSession>,
    pipeline: Arc<ResolutionPipeline>,
    opener: Arc<dyn ExternalOpener>,
    shared: Arc<Shared>,
    scan_epoch: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
    forwarder: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.forwarder.abort();
        let listener = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = listener.take() {
            listener.abort();
        }
        if let Some(task) = self.shared.run().task.take() {
            task.abort();
        }
    }
}

/// Orchestrates one camera session and one resolution pipeline.
///
/// Cheap to clone; clones share the same session. Must be created inside a
/// tokio runtime.
#[derive(Clone)]
pub struct ScanSessionController {
    inner: Arc<Inner>,
}

impl ScanSessionController {
    pub fn new(
        camera: CameraSession,
        pipeline: ResolutionPipeline,
        opener: Arc<dyn ExternalOpener>,
    ) -> Self {
        let initial = ScanSnapshot {
            session_state: camera.state(),
            ..Default::default()
        };
        let (snapshot_tx, _) = watch::channel(initial);
        let shared = Arc::new(Shared {
            snapshot_tx,
            run: Mutex::new(RunState::default()),
        });
        let forwarder = spawn_state_forwarder(camera.subscribe(), shared.clone());

        info!(
            session_id = %camera.session_id(),
            providers = ?pipeline.provider_names(),
            "Scan session controller ready"
        );

        ScanSessionController {
            inner: Arc::new(Inner {
                camera: AsyncMutex::new(camera),
                pipeline: Arc::new(pipeline),
                opener,
                shared,
                scan_epoch: AtomicU64::new(0),
                listener: Mutex::new(None),
                forwarder,
            }),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ScanSnapshot {
        self.inner.shared.snapshot_tx.borrow().clone()
    }

    /// Watches every published transition.
    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.inner.shared.snapshot_tx.subscribe()
    }

    pub fn pipeline(&self) -> &ResolutionPipeline {
        &self.inner.pipeline
    }

    // =========================================================================
    // Camera Commands
    // =========================================================================

    /// Starts the camera and arms detection.
    ///
    /// A camera failure is published as the persistent camera error and
    /// returned; manual submission keeps working.
    pub async fn start_scan(&self) -> Result<(), AppError> {
        let mut camera = self.inner.camera.lock().await;
        let started = camera.start().await;
        self.publish_camera(&camera);

        match started {
            Ok(Some(codes)) => {
                let epoch = self.inner.scan_epoch.fetch_add(1, Ordering::SeqCst) + 1;
                self.listen(codes, epoch);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stops the camera. Valid from any state.
    pub async fn stop_scan(&self) {
        let mut camera = self.inner.camera.lock().await;
        camera.stop().await;
        self.publish_camera(&camera);
    }

    fn publish_camera(&self, camera: &CameraSession) {
        let state = camera.state();
        self.inner.shared.publish(|snapshot| snapshot.session_state = state);
    }

    fn listen(&self, codes: DetectedCodes, epoch: u64) {
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            let mut codes = codes;
            let mut discarded = 0u64;
            while let Some(code) = codes.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                let controller = ScanSessionController { inner };
                match controller.on_detected(code.clone(), epoch).await {
                    Some(next) => {
                        // The code stays in view, so only the first repeat is worth a line.
                        if discarded == 0 {
                            debug!(barcode = %code, "Already shown, still scanning");
                        }
                        discarded += 1;
                        codes = next;
                    }
                    None => break,
                }
            }
            if discarded > 0 {
                debug!(discarded, "Scan listener finished");
            }
        });

        // A replaced listener ends on its own once its channel closes.
        *self.listener() = Some(task);
    }

    /// Handles one detected code. Returns the next subscription when the
    /// code was a duplicate and scanning continues.
    async fn on_detected(&self, code: BarcodeValue, epoch: u64) -> Option<DetectedCodes> {
        let mut camera = self.inner.camera.lock().await;

        if epoch != self.inner.scan_epoch.load(Ordering::SeqCst) || !camera.is_streaming() {
            debug!(barcode = %code, "Ignoring detection from a cancelled scan");
            return None;
        }

        if self.is_duplicate(&code) {
            trace!(barcode = %code, "Duplicate detection discarded");
            return camera.resume_detection().await;
        }

        info!(barcode = %code, session_id = %camera.session_id(), "Barcode detected");
        camera.stop().await;
        self.publish_camera(&camera);
        drop(camera);

        self.begin_run(code, true);
        None
    }

    fn listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abort_listener(&self) {
        if let Some(listener) = self.listener().take() {
            listener.abort();
        }
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submits a typed code.
    ///
    /// Returns `Ok(false)` when the code repeats the last submission and
    /// `force` is not set. Empty input is published as a transient error
    /// next to whatever run is in flight or result is shown.
    pub fn submit_code(&self, raw: &str, force: bool) -> Result<bool, AppError> {
        match parse_manual_code(raw) {
            Ok(code) => Ok(self.begin_run(code, force)),
            Err(e) => {
                warn!(error = %e, "Manual input rejected");
                let message = e.to_string();
                self.inner.shared.publish(|snapshot| {
                    let current = std::mem::take(&mut snapshot.resolution);
                    snapshot.resolution = current.with_error(Some(message));
                });
                Err(e.into())
            }
        }
    }

    fn is_duplicate(&self, code: &BarcodeValue) -> bool {
        self.inner.shared.run().last_submitted.as_ref() == Some(code)
    }

    fn begin_run(&self, code: BarcodeValue, force: bool) -> bool {
        let shared = &self.inner.shared;
        let mut run = shared.run();

        if !force && run.last_submitted.as_ref() == Some(&code) {
            debug!(barcode = %code, "Duplicate submission discarded");
            return false;
        }

        if let Some(previous) = run.task.take() {
            if !previous.is_finished() {
                info!(generation = run.generation, "Cancelling previous run");
            }
            previous.abort();
        }

        run.generation += 1;
        let generation = run.generation;
        run.last_submitted = Some(code.clone());

        let submitted = code.clone();
        shared.publish(|snapshot| {
            snapshot.last_submitted_code = Some(submitted);
            snapshot.resolution = Resolution::pending();
        });
        info!(barcode = %code, generation, "Resolution started");

        let pipeline = self.inner.pipeline.clone();
        let sink = RunProgress {
            shared: shared.clone(),
            generation,
        };
        run.task = Some(tokio::spawn(async move {
            let record = pipeline.resolve(&code, &sink).await;
            let source = record.source_name.clone();
            let adopted = sink.shared.publish_if_current(generation, |snapshot| {
                advance(snapshot, Resolution::resolved(record));
            });
            if adopted {
                info!(barcode = %code, generation, source = %source, "Resolution finished");
            }
        }));

        true
    }

    // =========================================================================
    // Reset / Teardown
    // =========================================================================

    /// Clears the last code and the result, and forces the camera to
    /// `Stopped`.
    pub async fn reset(&self) {
        {
            let mut run = self.inner.shared.run();
            run.generation += 1;
            run.last_submitted = None;
            if let Some(task) = run.task.take() {
                task.abort();
            }
        }
        self.abort_listener();

        let mut camera = self.inner.camera.lock().await;
        camera.stop().await;
        let state = camera.state();
        self.inner.shared.publish(|snapshot| {
            snapshot.session_state = state;
            snapshot.last_submitted_code = None;
            snapshot.resolution = Resolution::idle();
        });
        info!("Scan session reset");
    }

    /// Controller teardown: aborts the in-flight run and releases the camera.
    pub async fn shutdown(&self) {
        {
            let mut run = self.inner.shared.run();
            run.generation += 1;
            if let Some(task) = run.task.take() {
                task.abort();
            }
        }
        self.abort_listener();

        let mut camera = self.inner.camera.lock().await;
        camera.stop().await;
        self.publish_camera(&camera);
        info!(session_id = %camera.session_id(), "Scan session shut down");
    }

    // =========================================================================
    // External Links
    // =========================================================================

    /// Opens an http(s) URL through the configured opener.
    pub fn open_external(&self, url: &str) -> Result<(), AppError> {
        let parsed = Url::parse(url)
            .map_err(|e| AppError::validation(format!("invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }
        self.inner.opener.open(&parsed)
    }

    /// Opens the current product's detail link.
    pub fn open_details(&self) -> Result<(), AppError> {
        let detail_url = self
            .snapshot()
            .product()
            .and_then(|product| product.detail_url.clone())
            .ok_or_else(|| AppError::nothing_to_open("no product details to open"))?;
        self.open_external(&detail_url)
    }

    /// Opens a web search for the last submitted code.
    pub fn search_current(&self) -> Result<(), AppError> {
        let code = self
            .inner
            .shared
            .run()
            .last_submitted
            .clone()
            .ok_or_else(|| AppError::nothing_to_open("no barcode to search for"))?;
        self.open_external(&search_url(&code))
    }
}

/// Mirrors camera transitions (including `Requesting`) into the snapshot.
fn spawn_state_forwarder(
    mut states: watch::Receiver<CameraState>,
    shared: Arc<Shared>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            shared.publish(|snapshot| snapshot.session_state = state);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opener::RecordingOpener;
    use shelfscan_camera::{CameraSettings, DetectionCapability, SyntheticDecoder, SyntheticDevices};
    use shelfscan_lookup::{PipelineConfig, ProviderDescriptor};

    fn controller(opener: Arc<RecordingOpener>) -> ScanSessionController {
        let devices = Arc::new(SyntheticDevices::new(Vec::new()));
        let capability = DetectionCapability::Native(Arc::new(SyntheticDecoder::new()));
        let camera = CameraSession::new(devices, capability, &CameraSettings::default());
        let empty = ProviderDescriptor::from_fn("Empty", false, |_code| async { Ok(None) });
        let pipeline = ResolutionPipeline::new(vec![empty], PipelineConfig::default());
        ScanSessionController::new(camera, pipeline, opener)
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_submission_is_rejected() {
        let controller = controller(Arc::new(RecordingOpener::new()));

        let err = controller.submit_code("   ", false).unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        let snapshot = controller.snapshot();
        assert!(snapshot.error().is_some());
        assert!(!snapshot.is_loading());
        assert!(snapshot.last_submitted_code.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_external_rejects_other_schemes() {
        let opener = Arc::new(RecordingOpener::new());
        let controller = controller(opener.clone());

        assert!(controller.open_external("file:///etc/passwd").is_err());
        assert!(controller.open_external("not a url").is_err());
        controller.open_external("https://example.com/p/1").unwrap();

        assert_eq!(opener.opened().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_open_before_submission() {
        let controller = controller(Arc::new(RecordingOpener::new()));

        let err = controller.open_details().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NothingToOpen);
        assert!(controller.search_current().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_record_details_open_search() {
        let opener = Arc::new(RecordingOpener::new());
        let controller = controller(opener.clone());
        let mut snapshots = controller.subscribe();

        controller.submit_code("999", false).unwrap();
        snapshots.wait_for(|s| s.product().is_some()).await.unwrap();
        controller.open_details().unwrap();

        assert_eq!(
            opener.opened()[0].as_str(),
            "https://www.google.com/search?q=999"
        );
    }
}
