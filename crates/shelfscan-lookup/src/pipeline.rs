//! # Resolution Pipeline
//!
//! Sequential, first-match-wins walk over the provider chain.
//!
//! ## Run Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       resolve(code, providers)                          │
//! │                                                                         │
//! │   for each provider (array order)                                      │
//! │   │                                                                     │
//! │   ├── not first? ── sleep(inter_attempt_delay = 300ms)                  │
//! │   ├── emit Attempting { provider }                                      │
//! │   ├── lookup(code)   [isolated: error / panic / timeout = no match]     │
//! │   │        │                                                            │
//! │   │        ├── Some(record) ──► stamp source + barcode ──► RETURN       │
//! │   │        ├── None ──────────► NoMatch, continue                       │
//! │   │        └── Err ───────────► log, Failed, continue                   │
//! │   │                                                                     │
//! │   └── (chain exhausted or empty)                                        │
//! │                                                                         │
//! │   emit FellBack ──► ProductRecord::fallback(code)   (never fails)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The delay throttles burst traffic against rate-limited catalogs. There is
//! no per-provider bound unless `provider_timeout` is configured; without it
//! a provider that never answers stalls the run.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

use shelfscan_core::{BarcodeValue, ProductRecord};

use crate::error::{LookupError, LookupResult};
use crate::provider::{ProgressEvent, ProgressSink, ProviderDescriptor, RecordingProgress};

/// Default spacing between two provider attempts.
pub const DEFAULT_INTER_ATTEMPT_DELAY: Duration = Duration::from_millis(300);

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Tuning for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Pause inserted between successive provider attempts.
    pub inter_attempt_delay: Duration,

    /// Upper bound on a single provider call (`None` = unbounded).
    pub provider_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            inter_attempt_delay: DEFAULT_INTER_ATTEMPT_DELAY,
            provider_timeout: None,
        }
    }
}

// =============================================================================
// Resolve
// =============================================================================

/// Resolves `code` against `providers`, in order. Never fails.
pub async fn resolve(
    code: &BarcodeValue,
    providers: &[ProviderDescriptor],
    config: &PipelineConfig,
    progress: &dyn ProgressSink,
) -> ProductRecord {
    info!(barcode = %code, providers = providers.len(), "Resolving barcode");

    for (position, provider) in providers.iter().enumerate() {
        if position > 0 && !config.inter_attempt_delay.is_zero() {
            tokio::time::sleep(config.inter_attempt_delay).await;
        }

        progress.on_progress(&ProgressEvent::Attempting {
            provider: provider.name().to_string(),
            position,
        });
        debug!(provider = %provider.name(), position, "Trying provider");

        match attempt(provider, code, config).await {
            Ok(Some(record)) => {
                info!(provider = %provider.name(), barcode = %code, "Product found");
                progress.on_progress(&ProgressEvent::Matched {
                    provider: provider.name().to_string(),
                });

                let mut record = record.with_source(provider.name());
                record.barcode = code.clone();
                return record;
            }
            Ok(None) => {
                debug!(provider = %provider.name(), "No match");
                progress.on_progress(&ProgressEvent::NoMatch {
                    provider: provider.name().to_string(),
                });
            }
            Err(e) => {
                warn!(
                    provider = %provider.name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "Provider lookup failed"
                );
                progress.on_progress(&ProgressEvent::Failed {
                    provider: provider.name().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(barcode = %code, "No provider matched, synthesizing record");
    progress.on_progress(&ProgressEvent::FellBack);
    ProductRecord::fallback(code)
}

/// One isolated provider call.
async fn attempt(
    provider: &ProviderDescriptor,
    code: &BarcodeValue,
    config: &PipelineConfig,
) -> LookupResult<Option<ProductRecord>> {
    let call = AssertUnwindSafe(provider.lookup(code)).catch_unwind();

    let outcome = match config.provider_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(LookupError::Timeout {
                    provider: provider.name().to_string(),
                    millis: limit.as_millis() as u64,
                })
            }
        },
        None => call.await,
    };

    outcome.unwrap_or_else(|_| Err(LookupError::Panicked(provider.name().to_string())))
}

// =============================================================================
// Resolution Pipeline
// =============================================================================

/// A configured provider chain.
///
/// ## Usage
/// ```rust,ignore
/// let pipeline = ResolutionPipeline::new(providers, PipelineConfig::default());
/// let record = pipeline.resolve(&code, &NoOpProgress).await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResolutionPipeline {
    providers: Vec<ProviderDescriptor>,
    config: PipelineConfig,
}

impl ResolutionPipeline {
    pub fn new(providers: Vec<ProviderDescriptor>, config: PipelineConfig) -> Self {
        ResolutionPipeline { providers, config }
    }

    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Runs the chain for `code`.
    pub async fn resolve(&self, code: &BarcodeValue, progress: &dyn ProgressSink) -> ProductRecord {
        resolve(code, &self.providers, &self.config, progress).await
    }

    /// Runs the chain and returns the record together with every progress event.
    pub async fn resolve_with_trace(&self, code: &BarcodeValue) -> (ProductRecord, Vec<ProgressEvent>) {
        let recorder = RecordingProgress::new();
        let record = self.resolve(code, &recorder).await;
        (record, recorder.into_events())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::NoOpProgress;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn code(raw: &str) -> BarcodeValue {
        BarcodeValue::new(raw).unwrap()
    }

    fn named(name: &str, code: &BarcodeValue) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            brand: "Acme".to_string(),
            image_url: None,
            description: None,
            category: None,
            barcode: code.clone(),
            source_name: String::new(),
            detail_url: None,
        }
    }

    fn failing(name: &str) -> ProviderDescriptor {
        ProviderDescriptor::from_fn(name, false, |_| async {
            Err(LookupError::Network("connection refused".into()))
        })
    }

    fn matching(name: &str, product: &'static str) -> ProviderDescriptor {
        ProviderDescriptor::from_fn(name, false, move |code: BarcodeValue| async move {
            Ok(Some(named(product, &code)))
        })
    }

    struct Exploding;

    #[async_trait::async_trait]
    impl crate::provider::ProductLookup for Exploding {
        async fn lookup(&self, _code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
            panic!("catalog exploded")
        }
    }

    fn counting(name: &str, calls: Arc<AtomicUsize>) -> ProviderDescriptor {
        ProviderDescriptor::from_fn(name, false, move |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_match_short_circuits() {
        let c_calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ResolutionPipeline::new(
            vec![
                failing("A"),
                matching("B", "Widget"),
                counting("C", c_calls.clone()),
            ],
            PipelineConfig::default(),
        );

        let record = pipeline.resolve(&code("123"), &NoOpProgress).await;

        assert_eq!(record.name, "Widget");
        assert_eq!(record.source_name, "B");
        assert_eq!(record.barcode.as_str(), "123");
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failing_falls_back() {
        let pipeline = ResolutionPipeline::new(
            vec![failing("A"), failing("B")],
            PipelineConfig::default(),
        );

        let record = pipeline.resolve(&code("999"), &NoOpProgress).await;

        assert_eq!(record.source_name, "system");
        assert_eq!(record.barcode.as_str(), "999");
        assert_eq!(
            record.detail_url.as_deref(),
            Some("https://www.google.com/search?q=999")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_chain_falls_back() {
        let pipeline = ResolutionPipeline::default();
        let (record, events) = pipeline.resolve_with_trace(&code("0001")).await;

        assert!(record.is_fallback());
        assert_eq!(events, vec![ProgressEvent::FellBack]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_beats_latency() {
        let slow_first = ProviderDescriptor::from_fn("Slow", false, |code: BarcodeValue| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(named("From slow", &code)))
        });
        let pipeline = ResolutionPipeline::new(
            vec![slow_first, matching("Fast", "From fast")],
            PipelineConfig::default(),
        );

        let record = pipeline.resolve(&code("5"), &NoOpProgress).await;

        assert_eq!(record.source_name, "Slow");
        assert_eq!(record.name, "From slow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ResolutionPipeline::new(
            vec![
                counting("A", calls.clone()),
                counting("B", calls.clone()),
                counting("C", calls.clone()),
            ],
            PipelineConfig::default(),
        );

        let started = tokio::time::Instant::now();
        let record = pipeline.resolve(&code("77"), &NoOpProgress).await;

        assert!(record.is_fallback());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), DEFAULT_INTER_ATTEMPT_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_events_in_order() {
        let pipeline = ResolutionPipeline::new(
            vec![failing("A"), matching("B", "Widget")],
            PipelineConfig::default(),
        );

        let (_, events) = pipeline.resolve_with_trace(&code("123")).await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            ProgressEvent::Attempting {
                provider: "A".into(),
                position: 0
            }
        );
        assert!(matches!(&events[1], ProgressEvent::Failed { provider, .. } if provider == "A"));
        assert_eq!(
            events[2],
            ProgressEvent::Attempting {
                provider: "B".into(),
                position: 1
            }
        );
        assert_eq!(events[3], ProgressEvent::Matched { provider: "B".into() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_treated_as_no_match() {
        let hanging = ProviderDescriptor::from_fn("Hang", false, |_| std::future::pending());
        let pipeline = ResolutionPipeline::new(
            vec![hanging, matching("Next", "Widget")],
            PipelineConfig {
                provider_timeout: Some(Duration::from_secs(2)),
                ..Default::default()
            },
        );

        let (record, events) = pipeline.resolve_with_trace(&code("1")).await;

        assert_eq!(record.source_name, "Next");
        assert!(matches!(&events[1], ProgressEvent::Failed { provider, .. } if provider == "Hang"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_provider_is_isolated() {
        let pipeline = ResolutionPipeline::new(
            vec![
                ProviderDescriptor::new("Boom", false, Exploding),
                matching("Next", "Widget"),
            ],
            PipelineConfig::default(),
        );

        let record = pipeline.resolve(&code("1"), &NoOpProgress).await;

        assert_eq!(record.source_name, "Next");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_names_follow_order() {
        let pipeline = ResolutionPipeline::new(
            vec![matching("Same", "First"), matching("Same", "Second")],
            PipelineConfig::default(),
        );

        let record = pipeline.resolve(&code("1"), &NoOpProgress).await;

        assert_eq!(record.name, "First");
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_record_counts_as_present() {
        let sparse = ProviderDescriptor::from_fn("Sparse", false, |code: BarcodeValue| async move {
            Ok(Some(named("", &code)))
        });
        let pipeline = ResolutionPipeline::new(vec![sparse], PipelineConfig::default());

        let record = pipeline.resolve(&code("1"), &NoOpProgress).await;

        assert_eq!(record.source_name, "Sparse");
        assert!(record.name.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_barcode_overrides_provider_barcode() {
        let foreign = ProviderDescriptor::from_fn("Foreign", false, |_| async {
            let mut record = named("Widget", &code("other"));
            record.source_name = "upstream".to_string();
            Ok(Some(record))
        });
        let pipeline = ResolutionPipeline::new(vec![foreign], PipelineConfig::default());

        let record = pipeline.resolve(&code("123"), &NoOpProgress).await;

        assert_eq!(record.barcode.as_str(), "123");
        assert_eq!(record.source_name, "Foreign");
        assert_eq!(record.name, "Widget");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_match_at_each_position() {
        for position in 0..3 {
            let mut providers = vec![
                failing("Down"),
                counting("Empty", Arc::new(AtomicUsize::new(0))),
            ];
            providers.insert(position, matching("Hit", "Widget"));
            let pipeline = ResolutionPipeline::new(providers, PipelineConfig::default());

            let (record, events) = pipeline.resolve_with_trace(&code("42")).await;

            assert_eq!(record.source_name, "Hit", "match at position {}", position);
            assert_eq!(record.barcode.as_str(), "42");
            assert_eq!(
                events.last(),
                Some(&ProgressEvent::Matched {
                    provider: "Hit".into()
                })
            );
            let attempts = events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::Attempting { .. }))
                .count();
            assert_eq!(attempts, position + 1, "match at position {}", position);
        }
    }
}
