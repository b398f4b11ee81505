//! # Providers and Progress
//!
//! The seam between the pipeline and the catalogs it asks.
//!
//! ## Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ProviderDescriptor                     ProgressSink                    │
//! │  ┌──────────────────────────────┐       ┌──────────────────────────┐   │
//! │  │ info: ProviderInfo           │       │ on_progress(&event)      │   │
//! │  │   name, is_premium           │       │                          │   │
//! │  │ lookup: Arc<dyn ProductLookup>│      │ NoOpProgress             │   │
//! │  │   code → Option<Record>       │      │ RecordingProgress        │   │
//! │  └──────────────────────────────┘       │ (controller's snapshot)  │   │
//! │                                         └──────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use shelfscan_core::{BarcodeValue, ProductRecord, ProviderInfo};

use crate::error::LookupResult;

// =============================================================================
// Product Lookup Trait
// =============================================================================

/// A barcode → product lookup against one catalog.
///
/// `Ok(None)` means "the catalog does not know this code". `Err` means the
/// catalog could not be asked; the pipeline treats both as no match.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>>;
}

/// Adapts an async closure into a [`ProductLookup`].
pub struct FnLookup<F>(F);

#[async_trait]
impl<F, Fut> ProductLookup for FnLookup<F>
where
    F: Fn(BarcodeValue) -> Fut + Send + Sync,
    Fut: Future<Output = LookupResult<Option<ProductRecord>>> + Send,
{
    async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
        (self.0)(code.clone()).await
    }
}

// =============================================================================
// Provider Descriptor
// =============================================================================

/// One entry in the ordered provider chain. Priority is array position.
#[derive(Clone)]
pub struct ProviderDescriptor {
    info: ProviderInfo,
    lookup: Arc<dyn ProductLookup>,
}

impl ProviderDescriptor {
    /// Creates a descriptor from a lookup implementation.
    pub fn new(name: impl Into<String>, is_premium: bool, lookup: impl ProductLookup + 'static) -> Self {
        ProviderDescriptor {
            info: ProviderInfo::new(name, is_premium),
            lookup: Arc::new(lookup),
        }
    }

    /// Creates a descriptor from an async closure.
    ///
    /// ## Usage
    /// ```rust
    /// use shelfscan_lookup::ProviderDescriptor;
    ///
    /// let never = ProviderDescriptor::from_fn("Empty", false, |_code| async { Ok(None) });
    /// assert_eq!(never.name(), "Empty");
    /// ```
    pub fn from_fn<F, Fut>(name: impl Into<String>, is_premium: bool, f: F) -> Self
    where
        F: Fn(BarcodeValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LookupResult<Option<ProductRecord>>> + Send + 'static,
    {
        Self::new(name, is_premium, FnLookup(f))
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_premium(&self) -> bool {
        self.info.is_premium
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    /// Asks this provider's catalog.
    pub async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
        self.lookup.lookup(code).await
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.info.name)
            .field("is_premium", &self.info.is_premium)
            .finish()
    }
}

// =============================================================================
// Progress Events
// =============================================================================

/// Progress notifications emitted by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// About to ask `provider` (position in the chain).
    Attempting { provider: String, position: usize },
    /// `provider` answered with a record; the run is over.
    Matched { provider: String },
    /// `provider` answered but does not know the code.
    NoMatch { provider: String },
    /// `provider` could not be asked.
    Failed { provider: String, error: String },
    /// No provider matched; the synthetic record was produced.
    FellBack,
}

impl ProgressEvent {
    /// Provider this event refers to, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            ProgressEvent::Attempting { provider, .. }
            | ProgressEvent::Matched { provider }
            | ProgressEvent::NoMatch { provider }
            | ProgressEvent::Failed { provider, .. } => Some(provider),
            ProgressEvent::FellBack => None,
        }
    }
}

/// Receives progress events (implemented by the session controller).
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op sink for callers that only want the record.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Sink that keeps every event, in order.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events seen so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Consumes the sink, returning its events.
    pub fn into_events(self) -> Vec<ProgressEvent> {
        match self.events.into_inner() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Names of the providers that were attempted, in order.
    pub fn attempted(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Attempting { provider, .. } => Some(provider),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn on_progress(&self, event: &ProgressEvent) {
        (**self).on_progress(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_lookup_receives_code() {
        let provider = ProviderDescriptor::from_fn("Echo", true, |code: BarcodeValue| async move {
            Ok(Some(ProductRecord::fallback(&code)))
        });

        let code = BarcodeValue::new("42").unwrap();
        let record = provider.lookup(&code).await.unwrap().unwrap();

        assert_eq!(record.barcode, code);
        assert!(provider.is_premium());
    }

    #[test]
    fn test_recording_progress_keeps_order() {
        let sink = RecordingProgress::new();
        sink.on_progress(&ProgressEvent::Attempting {
            provider: "A".into(),
            position: 0,
        });
        sink.on_progress(&ProgressEvent::NoMatch { provider: "A".into() });
        sink.on_progress(&ProgressEvent::Attempting {
            provider: "B".into(),
            position: 1,
        });

        assert_eq!(sink.attempted(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(sink.events().len(), 3);
    }
}
