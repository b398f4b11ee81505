//! # shelfscan-lookup: Catalog Resolution for Shelfscan
//!
//! Resolves a barcode value into a [`ProductRecord`] by querying an ordered
//! chain of catalog providers. The first provider that answers wins. When
//! none answers, a synthetic fallback record is returned, so resolution as a
//! whole never fails.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Resolution Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 ResolutionPipeline (pipeline.rs)                 │  │
//! │  │  ordered walk • 300ms spacing • failure isolation • fallback     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ ProviderDescriptor { info, lookup }     │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Barcode Lookup │  │   UPCitemdb    │  │ Open Food Facts / Web  │    │
//! │  │ (premium, key) │  │  (trial API)   │  │ Search                 │    │
//! │  └───────┬────────┘  └───────┬────────┘  └───────────┬────────────┘    │
//! │          └───────────────────┼───────────────────────┘                  │
//! │                              ▼                                          │
//! │                 CatalogClient (http.rs, reqwest)                        │
//! │                                                                         │
//! │  PROGRESS EVENTS (ProgressSink):                                       │
//! │  • Attempting { provider }  • Matched  • NoMatch  • Failed  • FellBack │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`pipeline`] - `resolve` and `ResolutionPipeline`
//! - [`provider`] - `ProductLookup` trait, descriptors, progress sinks
//! - [`providers`] - HTTP catalog implementations and chain factory
//! - [`http`] - Shared HTTP client
//! - [`settings`] - Provider selection and timing knobs
//! - [`error`] - Lookup error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelfscan_core::BarcodeValue;
//! use shelfscan_lookup::{pipeline_from_settings, LookupSettings, NoOpProgress};
//!
//! let pipeline = pipeline_from_settings(&LookupSettings::default())?;
//! let code = BarcodeValue::new("3017620422003")?;
//!
//! let record = pipeline.resolve(&code, &NoOpProgress).await;
//! println!("{} ({})", record.name, record.source_name);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod http;
pub mod pipeline;
pub mod provider;
pub mod providers;
pub mod settings;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{LookupError, LookupResult};
pub use http::{CatalogClient, DEFAULT_USER_AGENT};
pub use pipeline::{resolve, PipelineConfig, ResolutionPipeline, DEFAULT_INTER_ATTEMPT_DELAY};
pub use provider::{
    FnLookup, NoOpProgress, ProductLookup, ProgressEvent, ProgressSink, ProviderDescriptor,
    RecordingProgress,
};
pub use providers::build_providers;
pub use settings::{LookupSettings, ProviderKind};

/// Builds a pipeline over the real catalog providers described by `settings`.
pub fn pipeline_from_settings(settings: &LookupSettings) -> LookupResult<ResolutionPipeline> {
    settings.validate()?;
    let providers = build_providers(settings)?;
    Ok(ResolutionPipeline::new(providers, settings.pipeline_config()))
}
