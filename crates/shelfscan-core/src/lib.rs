//! # shelfscan-core: Pure Data Model for Shelfscan
//!
//! This crate holds the shapes that flow between the camera, the catalog
//! lookup pipeline and the presentation layer. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelfscan Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (external consumer)                │   │
//! │  │    startScan / stopScan / submitCode / reset / openExternal     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ScanSnapshot                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 ScanSessionController (apps/scanner)            │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐   ┌───────────────▼──────────────┐    │
//! │  │  shelfscan-camera           │   │  shelfscan-lookup            │    │
//! │  │  CameraSession + detection  │   │  ResolutionPipeline          │    │
//! │  └──────────────┬──────────────┘   └───────────────┬──────────────┘    │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────────────────▼──────────────┐    │
//! │  │               ★ shelfscan-core (THIS CRATE) ★                   │    │
//! │  │   BarcodeValue • ProductRecord • CameraState • ScanSnapshot     │    │
//! │  │   NO I/O • NO NETWORK • NO HARDWARE                             │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Barcode values, product records, provider info
//! - [`snapshot`] - Camera state, resolution state, published snapshot
//! - [`error`] - Camera and validation error taxonomy
//! - [`validation`] - Manual input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use shelfscan_core::{BarcodeValue, ProductRecord};
//!
//! let code = BarcodeValue::new("999").unwrap();
//! let record = ProductRecord::fallback(&code);
//!
//! assert_eq!(record.source_name, "system");
//! assert_eq!(
//!     record.detail_url.as_deref(),
//!     Some("https://www.google.com/search?q=999")
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CameraError, CoreError, ValidationError};
pub use snapshot::{CameraState, Resolution, ScanSnapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Source name stamped on records synthesized when no catalog answered.
pub const SYSTEM_SOURCE_NAME: &str = "system";

/// Base URL of the generic web search used as the last-resort detail link.
pub const SEARCH_BASE_URL: &str = "https://www.google.com/search";

/// Maximum accepted length of a manually typed barcode.
///
/// Applies to typed input only; decoded payloads (long URL QR codes) are
/// taken as-is.
pub const MAX_BARCODE_LEN: usize = 256;
