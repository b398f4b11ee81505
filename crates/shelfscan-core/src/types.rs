//! # Domain Types
//!
//! Core domain types used throughout Shelfscan.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │  BarcodeValue   │   │   ProductRecord     │   │  ProviderInfo   │   │
//! │  │  ─────────────  │   │  ─────────────────  │   │  ─────────────  │   │
//! │  │  non-empty      │──►│  name, brand        │◄──│  name (label)   │   │
//! │  │  exact match    │   │  image_url?         │   │  is_premium     │   │
//! │  │  dedup key      │   │  description?       │   │  (info only)    │   │
//! │  └─────────────────┘   │  category?          │   └─────────────────┘   │
//! │                        │  barcode            │                          │
//! │                        │  source_name        │                          │
//! │                        │  detail_url?        │                          │
//! │                        └─────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::{SEARCH_BASE_URL, SYSTEM_SOURCE_NAME};

// =============================================================================
// Record Defaults
// =============================================================================

/// Display name used when a catalog has no product name.
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

/// Brand used when a catalog has no brand.
pub const UNKNOWN_BRAND: &str = "Unknown brand";

/// Category used when a catalog has no category.
pub const UNSPECIFIED_CATEGORY: &str = "Unspecified category";

/// Description used when a catalog has no description.
pub const DESCRIPTION_UNAVAILABLE: &str = "Description unavailable";

/// Description of the synthetic record.
pub const FALLBACK_DESCRIPTION: &str =
    "This product exists but is not listed in any known catalog.";

/// Category of the synthetic record.
pub const FALLBACK_CATEGORY: &str = "Unclassified product";

// =============================================================================
// Barcode Value
// =============================================================================

/// A decoded or typed product identifier (EAN-13, UPC, ISBN, QR payload...).
///
/// Opaque to the pipeline. Equality is exact string match, which is also the
/// deduplication rule used by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct BarcodeValue(String);

impl BarcodeValue {
    /// Creates a barcode value, rejecting empty or whitespace-only input.
    ///
    /// The value is stored verbatim; trimming is the caller's concern (see
    /// [`crate::validation::parse_manual_code`]).
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "barcode".to_string(),
            });
        }

        Ok(BarcodeValue(raw))
    }

    /// Returns the value as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BarcodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BarcodeValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BarcodeValue {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        BarcodeValue::new(value)
    }
}

impl TryFrom<String> for BarcodeValue {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BarcodeValue::new(value)
    }
}

// =============================================================================
// Product Record
// =============================================================================

/// A displayable product, either from a catalog or synthesized.
///
/// ## Population Rules
/// - Catalog match: `name` and `brand` always set (catalog-specific
///   defaults fill gaps), `source_name` = provider name
/// - Synthetic: `source_name = "system"`, `detail_url` = web search URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductRecord {
    /// Display name.
    pub name: String,

    /// Brand or manufacturer.
    pub brand: String,

    /// Product image URL.
    pub image_url: Option<String>,

    /// Free-form description.
    pub description: Option<String>,

    /// Category path as reported by the catalog.
    pub category: Option<String>,

    /// The barcode this record answers.
    pub barcode: BarcodeValue,

    /// Name of the provider that produced the record.
    pub source_name: String,

    /// Link to more details about the product.
    pub detail_url: Option<String>,
}

impl ProductRecord {
    /// Synthesizes the placeholder record used when no catalog answered.
    pub fn fallback(code: &BarcodeValue) -> Self {
        ProductRecord {
            name: format!("Product {}", code),
            brand: UNKNOWN_BRAND.to_string(),
            image_url: None,
            description: Some(FALLBACK_DESCRIPTION.to_string()),
            category: Some(FALLBACK_CATEGORY.to_string()),
            barcode: code.clone(),
            source_name: SYSTEM_SOURCE_NAME.to_string(),
            detail_url: Some(search_url(code)),
        }
    }

    /// Returns true if this record was synthesized rather than found.
    pub fn is_fallback(&self) -> bool {
        self.source_name == SYSTEM_SOURCE_NAME
    }

    /// Returns a copy stamped with the given source name.
    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }
}

/// Builds the generic web search URL for a barcode.
///
/// ```rust
/// use shelfscan_core::{search_url, BarcodeValue};
///
/// let code = BarcodeValue::new("4006381333931").unwrap();
/// assert_eq!(search_url(&code), "https://www.google.com/search?q=4006381333931");
/// ```
pub fn search_url(code: &BarcodeValue) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(code.as_str().as_bytes()).collect();
    format!("{}?q={}", SEARCH_BASE_URL, encoded)
}

// =============================================================================
// Provider Info
// =============================================================================

/// Descriptive half of a provider: what the UI and logs see.
///
/// The lookup behavior itself lives in `shelfscan-lookup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProviderInfo {
    /// Display and log label. Duplicates are allowed; order decides.
    pub name: String,

    /// Informational only, never affects ordering.
    pub is_premium: bool,
}

impl ProviderInfo {
    /// Creates provider info.
    pub fn new(name: impl Into<String>, is_premium: bool) -> Self {
        ProviderInfo {
            name: name.into(),
            is_premium,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> BarcodeValue {
        BarcodeValue::new(raw).unwrap()
    }

    #[test]
    fn test_barcode_rejects_blank() {
        assert!(BarcodeValue::new("").is_err());
        assert!(BarcodeValue::new("   ").is_err());
    }

    #[test]
    fn test_barcode_has_no_length_cap() {
        let payload = format!("https://example.com/p?{}", "a".repeat(300));
        assert_eq!(code(&payload).as_str(), payload);
    }

    #[test]
    fn test_barcode_equality_is_exact() {
        assert_eq!(code("123"), code("123"));
        assert_ne!(code("123"), code(" 123"));
        assert_ne!(code("abc"), code("ABC"));
    }

    #[test]
    fn test_fallback_record() {
        let record = ProductRecord::fallback(&code("999"));

        assert_eq!(record.name, "Product 999");
        assert_eq!(record.brand, UNKNOWN_BRAND);
        assert_eq!(record.barcode.as_str(), "999");
        assert_eq!(record.source_name, "system");
        assert_eq!(
            record.detail_url.as_deref(),
            Some("https://www.google.com/search?q=999")
        );
        assert!(record.is_fallback());
    }

    #[test]
    fn test_search_url_encodes_query() {
        assert_eq!(
            search_url(&code("a b&c")),
            "https://www.google.com/search?q=a+b%26c"
        );
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = ProductRecord::fallback(&code("42"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["sourceName"], "system");
        assert_eq!(json["barcode"], "42");
        assert!(json.get("detailUrl").is_some());
    }
}
