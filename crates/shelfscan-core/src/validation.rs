//! # Validation Module
//!
//! Input validation for manually typed barcodes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Manual Input Path                                  │
//! │                                                                         │
//! │  "  4006381333931 \n"                                                   │
//! │           │ trim                                                        │
//! │           ▼                                                             │
//! │  "4006381333931" ── empty? ──► ValidationError::Required ──► banner     │
//! │           │                                                             │
//! │           ▼ control chars? ──► ValidationError::InvalidFormat           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  BarcodeValue ──► same pipeline + dedup field as camera detections      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::BarcodeValue;
use crate::MAX_BARCODE_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Parses a manually typed barcode.
///
/// ## Rules
/// - Surrounding whitespace is trimmed
/// - Must not be empty after trimming
/// - Must not contain control characters
/// - At most [`MAX_BARCODE_LEN`] bytes
///
/// ## Example
/// ```rust
/// use shelfscan_core::validation::parse_manual_code;
///
/// assert_eq!(parse_manual_code("  123 ").unwrap().as_str(), "123");
/// assert!(parse_manual_code("   ").is_err());
/// ```
pub fn parse_manual_code(input: &str) -> ValidationResult<BarcodeValue> {
    let code = input.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if code.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }

    if code.len() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    BarcodeValue::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual_code_trims() {
        assert_eq!(parse_manual_code("\t978-3-16 \n").unwrap().as_str(), "978-3-16");
    }

    #[test]
    fn test_parse_manual_code_rejects_empty() {
        let err = parse_manual_code("").unwrap_err();
        assert_eq!(
            err,
            ValidationError::Required {
                field: "barcode".to_string()
            }
        );
    }

    #[test]
    fn test_parse_manual_code_caps_length() {
        assert!(parse_manual_code(&"7".repeat(MAX_BARCODE_LEN)).is_ok());
        assert!(matches!(
            parse_manual_code(&"7".repeat(MAX_BARCODE_LEN + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_manual_code_rejects_control_chars() {
        assert!(matches!(
            parse_manual_code("12\u{7}3"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
