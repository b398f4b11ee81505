//! Plain-text rendering of a [`ScanSnapshot`] for the terminal.

use std::fmt::Write;

use shelfscan_core::{CameraState, ScanSnapshot};

/// Renders the fields a user cares about, one per line.
pub fn render(snapshot: &ScanSnapshot) -> String {
    let mut out = String::new();

    match &snapshot.session_state {
        CameraState::Error(err) => {
            let _ = writeln!(out, "camera: error ({})", err);
        }
        state => {
            let _ = writeln!(out, "camera: {}", state);
        }
    }

    if let Some(error) = snapshot.error() {
        let _ = writeln!(out, "error: {}", error);
    }

    if snapshot.is_loading() {
        match snapshot.current_source() {
            Some(source) => {
                let _ = writeln!(out, "searching {}...", source);
            }
            None => {
                let _ = writeln!(out, "searching...");
            }
        }
    }

    if let Some(product) = snapshot.product() {
        let _ = writeln!(out, "product: {}", product.name);
        let _ = writeln!(out, "  brand: {}", product.brand);
        if let Some(category) = &product.category {
            let _ = writeln!(out, "  category: {}", category);
        }
        if let Some(description) = &product.description {
            let _ = writeln!(out, "  description: {}", description);
        }
        if let Some(image_url) = &product.image_url {
            let _ = writeln!(out, "  image: {}", image_url);
        }
        let _ = writeln!(out, "  barcode: {}", product.barcode);
        if product.is_fallback() {
            let _ = writeln!(out, "  source: not found in any catalog");
        } else {
            let _ = writeln!(out, "  source: {}", product.source_name);
        }
        if let Some(detail_url) = &product.detail_url {
            let _ = writeln!(out, "  details: {}", detail_url);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfscan_core::{BarcodeValue, CameraError, ProductRecord, Resolution};

    #[test]
    fn test_render_camera_error_and_fallback() {
        let code = BarcodeValue::new("999").unwrap();
        let snapshot = ScanSnapshot {
            session_state: CameraState::Error(CameraError::PermissionDenied),
            last_submitted_code: Some(code.clone()),
            resolution: Resolution::resolved(ProductRecord::fallback(&code)),
            ..Default::default()
        };

        let text = render(&snapshot);

        assert!(text.starts_with("camera: error ("));
        assert!(text.contains("not found in any catalog"));
        assert!(text.contains("https://www.google.com/search?q=999"));
    }

    #[test]
    fn test_render_querying() {
        let snapshot = ScanSnapshot {
            resolution: Resolution::querying("UPCitemdb"),
            ..Default::default()
        };

        assert!(render(&snapshot).contains("searching UPCitemdb..."));
    }
}
