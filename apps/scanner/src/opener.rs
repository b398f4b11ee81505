//! External link opener.
//!
//! The controller never launches anything itself; "open details" and
//! "search this product" go through an [`ExternalOpener`].

use std::sync::Mutex;

use tracing::info;
use url::Url;

use crate::error::AppError;

/// Opens a URL outside the app (browser, terminal, recorder in tests).
pub trait ExternalOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), AppError>;
}

/// Default opener for the terminal front end: logs and prints the link.
#[derive(Debug, Default)]
pub struct ConsoleOpener;

impl ExternalOpener for ConsoleOpener {
    fn open(&self, url: &Url) -> Result<(), AppError> {
        info!(url = %url, "Opening external link");
        println!("open: {}", url);
        Ok(())
    }
}

/// Keeps every opened URL, in order.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<Url>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<Url> {
        match self.opened.lock() {
            Ok(opened) => opened.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ExternalOpener for RecordingOpener {
    fn open(&self, url: &Url) -> Result<(), AppError> {
        match self.opened.lock() {
            Ok(mut opened) => opened.push(url.clone()),
            Err(poisoned) => poisoned.into_inner().push(url.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_opener_keeps_order() {
        let opener = RecordingOpener::new();
        opener.open(&Url::parse("https://a.example/").unwrap()).unwrap();
        opener.open(&Url::parse("https://b.example/").unwrap()).unwrap();

        let hosts: Vec<_> = opener
            .opened()
            .iter()
            .map(|u| u.host_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(hosts, vec!["a.example", "b.example"]);
    }
}
