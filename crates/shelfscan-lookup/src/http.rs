//! # Catalog HTTP Client
//!
//! Shared `reqwest` client used by every HTTP provider.
//!
//! ## Status Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  2xx ────────► decode JSON ──► Ok(Some(body))   (decode error = Parse)  │
//! │  404 ────────► Ok(None)        catalog does not know the code           │
//! │  other ──────► Err(Http { status })                                     │
//! │  transport ──► Err(Network)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{LookupError, LookupResult};

/// User agent sent to catalogs that ask for one.
pub const DEFAULT_USER_AGENT: &str = concat!("shelfscan/", env!("CARGO_PKG_VERSION"));

/// Cheap-to-clone HTTP client for catalog requests.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
}

impl CatalogClient {
    /// Builds a client with the given user agent and request timeout.
    pub fn new(user_agent: &str, request_timeout: Duration) -> LookupResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()
            .map_err(|e| LookupError::InvalidConfig(e.to_string()))?;

        Ok(CatalogClient { http })
    }

    /// GETs `url` and decodes the JSON body.
    ///
    /// Returns `Ok(None)` on 404.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> LookupResult<Option<T>> {
        debug!(url = %redact(&url), "Catalog request");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(LookupError::Http {
                status: status.as_u16(),
                url: redact(&url),
            });
        }

        let body = response.bytes().await?;
        let parsed = serde_json::from_slice(&body)?;
        Ok(Some(parsed))
    }
}

/// Renders a URL for logs with any `key` query parameter masked.
pub(crate) fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "key") {
        return url.to_string();
    }

    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
