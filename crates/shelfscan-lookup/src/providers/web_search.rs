//! Generic web search via the DuckDuckGo instant answer API.
//!
//! Last catalog in the default chain. It rarely knows a barcode, but when it
//! does the answer is a usable description of a consumer product.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use shelfscan_core::{search_url, BarcodeValue, ProductRecord, UNSPECIFIED_CATEGORY};

use super::non_empty;
use crate::error::LookupResult;
use crate::http::CatalogClient;
use crate::provider::ProductLookup;

const ENDPOINT: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstantAnswer {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub r#abstract: Option<String>,
    #[serde(default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub abstract_source: Option<String>,
    #[serde(default, rename = "AbstractURL")]
    pub abstract_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

pub struct WebSearchProvider {
    client: CatalogClient,
}

impl WebSearchProvider {
    pub fn new(client: CatalogClient) -> Self {
        WebSearchProvider { client }
    }
}

pub fn map_response(code: &BarcodeValue, body: InstantAnswer) -> Option<ProductRecord> {
    let heading = non_empty(body.heading);
    let summary = non_empty(body.r#abstract);
    if heading.is_none() && summary.is_none() {
        return None;
    }

    let category = if non_empty(body.abstract_text).is_some() {
        "Consumer product".to_string()
    } else {
        UNSPECIFIED_CATEGORY.to_string()
    };

    Some(ProductRecord {
        name: heading.unwrap_or_else(|| format!("Product {}", code)),
        brand: non_empty(body.abstract_source).unwrap_or_else(|| "Generic information".to_string()),
        image_url: non_empty(body.image),
        description: Some(summary.unwrap_or_else(|| "Information available via web search".to_string())),
        category: Some(category),
        barcode: code.clone(),
        source_name: String::new(),
        detail_url: Some(non_empty(body.abstract_url).unwrap_or_else(|| search_url(code))),
    })
}

#[async_trait]
impl ProductLookup for WebSearchProvider {
    async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
        let url = Url::parse_with_params(ENDPOINT, &[("q", code.as_str()), ("format", "json")])?;
        let body: Option<InstantAnswer> = self.client.get_json(url).await?;
        Ok(body.and_then(|body| map_response(code, body)))
    }
}
