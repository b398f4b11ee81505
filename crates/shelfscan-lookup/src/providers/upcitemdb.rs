//! UPCitemdb trial endpoint.
//!
//! The trial tier is rate limited per IP; the pipeline's inter-attempt delay
//! keeps bursts down but a 429 still shows up as a failed attempt.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use shelfscan_core::{BarcodeValue, ProductRecord, UNKNOWN_BRAND, UNKNOWN_PRODUCT};

use super::non_empty;
use crate::error::LookupResult;
use crate::http::CatalogClient;
use crate::provider::ProductLookup;

const ENDPOINT: &str = "https://api.upcitemdb.com/prod/trial/lookup";

#[derive(Debug, Default, Deserialize)]
pub struct UpcItemDbResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub items: Vec<UpcItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

pub struct UpcItemDbProvider {
    client: CatalogClient,
}

impl UpcItemDbProvider {
    pub fn new(client: CatalogClient) -> Self {
        UpcItemDbProvider { client }
    }
}

pub fn map_response(code: &BarcodeValue, body: UpcItemDbResponse) -> Option<ProductRecord> {
    if body.code != "OK" {
        return None;
    }
    let item = body.items.into_iter().next()?;

    Some(ProductRecord {
        name: non_empty(item.title).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        brand: non_empty(item.brand).unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
        image_url: non_empty(item.images.into_iter().next()),
        description: non_empty(item.description),
        category: non_empty(item.category),
        barcode: code.clone(),
        source_name: String::new(),
        detail_url: Some(format!("https://www.upcitemdb.com/upc/{}", code)),
    })
}

#[async_trait]
impl ProductLookup for UpcItemDbProvider {
    async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
        let url = Url::parse_with_params(ENDPOINT, &[("upc", code.as_str())])?;
        let body: Option<UpcItemDbResponse> = self.client.get_json(url).await?;
        Ok(body.and_then(|body| map_response(code, body)))
    }
}
