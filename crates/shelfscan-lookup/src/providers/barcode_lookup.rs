//! Barcode Lookup (premium, API key required).

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use shelfscan_core::{BarcodeValue, ProductRecord, UNKNOWN_BRAND, UNKNOWN_PRODUCT};

use super::non_empty;
use crate::error::{LookupError, LookupResult};
use crate::http::CatalogClient;
use crate::provider::ProductLookup;

const ENDPOINT: &str = "https://api.barcodelookup.com/v3/products";

#[derive(Debug, Default, Deserialize)]
pub struct BarcodeLookupResponse {
    #[serde(default)]
    pub products: Vec<BarcodeLookupProduct>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BarcodeLookupProduct {
    #[serde(default)]
    pub product_name: Option<String>,
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
    #[serde(default)]
    pub product_url: Option<String>,
}

pub struct BarcodeLookupProvider {
    client: CatalogClient,
    api_key: String,
}

impl BarcodeLookupProvider {
    /// Fails with `MissingApiKey` when `api_key` is blank.
    pub fn new(client: CatalogClient, api_key: impl Into<String>) -> LookupResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LookupError::MissingApiKey("Barcode Lookup".into()));
        }
        Ok(BarcodeLookupProvider { client, api_key })
    }

    fn url(&self, code: &BarcodeValue) -> LookupResult<Url> {
        Ok(Url::parse_with_params(
            ENDPOINT,
            &[
                ("barcode", code.as_str()),
                ("formatted", "y"),
                ("key", self.api_key.as_str()),
            ],
        )?)
    }
}

/// Maps the first product of a response, if any.
pub fn map_response(code: &BarcodeValue, body: BarcodeLookupResponse) -> Option<ProductRecord> {
    let product = body.products.into_iter().next()?;

    Some(ProductRecord {
        name: non_empty(product.product_name)
            .or_else(|| non_empty(product.title))
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        brand: non_empty(product.brand).unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
        image_url: non_empty(product.images.into_iter().next()),
        description: non_empty(product.description),
        category: non_empty(product.category),
        barcode: code.clone(),
        source_name: String::new(),
        detail_url: Some(
            non_empty(product.product_url)
                .unwrap_or_else(|| format!("https://www.barcodelookup.com/{}", code)),
        ),
    })
}

#[async_trait]
impl ProductLookup for BarcodeLookupProvider {
    async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
        let body: Option<BarcodeLookupResponse> = self.client.get_json(self.url(code)?).await?;
        Ok(body.and_then(|body| map_response(code, body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn code() -> BarcodeValue {
        BarcodeValue::new("0885909950805").unwrap()
    }

    #[test]
    fn test_maps_title_when_name_missing() {
        let body: BarcodeLookupResponse = serde_json::from_str(
            r#"{"products":[{"title":"iPhone 6","brand":"Apple","images":["https://img/1.jpg"],"category":"Phones"}]}"#,
        )
        .unwrap();

        let record = map_response(&code(), body).unwrap();

        assert_eq!(record.name, "iPhone 6");
        assert_eq!(record.brand, "Apple");
        assert_eq!(record.image_url.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(
            record.detail_url.as_deref(),
            Some("https://www.barcodelookup.com/0885909950805")
        );
    }

    #[test]
    fn test_defaults_for_sparse_product() {
        let body: BarcodeLookupResponse = serde_json::from_str(r#"{"products":[{}]}"#).unwrap();
        let record = map_response(&code(), body).unwrap();

        assert_eq!(record.name, UNKNOWN_PRODUCT);
        assert_eq!(record.brand, UNKNOWN_BRAND);
        assert!(record.image_url.is_none());
    }

    #[test]
    fn test_no_products_is_no_match() {
        let body: BarcodeLookupResponse = serde_json::from_str(r#"{"products":[]}"#).unwrap();
        assert!(map_response(&code(), body).is_none());
    }

    #[test]
    fn test_blank_key_rejected() {
        let client = CatalogClient::new("test", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            BarcodeLookupProvider::new(client, "  "),
            Err(LookupError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_url_carries_key() {
        let client = CatalogClient::new("test", Duration::from_secs(1)).unwrap();
        let provider = BarcodeLookupProvider::new(client, "abc").unwrap();
        let url = provider.url(&code()).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.barcodelookup.com/v3/products?barcode=0885909950805&formatted=y&key=abc"
        );
    }
}
