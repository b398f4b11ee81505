//! Open Food Facts v2 product API.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use shelfscan_core::{
    BarcodeValue, ProductRecord, DESCRIPTION_UNAVAILABLE, UNKNOWN_BRAND, UNKNOWN_PRODUCT,
    UNSPECIFIED_CATEGORY,
};

use super::non_empty;
use crate::error::LookupResult;
use crate::http::CatalogClient;
use crate::provider::ProductLookup;

const BASE_URL: &str = "https://world.openfoodfacts.org/";

#[derive(Debug, Default, Deserialize)]
pub struct OpenFoodFactsResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub product: Option<OpenFoodFactsProduct>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenFoodFactsProduct {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub ingredients_text: Option<String>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

pub struct OpenFoodFactsProvider {
    client: CatalogClient,
}

impl OpenFoodFactsProvider {
    pub fn new(client: CatalogClient) -> Self {
        OpenFoodFactsProvider { client }
    }

    fn url(code: &BarcodeValue) -> LookupResult<Url> {
        let mut url = Url::parse(BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| crate::error::LookupError::InvalidUrl(BASE_URL.to_string()))?
            .pop_if_empty()
            .extend(["api", "v2", "product", &format!("{}.json", code)]);
        Ok(url)
    }
}

pub fn map_response(code: &BarcodeValue, body: OpenFoodFactsResponse) -> Option<ProductRecord> {
    if body.status != 1 {
        return None;
    }
    let product = body.product?;

    Some(ProductRecord {
        name: non_empty(product.product_name).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        brand: non_empty(product.brands).unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
        image_url: non_empty(product.image_url),
        description: Some(
            non_empty(product.generic_name)
                .or_else(|| non_empty(product.ingredients_text))
                .unwrap_or_else(|| DESCRIPTION_UNAVAILABLE.to_string()),
        ),
        category: Some(non_empty(product.categories).unwrap_or_else(|| UNSPECIFIED_CATEGORY.to_string())),
        barcode: code.clone(),
        source_name: String::new(),
        detail_url: Some(
            non_empty(product.url)
                .unwrap_or_else(|| format!("https://world.openfoodfacts.org/product/{}", code)),
        ),
    })
}

#[async_trait]
impl ProductLookup for OpenFoodFactsProvider {
    async fn lookup(&self, code: &BarcodeValue) -> LookupResult<Option<ProductRecord>> {
        let body: Option<OpenFoodFactsResponse> = self.client.get_json(Self::url(code)?).await?;
        Ok(body.and_then(|body| map_response(code, body)))
    }
}
