//! # Catalog Providers
//!
//! HTTP-backed [`ProductLookup`](crate::ProductLookup) implementations and the
//! factory that assembles them into an ordered chain.
//!
//! ## Default Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  #  │ Provider         │ Premium │ Endpoint                              │
//! │ ────┼──────────────────┼─────────┼────────────────────────────────────── │
//! │  0  │ Barcode Lookup   │   yes   │ api.barcodelookup.com/v3/products     │
//! │  1  │ UPCitemdb        │   no    │ api.upcitemdb.com/prod/trial/lookup   │
//! │  2  │ Open Food Facts  │   no    │ world.openfoodfacts.org/api/v2        │
//! │  3  │ Web Search       │   no    │ api.duckduckgo.com                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every provider splits transport from mapping: `map_response` is a pure
//! function from the catalog's JSON schema to a [`ProductRecord`].

pub mod barcode_lookup;
pub mod open_food_facts;
pub mod upcitemdb;
pub mod web_search;

use tracing::{info, warn};

use crate::error::LookupResult;
use crate::http::CatalogClient;
use crate::provider::ProviderDescriptor;
use crate::settings::{LookupSettings, ProviderKind};

pub use barcode_lookup::BarcodeLookupProvider;
pub use open_food_facts::OpenFoodFactsProvider;
pub use upcitemdb::UpcItemDbProvider;
pub use web_search::WebSearchProvider;

/// Builds the provider chain described by `settings`, in configured order.
///
/// Providers that cannot run (Barcode Lookup without an API key) are left
/// out with a warning rather than failing every lookup.
pub fn build_providers(settings: &LookupSettings) -> LookupResult<Vec<ProviderDescriptor>> {
    let client = CatalogClient::new(&settings.user_agent, settings.http_timeout())?;
    let mut chain = Vec::with_capacity(settings.providers.len());

    for kind in &settings.providers {
        match kind {
            ProviderKind::BarcodeLookup => {
                let key = settings.barcode_lookup_api_key.clone().unwrap_or_default();
                match BarcodeLookupProvider::new(client.clone(), key) {
                    Ok(provider) => chain.push(ProviderDescriptor::new(
                        kind.display_name(),
                        kind.is_premium(),
                        provider,
                    )),
                    Err(e) => warn!(provider = %kind.display_name(), error = %e, "Provider disabled"),
                }
            }
            ProviderKind::UpcItemDb => chain.push(ProviderDescriptor::new(
                kind.display_name(),
                kind.is_premium(),
                UpcItemDbProvider::new(client.clone()),
            )),
            ProviderKind::OpenFoodFacts => chain.push(ProviderDescriptor::new(
                kind.display_name(),
                kind.is_premium(),
                OpenFoodFactsProvider::new(client.clone()),
            )),
            ProviderKind::WebSearch => chain.push(ProviderDescriptor::new(
                kind.display_name(),
                kind.is_premium(),
                WebSearchProvider::new(client.clone()),
            )),
        }
    }

    info!(
        providers = ?chain.iter().map(|p| p.name()).collect::<Vec<_>>(),
        "Provider chain ready"
    );
    Ok(chain)
}

/// Keeps a string only if it has visible content.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_skips_barcode_lookup_without_key() {
        let settings = LookupSettings::default();
        let chain = build_providers(&settings).unwrap();
        let names: Vec<_> = chain.iter().map(|p| p.name()).collect();

        assert_eq!(names, vec!["UPCitemdb", "Open Food Facts", "Web Search"]);
    }

    #[test]
    fn test_chain_follows_configured_order() {
        let settings = LookupSettings {
            providers: vec![ProviderKind::WebSearch, ProviderKind::BarcodeLookup],
            barcode_lookup_api_key: Some("k".into()),
            ..Default::default()
        };
        let chain = build_providers(&settings).unwrap();

        assert_eq!(chain[0].name(), "Web Search");
        assert_eq!(chain[1].name(), "Barcode Lookup");
        assert!(chain[1].is_premium());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(None), None);
    }
}
