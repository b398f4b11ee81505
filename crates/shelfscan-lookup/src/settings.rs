//! # Lookup Settings
//!
//! Runtime knobs for the resolution pipeline and the provider chain. The
//! scanner app fills this from the `[lookup]` and `[providers]` sections of
//! its config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, LookupResult};
use crate::http::DEFAULT_USER_AGENT;
use crate::pipeline::PipelineConfig;

// =============================================================================
// Provider Kind
// =============================================================================

/// The catalogs this crate knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    BarcodeLookup,
    #[serde(rename = "upcitemdb")]
    UpcItemDb,
    OpenFoodFacts,
    WebSearch,
}

impl ProviderKind {
    /// Every provider in default priority order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::BarcodeLookup,
        ProviderKind::UpcItemDb,
        ProviderKind::OpenFoodFacts,
        ProviderKind::WebSearch,
    ];

    /// Human-readable name, used as the record's `source_name`.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::BarcodeLookup => "Barcode Lookup",
            ProviderKind::UpcItemDb => "UPCitemdb",
            ProviderKind::OpenFoodFacts => "Open Food Facts",
            ProviderKind::WebSearch => "Web Search",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, ProviderKind::BarcodeLookup)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::BarcodeLookup => write!(f, "barcode_lookup"),
            ProviderKind::UpcItemDb => write!(f, "upcitemdb"),
            ProviderKind::OpenFoodFacts => write!(f, "open_food_facts"),
            ProviderKind::WebSearch => write!(f, "web_search"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "barcode_lookup" | "barcodelookup" => Ok(ProviderKind::BarcodeLookup),
            "upcitemdb" | "upc_item_db" => Ok(ProviderKind::UpcItemDb),
            "open_food_facts" | "openfoodfacts" | "off" => Ok(ProviderKind::OpenFoodFacts),
            "web_search" | "websearch" | "duckduckgo" => Ok(ProviderKind::WebSearch),
            other => Err(LookupError::InvalidConfig(format!(
                "Unknown provider: '{}'. Valid options: barcode_lookup, upcitemdb, open_food_facts, web_search",
                other
            ))),
        }
    }
}

// =============================================================================
// Lookup Settings
// =============================================================================

/// Everything needed to build a [`ResolutionPipeline`](crate::ResolutionPipeline)
/// with real catalog providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Pause before every attempt except the first (milliseconds).
    pub inter_attempt_delay_ms: u64,

    /// Upper bound on a single provider attempt. `None` leaves attempts
    /// bounded only by the HTTP timeout.
    pub provider_timeout_secs: Option<u64>,

    /// Request timeout of the shared HTTP client (seconds).
    pub http_timeout_secs: u64,

    pub user_agent: String,

    /// Chain order; position is priority.
    pub providers: Vec<ProviderKind>,

    pub barcode_lookup_api_key: Option<String>,
}

impl Default for LookupSettings {
    fn default() -> Self {
        LookupSettings {
            inter_attempt_delay_ms: 300,
            provider_timeout_secs: None,
            http_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            providers: ProviderKind::ALL.to_vec(),
            barcode_lookup_api_key: None,
        }
    }
}

impl LookupSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            inter_attempt_delay: Duration::from_millis(self.inter_attempt_delay_ms),
            provider_timeout: self.provider_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> LookupResult<()> {
        if self.http_timeout_secs == 0 {
            return Err(LookupError::InvalidConfig(
                "http_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.provider_timeout_secs == Some(0) {
            return Err(LookupError::InvalidConfig(
                "provider_timeout_secs must be greater than 0 when set".into(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(LookupError::InvalidConfig("user_agent must not be empty".into()));
        }

        let mut seen = Vec::with_capacity(self.providers.len());
        for kind in &self.providers {
            if seen.contains(kind) {
                return Err(LookupError::InvalidConfig(format!(
                    "provider '{}' is listed more than once",
                    kind
                )));
            }
            seen.push(*kind);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("upcitemdb".parse::<ProviderKind>().unwrap(), ProviderKind::UpcItemDb);
        assert_eq!("Open-Food-Facts".parse::<ProviderKind>().unwrap(), ProviderKind::OpenFoodFacts);
        assert_eq!("duckduckgo".parse::<ProviderKind>().unwrap(), ProviderKind::WebSearch);
        assert!("amazon".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_defaults() {
        let settings = LookupSettings::default();
        let config = settings.pipeline_config();

        assert_eq!(config.inter_attempt_delay, Duration::from_millis(300));
        assert!(config.provider_timeout.is_none());
        assert_eq!(settings.providers.len(), 4);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut settings = LookupSettings {
            providers: vec![ProviderKind::WebSearch, ProviderKind::WebSearch],
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(LookupError::InvalidConfig(_))));

        settings.providers = vec![ProviderKind::WebSearch];
        settings.provider_timeout_secs = Some(0);
        assert!(settings.validate().is_err());

        settings.provider_timeout_secs = Some(5);
        settings.http_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }
}
