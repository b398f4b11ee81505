//! # Scanner Configuration
//!
//! Configuration management for the scanner app.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line (highest priority)                                    │
//! │     --device stub://4006381333931                                      │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     SHELFSCAN_DEVICE=stub://4006381333931                              │
//! │     SHELFSCAN_BARCODE_LOOKUP_KEY=...                                   │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/shelfscan/scanner.toml (Linux)                           │
//! │     ~/Library/Application Support/com.shelfscan.shelfscan/ (macOS)     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [lookup]
//! inter_attempt_delay_ms = 300
//! http_timeout_secs = 15
//! # provider_timeout_secs = 10
//!
//! [providers]
//! order = ["barcode_lookup", "upcitemdb", "open_food_facts", "web_search"]
//! # barcode_lookup_api_key = "..."
//!
//! [camera]
//! device = "stub://4006381333931"
//! frame_interval_ms = 16
//! sampling_interval_ms = 2000
//! ideal_width = 1280
//! ideal_height = 720
//! native_decoder = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use shelfscan_camera::CameraSettings;
use shelfscan_lookup::{LookupSettings, ProviderKind, DEFAULT_USER_AGENT};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "scanner.toml";

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Lookup Section
// =============================================================================

/// `[lookup]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupSection {
    /// Pause between provider attempts (milliseconds).
    #[serde(default = "default_inter_attempt_delay")]
    pub inter_attempt_delay_ms: u64,

    /// Optional bound on one provider attempt (seconds).
    #[serde(default)]
    pub provider_timeout_secs: Option<u64>,

    /// HTTP request timeout (seconds).
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_inter_attempt_delay() -> u64 {
    300
}

fn default_http_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for LookupSection {
    fn default() -> Self {
        LookupSection {
            inter_attempt_delay_ms: default_inter_attempt_delay(),
            provider_timeout_secs: None,
            http_timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

// =============================================================================
// Providers Section
// =============================================================================

/// `[providers]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersSection {
    /// Chain order; position is priority.
    #[serde(default = "default_order")]
    pub order: Vec<ProviderKind>,

    /// Required for Barcode Lookup; without it that provider is skipped.
    #[serde(default)]
    pub barcode_lookup_api_key: Option<String>,
}

fn default_order() -> Vec<ProviderKind> {
    ProviderKind::ALL.to_vec()
}

impl Default for ProvidersSection {
    fn default() -> Self {
        ProvidersSection {
            order: default_order(),
            barcode_lookup_api_key: None,
        }
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub lookup: LookupSection,

    #[serde(default)]
    pub providers: ProvidersSection,

    #[serde(default)]
    pub camera: CameraSettings,
}

impl ScannerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.lookup_settings()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        self.camera.validate().map_err(ConfigError::Invalid)?;

        if let Some(ref device) = self.camera.device {
            if device.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "camera.device must not be empty when set".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the environment in production).
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(device) = var("SHELFSCAN_DEVICE") {
            debug!(device = %device, "Overriding camera device from environment");
            self.camera.device = Some(device);
        }

        if let Some(native) = var("SHELFSCAN_NATIVE_DECODER") {
            match native.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.camera.native_decoder = true,
                "0" | "false" | "no" => self.camera.native_decoder = false,
                _ => warn!(value = %native, "Unknown SHELFSCAN_NATIVE_DECODER value"),
            }
        }

        if let Some(key) = var("SHELFSCAN_BARCODE_LOOKUP_KEY") {
            self.providers.barcode_lookup_api_key = Some(key);
        }

        if let Some(order) = var("SHELFSCAN_PROVIDERS") {
            let parsed: Result<Vec<ProviderKind>, _> = order
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(kinds) => {
                    debug!(providers = %order, "Overriding provider order from environment");
                    self.providers.order = kinds;
                }
                Err(e) => warn!(error = %e, "Ignoring SHELFSCAN_PROVIDERS"),
            }
        }

        if let Some(delay) = var("SHELFSCAN_INTER_ATTEMPT_DELAY_MS") {
            if let Ok(ms) = delay.parse::<u64>() {
                self.lookup.inter_attempt_delay_ms = ms;
            }
        }

        if let Some(timeout) = var("SHELFSCAN_PROVIDER_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.lookup.provider_timeout_secs = Some(secs);
            }
        }

        if let Some(timeout) = var("SHELFSCAN_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.lookup.http_timeout_secs = secs;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shelfscan", "shelfscan")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Flattens `[lookup]` and `[providers]` into lookup settings.
    pub fn lookup_settings(&self) -> LookupSettings {
        LookupSettings {
            inter_attempt_delay_ms: self.lookup.inter_attempt_delay_ms,
            provider_timeout_secs: self.lookup.provider_timeout_secs,
            http_timeout_secs: self.lookup.http_timeout_secs,
            user_agent: self.lookup.user_agent.clone(),
            providers: self.providers.order.clone(),
            barcode_lookup_api_key: self.providers.barcode_lookup_api_key.clone(),
        }
    }
}
