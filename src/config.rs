//! Settings loaded with Figment.
//!
//! Configuration is layered from:
//! 1. `config/datastreams.toml` (optional; every section has defaults)
//! 2. Environment variables prefixed with `RUST_DATASTREAMS_`, nested keys split on `__`
//!
//! # Example
//! ```no_run
//! use rust_datastreams::config::Settings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! settings.validate()?;
//! println!("whoami list: {}", settings.harp.whoami_url);
//! # Ok(())
//! # }
//! ```

use crate::error::{AppResult, ContractError};
use crate::validation;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/datastreams.toml";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application name and log level.
    pub application: ApplicationConfig,
    /// Harp schema lookup settings.
    pub harp: HarpSettings,
    /// Branch loading defaults.
    pub loader: LoaderConfig,
}

/// Application-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name, used in log output.
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "rust-datastreams".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Where device schemas for harp boards are fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarpSettings {
    /// YAML list mapping WhoAmI values to device repositories.
    pub whoami_url: String,
    /// Branch or tag of the device repository holding `device.yml`.
    pub release: String,
    /// Timeout for remote schema requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HarpSettings {
    fn default() -> Self {
        Self {
            whoami_url: "https://raw.githubusercontent.com/harp-tech/protocol/main/whoami.yml"
                .to_string(),
            release: "main".to_string(),
            request_timeout_secs: 5,
        }
    }
}

/// Defaults for recursive branch loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Propagate the first failure instead of collecting them.
    pub strict: bool,
    /// Leave already-loaded nodes untouched.
    pub skip_loaded: bool,
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// Environment variables override the file, e.g.
    /// `RUST_DATASTREAMS_HARP__RELEASE=v1.2`.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RUST_DATASTREAMS_").split("__"))
            .extract()?;
        Ok(settings)
    }

    /// Validate settings after loading
    pub fn validate(&self) -> AppResult<()> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(ContractError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LEVELS.join(", ")
            )));
        }

        validation::is_not_empty(&self.harp.release)
            .map_err(|e| ContractError::Configuration(format!("harp.release: {e}")))?;

        validation::is_http_url(&self.harp.whoami_url).map_err(|e| {
            ContractError::Configuration(format!(
                "harp.whoami_url '{}': {e}",
                self.harp.whoami_url
            ))
        })?;

        validation::is_in_range(self.harp.request_timeout_secs, 1..=300).map_err(|_| {
            ContractError::Configuration(format!(
                "Invalid request_timeout_secs {}. Must be 1-300",
                self.harp.request_timeout_secs
            ))
        })?;

        Ok(())
    }
}
