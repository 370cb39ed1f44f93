//! Configuration
//!
//! Values are layered: built-in defaults, then an optional file (TOML, JSON
//! or YAML), then `FERRUM_OBSERVATIONS__*` environment variables, e.g.
//! `FERRUM_OBSERVATIONS__SERVER__BASE_URL=https://fhir.example.org/r4`.

use crate::error::{Error, Result};
use crate::query::{default_mode_map, SearchModeParameters, DEFAULT_MAX_RESULTS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FERRUM_OBSERVATIONS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationsConfig {
    pub server: ServerConfig,
    pub search: SearchConfig,
}

/// FHIR server the HTTP session talks to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Patient the session is scoped to
    pub patient_id: Option<String>,
    /// Bearer token of an already completed authorization
    pub access_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            patient_id: None,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Logical mode -> FHIR search parameter
    pub modes: HashMap<String, String>,
    /// `_count` for list searches without an explicit maximum
    pub default_max_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            modes: default_mode_map(),
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ObservationsConfig {
    /// Load defaults, the optional file at `path` and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            base_url = %config.server.base_url,
            modes = config.search.modes.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse TOML text on top of the defaults (no environment)
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = &self.server.base_url;
        if !base_url.is_empty()
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(Error::InvalidConfig(format!(
                "server.base_url must be an http(s) URL, got '{base_url}'"
            )));
        }
        if self.server.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "server.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.search.default_max_results == 0 {
            return Err(Error::InvalidConfig(
                "search.default_max_results must be greater than 0".to_string(),
            ));
        }
        if let Some((mode, _)) = self
            .search
            .modes
            .iter()
            .find(|(_, param)| param.trim().is_empty())
        {
            return Err(Error::InvalidConfig(format!(
                "search.modes.{mode} maps to an empty search parameter"
            )));
        }
        Ok(())
    }

    /// Immutable mode table for the query builder
    pub fn search_modes(&self) -> SearchModeParameters {
        SearchModeParameters::new(self.search.modes.clone())
    }
}
