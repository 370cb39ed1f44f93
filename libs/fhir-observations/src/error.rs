//! Error types for observation queries

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Observation query errors
///
/// "No matching resource" is never an error: single lookups return the
/// not-found sentinel and list lookups return an empty `Vec`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session not ready: {0}")]
    SessionNotReady(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FHIR server returned {status} for {url}: {diagnostics}")]
    Status {
        status: u16,
        url: String,
        diagnostics: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ValueSet not found: {0}")]
    ValueSetNotFound(String),

    #[error("Invalid ValueSet: {0}")]
    InvalidValueSet(String),
}
