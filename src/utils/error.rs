//! Error handling for cryptopulse.

use thiserror::Error;

/// Main error type for cryptopulse
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The query resolved to zero sources; nothing to analyse
    #[error("No sources configured for this analysis")]
    NoSourcesConfigured,

    /// A single upstream fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Cache store errors
    #[error("Cache error: {0}")]
    CacheError(String),

    /// DEX aggregator errors
    #[error("DEX error: {0}")]
    DexError(String),

    /// Bridge comparison errors
    #[error("Bridge error: {0}")]
    BridgeError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// CSV output errors
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Request errors
    #[error("Request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for cryptopulse
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of one upstream fetch. Always recoverable: the orchestrator turns
/// it into an unavailable component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by upstream")]
    RateLimited,

    #[error("resource not found")]
    NotFound,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
}

impl FetchError {
    /// Short machine-friendly tag used for metrics labels and CSV output.
    pub fn kind(&self) -> &'static str {
        match self {
            | FetchError::Timeout => "timeout",
            | FetchError::RateLimited => "rate_limited",
            | FetchError::NotFound => "not_found",
            | FetchError::MalformedResponse(_) => "malformed_response",
            | FetchError::NetworkUnavailable(_) => "network_unavailable",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16())
                .unwrap_or_else(|| FetchError::NetworkUnavailable(err.to_string()))
        } else {
            FetchError::NetworkUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::MalformedResponse(err.to_string())
    }
}

impl FetchError {
    /// Map a non-success HTTP status to a fetch error. Returns `None` for 2xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            | 200..=299 => None,
            | 429 => Some(FetchError::RateLimited),
            | 404 => Some(FetchError::NotFound),
            | 408 | 504 => Some(FetchError::Timeout),
            | other => Some(FetchError::NetworkUnavailable(format!("HTTP status {other}"))),
        }
    }
}

/// A rejected entry of a declared weight map. These are warnings: the entry
/// is dropped and the remaining weights are renormalized.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeightError {
    #[error("negative weight {weight} for source '{source_id}'")]
    Negative { source_id: String, weight: f64 },

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unparseable weight entry '{0}'")]
    Malformed(String),
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_error = Error::ConfigError("missing field".to_string());
        assert_eq!(config_error.to_string(), "Configuration error: missing field");

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let wrapped_io_error = Error::from(io_error);
        assert!(wrapped_io_error.to_string().contains("I/O error"));

        let str_error = Error::from("custom error");
        assert_eq!(str_error.to_string(), "Error: custom error");

        assert_eq!(
            Error::NoSourcesConfigured.to_string(),
            "No sources configured for this analysis"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(FetchError::from_status(200), None);
        assert_eq!(FetchError::from_status(429), Some(FetchError::RateLimited));
        assert_eq!(FetchError::from_status(404), Some(FetchError::NotFound));
        assert_eq!(FetchError::from_status(504), Some(FetchError::Timeout));
        assert!(matches!(
            FetchError::from_status(503),
            Some(FetchError::NetworkUnavailable(_))
        ));
    }

    #[test]
    fn test_fetch_error_wraps_into_error() {
        let err: Error = FetchError::RateLimited.into();
        assert_eq!(err.to_string(), "Fetch error: rate limited by upstream");
        assert_eq!(FetchError::Timeout.kind(), "timeout");
    }

    #[test]
    fn test_weight_error_display() {
        let err = WeightError::Negative { source_id: "news".into(), weight: -0.5 };
        assert_eq!(err.to_string(), "negative weight -0.5 for source 'news'");
        assert_eq!(WeightError::UnknownSource("twitter".into()).to_string(), "unknown source 'twitter'");
    }
}
