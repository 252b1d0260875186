//! sortviz - client core for a remote sort-visualization service
//!
//! This crate provides:
//! - Parsing of free-form user text into a deduplicated numeric element set
//! - Capability negotiation (which algorithms the server accepts)
//! - Sort requests returning the step-by-step trace of a run
//! - A session that keeps selection and trace consistent for a presentation layer

pub mod parser;
pub mod service;
pub mod session;

pub use parser::{parse, ElementSet};
pub use service::{
    AlgorithmId, CapabilityClient, ClientError, ErrorKind, HttpCapabilityClient, HttpSortClient,
    SortRequestClient, SortStep, SortTrace,
};
pub use session::{
    OverlapPolicy, Phase, Session, SessionError, SessionListener, SessionSnapshot, SubmitOutcome,
};

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the sort service client
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientConfig {
    /// Base URL of the sort service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the supported-algorithms endpoint (GET)
    #[serde(default = "default_algorithms_path")]
    pub algorithms_path: String,

    /// Path of the sort endpoint (POST)
    #[serde(default = "default_sort_path")]
    pub sort_path: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Algorithm selected before the server has been asked
    #[serde(default = "default_algorithm")]
    pub default_algorithm: String,

    /// Which response wins when submissions overlap
    ///
    /// Defaults to `latest-request`, which departs from plain last-write-wins:
    /// a late response to an older submission is dropped. Set `last-response`
    /// to display whichever response arrives last.
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
}

fn default_base_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_algorithms_path() -> String { "/algorithms".to_string() }
fn default_sort_path() -> String { "/sort".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_algorithm() -> String { "bubble".to_string() }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            algorithms_path: default_algorithms_path(),
            sort_path: default_sort_path(),
            timeout_secs: default_timeout_secs(),
            default_algorithm: default_algorithm(),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from TOML text; missing keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Full URL of an endpoint path, joined with exactly one slash
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.endpoint(&config.sort_path), "http://127.0.0.1:8080/sort");
        assert_eq!(
            config.endpoint(&config.algorithms_path),
            "http://127.0.0.1:8080/algorithms"
        );
        assert_eq!(config.default_algorithm, "bubble");
        assert_eq!(config.overlap_policy, OverlapPolicy::LatestRequest);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_joining() {
        let config = ClientConfig {
            base_url: "http://sorter:9000/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(config.endpoint("/sort"), "http://sorter:9000/sort");
        assert_eq!(config.endpoint("v2/sort"), "http://sorter:9000/v2/sort");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "http://10.0.0.5:8080"
timeout_secs = 5
default_algorithm = "merge"
overlap_policy = "last-response"
"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.default_algorithm, "merge");
        assert_eq!(config.overlap_policy, OverlapPolicy::LastResponse);
        assert_eq!(config.sort_path, "/sort");
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/sortviz.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_bad_policy_rejected() {
        let err = ClientConfig::from_toml_str(r#"overlap_policy = "first-wins""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
