//! Sort service clients and wire types

mod capability;
mod sort;

#[cfg(test)]
pub(crate) mod test_server;

pub use capability::HttpCapabilityClient;
pub use sort::HttpSortClient;

use crate::parser::ElementSet;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the sort service
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed sort trace: {0}")]
    Trace(String),
}

/// Coarse classification used when reporting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failed: refused, timed out, DNS
    Network,
    /// A response arrived but did not have the expected shape
    Protocol,
    /// The request could not be built, e.g. a base URL without a scheme
    Config,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(e) if e.is_builder() => ErrorKind::Config,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Status { .. } | ClientError::Json(_) | ClientError::Trace(_) => {
                ErrorKind::Protocol
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Protocol => write!(f, "protocol"),
            ErrorKind::Config => write!(f, "configuration"),
        }
    }
}

/// Opaque name of a sorting strategy known to the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmId(String);

impl AlgorithmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AlgorithmId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AlgorithmId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One snapshot of the working list during a sort
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortStep {
    /// Sequence position as assigned by the server
    pub id: u64,
    /// Full working list at this point
    pub list: Vec<f64>,
}

/// Ordered steps of one sort run, first to last
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SortTrace {
    pub steps: Vec<SortStep>,
}

impl SortTrace {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The final arrangement, if the trace has any steps
    pub fn last(&self) -> Option<&SortStep> {
        self.steps.last()
    }

    /// Reject traces whose steps do not all carry `width` values
    pub fn validate(&self, width: usize) -> Result<(), ClientError> {
        for step in &self.steps {
            if step.list.len() != width {
                return Err(ClientError::Trace(format!(
                    "step {} has {} values, expected {}",
                    step.id,
                    step.list.len(),
                    width
                )));
            }
        }
        Ok(())
    }
}

/// Body of a sort request
#[derive(Debug, Serialize)]
pub struct SortRequest<'a> {
    pub elements: &'a ElementSet,
    pub algorithm: &'a AlgorithmId,
}

/// Source of the algorithms the server currently accepts
#[async_trait]
pub trait CapabilityClient: Send + Sync {
    /// Fetch the supported algorithm ids; every call is a fresh request
    async fn fetch_supported(&self) -> Result<Vec<AlgorithmId>, ClientError>;
}

/// Executes sort requests against the service
#[async_trait]
pub trait SortRequestClient: Send + Sync {
    /// Submit elements and an algorithm, receiving the full trace
    async fn request_sort(
        &self,
        elements: &ElementSet,
        algorithm: &AlgorithmId,
    ) -> Result<SortTrace, ClientError>;
}

/// Build the HTTP client shared by both service clients
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Turn a non-2xx response into a protocol error carrying the body text
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}
