//! Sort requests over HTTP

use super::{check_status, AlgorithmId, ClientError, SortRequest, SortRequestClient, SortTrace};
use crate::parser::ElementSet;
use crate::ClientConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info};

/// Posts element sets to the service and decodes the returned trace
pub struct HttpSortClient {
    client: Client,
    url: String,
}

impl HttpSortClient {
    /// Create a client for the endpoint named in `config`
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        Self::with_url(client, config.endpoint(&config.sort_path))
    }

    /// Create a client for an explicit endpoint URL
    pub fn with_url(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SortRequestClient for HttpSortClient {
    async fn request_sort(
        &self,
        elements: &ElementSet,
        algorithm: &AlgorithmId,
    ) -> Result<SortTrace, ClientError> {
        let request = SortRequest {
            elements,
            algorithm,
        };

        info!(
            url = %self.url,
            algorithm = %algorithm,
            elements = elements.len(),
            "Requesting sort"
        );
        let start = Instant::now();

        let response = self.client.post(&self.url).json(&request).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;

        let trace: SortTrace = serde_json::from_slice(&body)?;
        trace.validate(elements.len())?;

        debug!(
            steps = trace.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Received sort trace"
        );

        Ok(trace)
    }
}
