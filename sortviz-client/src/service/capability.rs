//! Capability negotiation over HTTP

use super::{check_status, AlgorithmId, CapabilityClient, ClientError};
use crate::ClientConfig;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Reads the supported algorithm list from the service
pub struct HttpCapabilityClient {
    client: Client,
    url: String,
}

impl HttpCapabilityClient {
    /// Create a client for the endpoint named in `config`
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        Self::with_url(client, config.endpoint(&config.algorithms_path))
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
impl CapabilityClient for HttpCapabilityClient {
    async fn fetch_supported(&self) -> Result<Vec<AlgorithmId>, ClientError> {
        let response = self.client.get(&self.url).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;

        let supported: Vec<AlgorithmId> = serde_json::from_slice(&body)?;
        debug!(url = %self.url, count = supported.len(), "Fetched supported algorithms");

        Ok(supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{test_server, ErrorKind};
    use axum::{http::StatusCode, routing::get, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn client_at(base: &str) -> HttpCapabilityClient {
        HttpCapabilityClient::with_url(test_server::client(), format!("{}/algorithms", base))
    }

    #[tokio::test]
    async fn test_fetch_supported() {
        let router = Router::new().route(
            "/algorithms",
            get(|| async { Json(vec!["bubble", "insertion", "merge"]) }),
        );
        let base = test_server::spawn(router).await;
        let client = client_at(&base);

        let supported = client.fetch_supported().await.unwrap();
        assert_eq!(
            supported,
            vec![
                AlgorithmId::from("bubble"),
                AlgorithmId::from("insertion"),
                AlgorithmId::from("merge"),
            ]
        );
    }

    #[tokio::test]
    async fn test_every_call_hits_the_server() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/algorithms",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(vec!["bubble"])
                }
            }),
        );
        let base = test_server::spawn(router).await;
        let client = client_at(&base);

        client.fetch_supported().await.unwrap();
        client.fetch_supported().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_string_array_is_protocol_error() {
        let router = Router::new().route("/algorithms", get(|| async { Json(vec![1, 2, 3]) }));
        let base = test_server::spawn(router).await;
        let client = client_at(&base);

        let err = client.fetch_supported().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_invalid_json_is_protocol_error() {
        let router = Router::new().route("/algorithms", get(|| async { "bubble, merge" }));
        let base = test_server::spawn(router).await;
        let client = client_at(&base);

        let err = client.fetch_supported().await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_protocol_error() {
        let router = Router::new().route(
            "/algorithms",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        );
        let base = test_server::spawn(router).await;
        let client = client_at(&base);

        match client.fetch_supported().await.unwrap_err() {
            ClientError::Status { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "down for maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let base = test_server::unreachable_url().await;
        let client = client_at(&base);

        let err = client.fetch_supported().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_url_without_scheme_is_config_error() {
        let client = HttpCapabilityClient::with_url(test_server::client(), "/algorithms");

        let err = client.fetch_supported().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
