//! HTTP client for the exercise catalog API

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;

use super::{ExerciseSource, PageResponse};
use crate::config::CatalogConfig;
use crate::error::{AppError, FetchError};
use crate::metrics;

/// Catalog API client
///
/// Every request carries the configured timeout; there is no retry here,
/// the sync loop owns retry policy.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: Client,
    /// Fully qualified `.../exercises` endpoint
    exercises_url: String,
}

impl CatalogClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: &CatalogConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Self::with_client(http, &config.base_url)
    }

    /// Create a client around an existing reqwest `Client`
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, AppError> {
        let base = url::Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid catalog base URL {}: {}", base_url, e)))?;

        // `Url::join` would drop the last path segment of a base without a
        // trailing slash ("/api/v1" + "exercises" -> "/api/exercises").
        let exercises_url = format!("{}/exercises", base.as_str().trim_end_matches('/'));

        Ok(Self {
            http,
            exercises_url,
        })
    }

    /// Endpoint used for page requests
    pub fn exercises_url(&self) -> &str {
        &self.exercises_url
    }

    async fn get_page(&self, query: &[(&str, u64)]) -> Result<PageResponse, FetchError> {
        let response = self
            .http
            .get(&self.exercises_url)
            .query(query)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: response.url().to_string(),
            });
        }

        response.json::<PageResponse>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Decode(e.to_string())
            } else {
                FetchError::Transport(e)
            }
        })
    }
}

#[async_trait]
impl ExerciseSource for CatalogClient {
    async fn fetch_page(&self, offset: u64, limit: u32) -> Result<PageResponse, FetchError> {
        tracing::info!(offset, limit, "Fetching exercises");

        let started = Instant::now();
        let result = self
            .get_page(&[("offset", offset), ("limit", u64::from(limit))])
            .await;

        match &result {
            Ok(page) => {
                metrics::observe_catalog_request("success", started.elapsed());
                tracing::info!(offset, count = page.len(), "Successfully fetched exercises");
            }
            Err(error) => {
                metrics::observe_catalog_request(error.kind(), started.elapsed());
                tracing::error!(offset, limit, %error, "Error fetching exercises");
            }
        }

        result
    }

    async fn total_count(&self) -> Option<u64> {
        match self.get_page(&[("limit", 1)]).await {
            Ok(PageResponse {
                total: Some(total), ..
            }) => {
                tracing::info!(total, "Total exercises available");
                Some(total)
            }
            Ok(_) => {
                tracing::warn!("Catalog response carries no total");
                None
            }
            Err(error) => {
                tracing::error!(%error, "Error getting total exercises count");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::with_client(Client::new(), &format!("{}/api/v1", server.uri())).unwrap()
    }

    #[test]
    fn exercises_url_keeps_base_path() {
        let client =
            CatalogClient::with_client(Client::new(), "https://catalog.example.com/api/v1")
                .unwrap();
        assert_eq!(
            client.exercises_url(),
            "https://catalog.example.com/api/v1/exercises"
        );

        let client =
            CatalogClient::with_client(Client::new(), "https://catalog.example.com/api/v1/")
                .unwrap();
        assert_eq!(
            client.exercises_url(),
            "https://catalog.example.com/api/v1/exercises"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(CatalogClient::with_client(Client::new(), "::not a url").is_err());
    }

    #[tokio::test]
    async fn fetch_page_sends_offset_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/exercises"))
            .and(query_param("offset", "50"))
            .and(query_param("limit", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "0051"}, {"id": "0052"}],
                "total": 52
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).fetch_page(50, 25).await.unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page.total, Some(52));
    }

    #[tokio::test]
    async fn fetch_page_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/exercises"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = client_for(&server).fetch_page(0, 25).await.unwrap_err();

        assert!(matches!(
            error,
            FetchError::Status { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn fetch_page_maps_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/exercises"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let error = client_for(&server).fetch_page(0, 25).await.unwrap_err();

        assert_eq!(error.kind(), "decode");
    }

    #[tokio::test]
    async fn fetch_page_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/exercises"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [], "total": 0}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let http = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let client =
            CatalogClient::with_client(http, &format!("{}/api/v1", server.uri())).unwrap();

        let error = client.fetch_page(0, 25).await.unwrap_err();

        assert_eq!(error.kind(), "timeout");
    }

    #[tokio::test]
    async fn total_count_reads_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/exercises"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "0001"}],
                "total": 1324
            })))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).total_count().await, Some(1324));
    }

    #[tokio::test]
    async fn total_count_is_none_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert_eq!(client_for(&server).total_count().await, None);
    }
}
