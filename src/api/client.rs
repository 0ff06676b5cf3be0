//! Deployments API client implementation.
//!
//! This module provides the [`DeploymentApi`] seam used by the tracker and
//! its HTTP implementation against the control-plane REST API.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ApiError, Result, TrackerError};

use super::query::SearchRequest;
use super::types::{DeploymentRef, DeploymentSnapshot, GetDeploymentParams, SearchResponse};

/// Default control-plane base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.elastic-cloud.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts for transient failures.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay between attempts in milliseconds.
const RETRY_DELAY_MS: u64 = 500;

/// Operations the tracker consumes from the control plane.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Fetches a deployment snapshot.
    async fn get_deployment(
        &self,
        deployment_id: &str,
        params: GetDeploymentParams,
    ) -> Result<DeploymentSnapshot>;

    /// Searches deployments.
    async fn search_deployments(&self, request: &SearchRequest) -> Result<Vec<DeploymentRef>>;
}

/// HTTP client for the deployments API.
#[derive(Debug, Clone)]
pub struct DeploymentClient {
    /// HTTP client.
    client: Client,
    /// Base URL, without a trailing slash.
    endpoint: String,
    /// API key.
    api_key: String,
    /// Attempts for retryable failures.
    max_attempts: u32,
}

impl DeploymentClient {
    /// Creates a new client against the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(endpoint, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Sets the number of attempts for retryable failures.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Executes a request, retrying transient failures.
    async fn execute<T, F>(&self, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut last_error = None;
        let mut delay = Duration::ZERO;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {} in {delay:?}", self.max_attempts);
                tokio::time::sleep(delay).await;
            }

            match self.execute_once::<T>(build()).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() => {
                    delay = Self::retry_delay(&e, attempt + 1);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TrackerError::Api(ApiError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    /// Delay before the next attempt: the server's `retry-after` when rate
    /// limited, linear back-off otherwise.
    fn retry_delay(error: &TrackerError, attempt: u32) -> Duration {
        match error {
            TrackerError::Api(ApiError::RateLimited { .. }) => {
                Duration::from_secs(error.retry_delay_secs().unwrap_or_default())
            }
            _ => Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)),
        }
    }

    /// Executes a single request.
    async fn execute_once<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .header(header::AUTHORIZATION, format!("ApiKey {}", self.api_key))
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                TrackerError::Api(ApiError::NetworkError {
                    message: format!("Request failed: {e}"),
                })
            })?;

        let response = Self::check_status(response).await?;

        response.json::<T>().await.map_err(|e| {
            TrackerError::Api(ApiError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }

    /// Maps non-success statuses to API errors.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(TrackerError::Api(ApiError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TrackerError::Api(ApiError::AuthenticationFailed {
                message: String::from("Invalid API key"),
            }));
        }

        if status.as_u16() == 404 {
            let path = response.url().path().to_string();
            let deployment_id = path.rsplit('/').next().unwrap_or_default().to_string();
            return Err(TrackerError::Api(ApiError::DeploymentNotFound { deployment_id }));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Api(ApiError::api_error(status.as_u16(), body)));
        }

        Ok(response)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/v1/{path}", self.endpoint);
        trace!("{method} {url}");
        self.client.request(method, url)
    }
}

#[async_trait]
impl DeploymentApi for DeploymentClient {
    async fn get_deployment(
        &self,
        deployment_id: &str,
        params: GetDeploymentParams,
    ) -> Result<DeploymentSnapshot> {
        let path = format!("deployments/{deployment_id}");
        let query = [
            ("show_plans", params.show_plans),
            ("show_plan_logs", params.show_plan_logs),
            ("show_plan_history", params.show_plan_history),
        ];

        self.execute(|| self.request(Method::GET, &path).query(&query))
            .await
    }

    async fn search_deployments(&self, request: &SearchRequest) -> Result<Vec<DeploymentRef>> {
        let response: SearchResponse = self
            .execute(|| self.request(Method::POST, "deployments/_search").json(request))
            .await?;

        debug!("Search matched {} deployments", response.deployments.len());
        Ok(response.deployments)
    }
}
