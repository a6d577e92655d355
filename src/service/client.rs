// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the remote quantum-control service.
//!
//! [`ReqwestServiceClient`] implements both [`ExperimentService`] and
//! [`OptimizerService`] over a JSON REST API, with exponential backoff retry
//! and bearer token authentication.
//!
//! # Endpoints
//!
//! - `POST {base}/experiments/run` - Execute a batch of candidates
//! - `POST {base}/optimizers/step` - One closed-loop optimizer step
//! - `GET {base}/health` - Experiment service health
//! - `GET {base}/optimizers/health` - Optimizer service health

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::pulse::MeasurementOutcome;

use super::r#trait::{
    ExperimentService, HealthStatus, OptimizerRequest, OptimizerResponse, OptimizerService,
    RunRequest,
};

/// Upper bound on a single backoff delay.
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Run response from the API (for deserialization).
#[derive(Debug, Deserialize)]
struct RunResponse {
    outcomes: Vec<MeasurementOutcome>,
}

/// Production HTTP client using reqwest with retry logic.
pub struct ReqwestServiceClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: SecretString,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl std::fmt::Debug for ReqwestServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestServiceClient")
            .field("base_url", &self.base_url)
            .field("auth_token", &"[REDACTED]")
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl ReqwestServiceClient {
    /// Create a new client from service configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            ServiceError::InvalidRequest(
                "Service URL not configured. Set QUBITOS_CAL_SERVICE_URL or \
                 config.service.base_url"
                    .to_string(),
            )
        })?;

        let auth_token = config.auth_token.clone().ok_or_else(|| {
            ServiceError::AuthenticationFailed(
                "Service auth token not configured. Set QUBITOS_CAL_AUTH_TOKEN or \
                 config.service.auth_token"
                    .to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .map_err(|e| ServiceError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: SecretString::from(auth_token),
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    /// Execute an HTTP request with exponential backoff retry.
    ///
    /// Retries on: 429 (rate limit), 502/503/504, connect/timeout errors.
    /// Does not retry: other 4xx or 5xx.
    async fn request_with_retry<F, Fut, T>(
        &self,
        operation: &str,
        make_request: F,
    ) -> Result<T, ServiceError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: serde::de::DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match make_request().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json::<T>().await.map_err(|e| {
                            ServiceError::MalformedResponse(format!(
                                "Failed to parse {operation} response: {e}"
                            ))
                        });
                    }

                    let body = response.text().await.unwrap_or_default();
                    let err = status_error(operation, status, &body);

                    if !is_retryable(status) {
                        return Err(err);
                    }

                    last_error = Some(err);
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ServiceError::Timeout(format!(
                            "{operation} timed out: {e}"
                        )));
                    } else if e.is_connect() {
                        last_error = Some(ServiceError::Unavailable(format!(
                            "{operation} could not connect: {e}"
                        )));
                    } else {
                        return Err(ServiceError::Http(format!(
                            "{operation} request error: {e}"
                        )));
                    }
                }
            }

            if attempt < self.max_retries {
                let delay = retry_delay_ms(self.retry_base_delay_ms, attempt);
                warn!(
                    attempt = attempt + 1,
                    max = self.max_retries,
                    delay_ms = delay,
                    "{operation} failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ServiceError::Http(format!(
                "{operation} failed after {} retries",
                self.max_retries
            ))
        }))
    }

    /// Unauthenticated GET; any answer other than 2xx is `Degraded`.
    async fn check_health_at(&self, url: &str) -> HealthStatus {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => HealthStatus::Healthy,
            Ok(response) => {
                warn!(url, status = %response.status(), "Health check returned non-success");
                HealthStatus::Degraded
            }
            Err(e) => {
                error!(url, error = %e, "Health check failed");
                HealthStatus::Unavailable
            }
        }
    }
}

/// Map a non-success status to the error callers see.
fn status_error(operation: &str, status: StatusCode, body: &str) -> ServiceError {
    let msg = format!("{operation} failed ({status}): {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::AuthenticationFailed(msg),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::InvalidRequest(msg)
        }
        StatusCode::SERVICE_UNAVAILABLE => ServiceError::Unavailable(msg),
        StatusCode::GATEWAY_TIMEOUT => ServiceError::Timeout(msg),
        s if s.is_server_error() => ServiceError::ExecutionFailed(msg),
        _ => ServiceError::Http(msg),
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Backoff: `min(base * 2^attempt, 30s)` plus up to 25% random jitter.
fn retry_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let base = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    let capped = base.min(MAX_RETRY_DELAY_MS);
    capped + rand::thread_rng().gen_range(0..=capped / 4)
}

#[async_trait]
impl ExperimentService for ReqwestServiceClient {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn run_candidates(
        &self,
        request: &RunRequest<'_>,
    ) -> Result<Vec<MeasurementOutcome>, ServiceError> {
        let url = format!("{}/experiments/run", self.base_url);
        let token = self.auth_token.expose_secret();

        let response: RunResponse = self
            .request_with_retry("run_candidates", || {
                self.client.post(&url).bearer_auth(token).json(request).send()
            })
            .await?;

        debug!(
            candidates = request.candidates.len(),
            outcomes = response.outcomes.len(),
            "Received measurement outcomes"
        );
        Ok(response.outcomes)
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Ok(self.check_health_at(&format!("{}/health", self.base_url)).await)
    }
}

#[async_trait]
impl OptimizerService for ReqwestServiceClient {
    async fn step(&self, request: OptimizerRequest) -> Result<OptimizerResponse, ServiceError> {
        let url = format!("{}/optimizers/step", self.base_url);
        let token = self.auth_token.expose_secret();

        let response: OptimizerResponse = self
            .request_with_retry("optimizer_step", || {
                self.client.post(&url).bearer_auth(token).json(&request).send()
            })
            .await?;

        debug!(
            results = request.results.len(),
            test_points = response.test_points.len(),
            "Optimizer step complete"
        );
        Ok(response)
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Ok(self
            .check_health_at(&format!("{}/optimizers/health", self.base_url))
            .await)
    }
}
