// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Remote service trait definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::pulse::{
    CostRecord, MeasurementOutcome, OptimizerInput, OptimizerState, PulseCandidate,
};

/// Health status of the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Service is fully operational
    Healthy,
    /// Service responded but reported a problem
    Degraded,
    /// Service is not reachable
    Unavailable,
}

/// Request to execute a batch of candidates.
#[derive(Debug, Serialize)]
pub struct RunRequest<'a> {
    /// Pulse duration in nanoseconds
    pub duration_ns: f64,
    /// Segments per candidate
    pub segment_count: usize,
    /// Shots per candidate
    pub shot_count: u32,
    /// Candidates, in the order outcomes must come back
    pub candidates: &'a [PulseCandidate],
}

/// One optimizer step: cost feedback plus where to resume from.
#[derive(Debug, Serialize)]
pub struct OptimizerRequest {
    pub optimizer: OptimizerInput,
    pub results: Vec<CostRecord>,
    /// Number of candidates the optimizer should propose
    pub test_point_count: usize,
}

/// Next batch to try and the optimizer's updated model.
#[derive(Debug, Deserialize)]
pub struct OptimizerResponse {
    pub test_points: Vec<PulseCandidate>,
    pub state: OptimizerState,
}

/// Runs pulse candidates on the device and returns raw shot outcomes.
#[async_trait]
pub trait ExperimentService: Send + Sync {
    /// Service name used in logs.
    fn name(&self) -> &str;

    /// Execute the candidates and return one outcome per candidate.
    async fn run_candidates(
        &self,
        request: &RunRequest<'_>,
    ) -> Result<Vec<MeasurementOutcome>, ServiceError>;

    /// Check service health.
    async fn health_check(&self) -> Result<HealthStatus, ServiceError>;
}

/// Remote Gaussian-process optimizer.
#[async_trait]
pub trait OptimizerService: Send + Sync {
    /// Feed back costs and receive the next batch. Consumes the request so the
    /// optimizer state inside it is moved, never shared.
    async fn step(&self, request: OptimizerRequest) -> Result<OptimizerResponse, ServiceError>;

    /// Check optimizer health.
    async fn health_check(&self) -> Result<HealthStatus, ServiceError>;
}
