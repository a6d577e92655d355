// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities for calibration tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ServiceError;
use crate::pulse::{CostRecord, MeasurementOutcome, OptimizerInput, OptimizerState, PulseCandidate};
use crate::service::{
    ExperimentService, HealthStatus, OptimizerRequest, OptimizerResponse, OptimizerService,
    RunRequest,
};

/// Mock device where the first segment of a candidate is the fraction of
/// shots that land in |1>; the rest land in |0>.
#[derive(Default)]
pub struct PopulationExperimentService {
    runs: Mutex<usize>,
}

impl PopulationExperimentService {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(0),
        }
    }

    pub fn run_count(&self) -> usize {
        *self.runs.lock()
    }
}

#[async_trait]
impl ExperimentService for PopulationExperimentService {
    fn name(&self) -> &str {
        "population-mock"
    }

    async fn run_candidates(
        &self,
        request: &RunRequest<'_>,
    ) -> Result<Vec<MeasurementOutcome>, ServiceError> {
        *self.runs.lock() += 1;
        let shots = request.shot_count as usize;
        Ok(request
            .candidates
            .iter()
            .map(|c| {
                let p = c.values().first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
                let ones = (p * shots as f64).round() as usize;
                let mut outcome = vec![1u8; ones];
                outcome.resize(shots, 0);
                MeasurementOutcome::new(outcome)
            })
            .collect())
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Ok(HealthStatus::Healthy)
    }
}

/// Mock device that returns the same outcomes regardless of the request.
pub struct FixedOutcomeService {
    outcomes: Vec<MeasurementOutcome>,
}

impl FixedOutcomeService {
    pub fn new(outcomes: Vec<MeasurementOutcome>) -> Self {
        Self { outcomes }
    }
}

#[async_trait]
impl ExperimentService for FixedOutcomeService {
    fn name(&self) -> &str {
        "fixed-mock"
    }

    async fn run_candidates(
        &self,
        _request: &RunRequest<'_>,
    ) -> Result<Vec<MeasurementOutcome>, ServiceError> {
        Ok(self.outcomes.clone())
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Ok(HealthStatus::Degraded)
    }
}

/// Mock device that always fails.
pub struct FailingExperimentService;

#[async_trait]
impl ExperimentService for FailingExperimentService {
    fn name(&self) -> &str {
        "failing-mock"
    }

    async fn run_candidates(
        &self,
        _request: &RunRequest<'_>,
    ) -> Result<Vec<MeasurementOutcome>, ServiceError> {
        Err(ServiceError::ExecutionFailed(
            "mock execution failure".to_string(),
        ))
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Err(ServiceError::Unavailable("mock service unavailable".to_string()))
    }
}

/// What a [`ScriptedOptimizerService`] was called with.
#[derive(Debug, Clone)]
pub struct RecordedStep {
    /// `None` when the call carried the initializer.
    pub state: Option<serde_json::Value>,
    pub results: Vec<CostRecord>,
}

/// Mock optimizer that proposes, on call `i`, a batch whose first segment is
/// `script[i]` and whose other segments are `0.1`.
pub struct ScriptedOptimizerService {
    script: Vec<f64>,
    segment_count: usize,
    empty_batches: bool,
    steps: Mutex<Vec<RecordedStep>>,
}

impl ScriptedOptimizerService {
    pub fn new(script: Vec<f64>, segment_count: usize) -> Self {
        Self {
            script,
            segment_count,
            empty_batches: false,
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with an empty batch.
    pub fn with_empty_batches(mut self) -> Self {
        self.empty_batches = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn steps(&self) -> Vec<RecordedStep> {
        self.steps.lock().clone()
    }
}

#[async_trait]
impl OptimizerService for ScriptedOptimizerService {
    async fn step(&self, request: OptimizerRequest) -> Result<OptimizerResponse, ServiceError> {
        let state = match request.optimizer {
            OptimizerInput::Initializer(_) => None,
            OptimizerInput::State(s) => Some(s.0),
        };

        let mut steps = self.steps.lock();
        let index = steps.len();
        steps.push(RecordedStep {
            state,
            results: request.results,
        });

        let population = *self.script.get(index).ok_or_else(|| {
            ServiceError::ExecutionFailed(format!("script exhausted at call {}", index))
        })?;

        let test_points = if self.empty_batches {
            Vec::new()
        } else {
            let mut values = vec![0.1; self.segment_count];
            values[0] = population;
            vec![PulseCandidate::new(values); request.test_point_count]
        };

        Ok(OptimizerResponse {
            test_points,
            state: OptimizerState(serde_json::json!({ "step": index + 1 })),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Ok(HealthStatus::Healthy)
    }
}

/// Mock optimizer that always fails.
pub struct FailingOptimizerService;

#[async_trait]
impl OptimizerService for FailingOptimizerService {
    async fn step(&self, _request: OptimizerRequest) -> Result<OptimizerResponse, ServiceError> {
        Err(ServiceError::Unavailable(
            "mock optimizer unavailable".to_string(),
        ))
    }

    async fn health_check(&self) -> Result<HealthStatus, ServiceError> {
        Err(ServiceError::Unavailable(
            "mock optimizer unavailable".to_string(),
        ))
    }
}
