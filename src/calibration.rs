// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Closed-loop calibration driver.
//!
//! Each iteration feeds the current batch's costs to the remote optimizer,
//! measures the batch it proposes, and keeps the best candidate seen so far.
//! The loop stops once the best cost is within `3 × measurement_std` of zero,
//! or when an iteration or wall-clock bound is hit.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ExperimentConfig, TerminationConfig};
use crate::cost;
use crate::driver::ExperimentDriver;
use crate::error::{Result, ServiceError, ValidationError};
use crate::pulse::{
    Bounds, CostRecord, GaussianProcessInitializer, Gate, OptimizerInput, PulseCandidate,
    PulseShape,
};
use crate::service::{OptimizerRequest, OptimizerService};
use crate::validation::validate_within_bounds;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Best cost reached the convergence threshold
    Converged,
    /// `max_iterations` optimizer calls were made
    IterationLimit,
    /// `max_duration_sec` elapsed
    TimeLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Converged => write!(f, "converged"),
            StopReason::IterationLimit => write!(f, "iteration limit"),
            StopReason::TimeLimit => write!(f, "time limit"),
        }
    }
}

/// Result of a calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    /// Identifier of this run
    pub run_id: Uuid,
    /// Lowest-cost candidate seen
    pub best_candidate: PulseCandidate,
    /// Its cost
    pub best_cost: f64,
    /// Number of remote optimizer calls made
    pub optimizer_calls: u32,
    /// Best cost after the initial batch and after every optimizer call
    pub history: Vec<f64>,
    pub stop_reason: StopReason,
}

impl CalibrationOutcome {
    pub fn converged(&self) -> bool {
        self.stop_reason == StopReason::Converged
    }
}

/// Cost at or below which a candidate is indistinguishable from a perfect gate.
pub fn convergence_threshold(measurement_std: f64) -> f64 {
    3.0 * measurement_std
}

/// Minimum-cost entry, preferring the first on ties. NaN costs never win.
pub fn select_best<T>(entries: &[(f64, T)]) -> Option<&(f64, T)> {
    let mut best: Option<&(f64, T)> = None;
    for entry in entries {
        if entry.0.is_nan() {
            continue;
        }
        if best.map_or(true, |b| entry.0 < b.0) {
            best = Some(entry);
        }
    }
    best
}

/// Uniformly sampled starting batch. Reproducible when `seed` is set.
///
/// Fails when `bounds` is not a finite interval with `lower < upper`.
pub fn initial_batch(
    shape: &PulseShape,
    bounds: &Bounds,
    batch_size: usize,
    seed: Option<u64>,
) -> Result<Vec<PulseCandidate>> {
    if !bounds.is_valid() {
        return Err(ValidationError::Field {
            field: "amplitude_bounds".into(),
            message: format!("[{}, {}] is not a valid interval", bounds.lower, bounds.upper),
        }
        .into());
    }

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    Ok((0..batch_size)
        .map(|_| {
            PulseCandidate::new(
                (0..shape.segment_count)
                    .map(|_| rng.gen_range(bounds.lower..=bounds.upper))
                    .collect(),
            )
        })
        .collect())
}

/// The closed calibration loop.
pub struct CalibrationLoop {
    driver: ExperimentDriver,
    optimizer: Arc<dyn OptimizerService>,
    gate: Gate,
    measurement_std: f64,
    seed: Option<u64>,
    termination: TerminationConfig,
}

impl CalibrationLoop {
    pub fn new(
        driver: ExperimentDriver,
        optimizer: Arc<dyn OptimizerService>,
        experiment: &ExperimentConfig,
        termination: &TerminationConfig,
    ) -> Self {
        Self {
            driver,
            optimizer,
            gate: experiment.gate,
            measurement_std: experiment.measurement_std,
            seed: experiment.seed,
            termination: termination.clone(),
        }
    }

    pub fn threshold(&self) -> f64 {
        convergence_threshold(self.measurement_std)
    }

    fn initializer(&self) -> GaussianProcessInitializer {
        GaussianProcessInitializer {
            bounds: vec![*self.driver.bounds(); self.driver.shape().segment_count],
            rng_seed: self.seed,
        }
    }

    async fn evaluate(&self, batch: &[PulseCandidate]) -> Result<Vec<f64>> {
        let outcomes = self.driver.measure(batch).await?;
        cost::evaluate_batch(self.gate, &outcomes)
    }

    /// Run the loop starting from `initial`.
    ///
    /// `initial` must lie within the configured amplitude bounds; batches
    /// proposed by the optimizer are measured as returned. The optimizer is seeded with a Gaussian-process initializer on its first
    /// call; every later call receives the state returned by the one before.
    pub async fn run(&self, initial: Vec<PulseCandidate>) -> Result<CalibrationOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("calibration", %run_id, gate = %self.gate);
        self.run_inner(run_id, initial).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        initial: Vec<PulseCandidate>,
    ) -> Result<CalibrationOutcome> {
        let started = Instant::now();
        let budget = self.termination.max_duration_sec.map(Duration::from_secs);
        let max_iterations = self.termination.max_iterations;
        let threshold = self.threshold();
        let batch_size = initial.len();

        info!(
            batch_size,
            threshold,
            max_iterations,
            "Starting calibration"
        );

        validate_within_bounds(&initial, self.driver.bounds())?;

        let mut batch = initial;
        let mut costs = self.evaluate(&batch).await?;
        let (mut best_cost, mut best_candidate) = best_of(&costs, &batch)?;
        let mut history = vec![best_cost];
        let mut input = OptimizerInput::Initializer(self.initializer());
        let mut calls: u32 = 0;

        info!(best_cost, "Initial batch measured");

        let stop_reason = loop {
            if best_cost <= threshold {
                break StopReason::Converged;
            }
            if max_iterations != 0 && calls >= max_iterations {
                break StopReason::IterationLimit;
            }
            if budget.is_some_and(|b| started.elapsed() >= b) {
                break StopReason::TimeLimit;
            }

            let results = batch
                .into_iter()
                .zip(costs)
                .map(|(parameters, cost)| CostRecord {
                    parameters,
                    cost,
                    cost_uncertainty: self.measurement_std,
                })
                .collect();

            let response = self
                .optimizer
                .step(OptimizerRequest {
                    optimizer: input,
                    results,
                    test_point_count: batch_size,
                })
                .await?;
            calls += 1;

            if response.test_points.is_empty() {
                return Err(ServiceError::MalformedResponse(
                    "optimizer returned no test points".into(),
                )
                .into());
            }

            input = OptimizerInput::State(response.state);
            batch = response.test_points;
            costs = self.evaluate(&batch).await?;

            let (cost, candidate) = best_of(&costs, &batch)?;
            if cost < best_cost {
                best_cost = cost;
                best_candidate = candidate;
            }
            history.push(best_cost);

            info!(iteration = calls, batch_best = cost, best_cost, "Iteration complete");
        };

        match stop_reason {
            StopReason::Converged => info!(
                iterations = calls,
                best_cost,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Calibration converged"
            ),
            reason => warn!(
                iterations = calls,
                best_cost,
                threshold,
                reason = %reason,
                "Calibration stopped before converging"
            ),
        }

        Ok(CalibrationOutcome {
            run_id,
            best_candidate,
            best_cost,
            optimizer_calls: calls,
            history,
            stop_reason,
        })
    }
}

fn best_of(costs: &[f64], batch: &[PulseCandidate]) -> Result<(f64, PulseCandidate)> {
    let entries: Vec<(f64, &PulseCandidate)> = costs.iter().copied().zip(batch).collect();
    match select_best(&entries) {
        Some(&(cost, candidate)) => {
            debug!(cost, "Batch best selected");
            Ok((cost, candidate.clone()))
        }
        None => Err(ValidationError::Field {
            field: "costs".into(),
            message: "batch produced no comparable cost".into(),
        }
        .into()),
    }
}
