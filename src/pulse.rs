// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pulse, measurement and optimizer data types.
//!
//! Every candidate in a calibration run shares one [`PulseShape`]: a fixed
//! duration split into a fixed number of piecewise-constant segments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest discrete level a shot can report (qutrit readout: 0, 1 or 2).
pub const MAX_SHOT_LEVEL: u8 = 2;

/// Target gate being calibrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    /// Bit flip, |0> -> |1>
    X,
    /// Hadamard-like gate, |0> -> equal superposition
    H,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::X => write!(f, "x"),
            Gate::H => write!(f, "h"),
        }
    }
}

impl FromStr for Gate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x" => Ok(Gate::X),
            "h" | "hadamard" => Ok(Gate::H),
            other => Err(format!("unknown gate '{other}' (expected 'x' or 'h')")),
        }
    }
}

/// Experiment-wide pulse geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseShape {
    /// Total pulse duration in nanoseconds.
    pub duration_ns: f64,
    /// Number of piecewise-constant segments.
    pub segment_count: usize,
}

/// Closed amplitude interval applied to every segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Finite endpoints with `lower < upper`.
    pub fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lower: -1.0,
            upper: 1.0,
        }
    }
}

/// One candidate pulse: an ordered list of segment amplitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PulseCandidate {
    values: Vec<f64>,
}

impl PulseCandidate {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Shot outcomes for one candidate, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementOutcome {
    shots: Vec<u8>,
}

impl MeasurementOutcome {
    pub fn new(shots: Vec<u8>) -> Self {
        Self { shots }
    }

    pub fn shots(&self) -> &[u8] {
        &self.shots
    }

    pub fn shot_count(&self) -> usize {
        self.shots.len()
    }

    /// Number of shots that landed in `level`.
    pub fn count(&self, level: u8) -> usize {
        self.shots.iter().filter(|&&s| s == level).count()
    }
}

/// Cost feedback for one candidate, as sent to the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub parameters: PulseCandidate,
    pub cost: f64,
    pub cost_uncertainty: f64,
}

/// Opaque optimizer model returned by the remote service.
///
/// Not `Clone`: each state is moved into exactly one optimizer call and
/// replaced by the state that call returns.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptimizerState(pub(crate) serde_json::Value);

/// Gaussian-process optimizer seed used on the first optimizer call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianProcessInitializer {
    /// Per-segment search bounds.
    pub bounds: Vec<Bounds>,
    /// Seed for the remote optimizer's RNG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

/// What the optimizer is resumed from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerInput {
    Initializer(GaussianProcessInitializer),
    State(OptimizerState),
}
