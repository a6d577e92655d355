// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Infidelity costs computed from shot outcomes.
//!
//! Starting from |0>, a perfect X gate leaves every shot in 1, and a perfect
//! Hadamard-like gate splits shots evenly between 0 and 1. Shots that leak to
//! level 2 count against both.

use crate::error::{Result, ValidationError};
use crate::pulse::{Gate, MeasurementOutcome};

/// Fraction of shots in `level`.
pub fn population(outcome: &MeasurementOutcome, level: u8) -> Result<f64> {
    let total = outcome.shot_count();
    if total == 0 {
        return Err(ValidationError::Field {
            field: "shots".into(),
            message: "cannot compute a population from zero shots".into(),
        }
        .into());
    }
    Ok(outcome.count(level) as f64 / total as f64)
}

/// X-gate infidelity: `1 - P(1)`.
pub fn x_gate_infidelity(outcome: &MeasurementOutcome) -> Result<f64> {
    Ok(1.0 - population(outcome, 1)?)
}

/// H-gate infidelity: `|P(0) - P(1)|`.
pub fn h_gate_infidelity(outcome: &MeasurementOutcome) -> Result<f64> {
    Ok((population(outcome, 0)? - population(outcome, 1)?).abs())
}

/// Infidelity of a single outcome for `gate`.
pub fn infidelity(gate: Gate, outcome: &MeasurementOutcome) -> Result<f64> {
    match gate {
        Gate::X => x_gate_infidelity(outcome),
        Gate::H => h_gate_infidelity(outcome),
    }
}

/// Costs for a batch, in the same order as `outcomes`.
pub fn evaluate_batch(gate: Gate, outcomes: &[MeasurementOutcome]) -> Result<Vec<f64>> {
    outcomes.iter().map(|o| infidelity(gate, o)).collect()
}
