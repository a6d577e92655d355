// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Calibrated pulse artifact.
//!
//! The file is plain JSON. `duration_ns` and `values` are always present;
//! the remaining keys describe the run that produced the pulse.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::calibration::CalibrationOutcome;
use crate::error::Result;
use crate::pulse::{Gate, PulseShape};

/// A calibrated piecewise-constant pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedPulse {
    pub duration_ns: f64,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl CalibratedPulse {
    /// Build the artifact for the winning candidate of a run.
    pub fn from_outcome(outcome: &CalibrationOutcome, gate: Gate, shape: &PulseShape) -> Self {
        Self {
            duration_ns: shape.duration_ns,
            values: outcome.best_candidate.values().to_vec(),
            gate: Some(gate),
            cost: Some(outcome.best_cost),
            converged: Some(outcome.converged()),
            run_id: Some(outcome.run_id),
            created_at: Some(Utc::now()),
        }
    }
}

/// Write `pulse` to `path` as pretty JSON, creating parent directories.
pub fn save_pulse(path: &Path, pulse: &CalibratedPulse) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(pulse)?;
    fs::write(path, json)?;
    info!(path = %path.display(), segments = pulse.values.len(), "Calibrated pulse written");
    Ok(())
}

/// Read a pulse previously written by [`save_pulse`].
pub fn load_pulse(path: &Path) -> Result<CalibratedPulse> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
