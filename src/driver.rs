// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Experiment driver: runs a batch of candidates on the remote device.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::pulse::{Bounds, MeasurementOutcome, PulseCandidate, PulseShape};
use crate::service::{ExperimentService, RunRequest};
use crate::validation::{validate_batch, validate_outcomes};

/// Sends batches to an [`ExperimentService`] and checks what comes back.
///
/// One call to [`measure`](Self::measure) is exactly one remote request.
/// Transport retries happen inside the service client, never here.
pub struct ExperimentDriver {
    service: Arc<dyn ExperimentService>,
    shape: PulseShape,
    bounds: Bounds,
    shot_count: u32,
}

impl ExperimentDriver {
    pub fn new(service: Arc<dyn ExperimentService>, config: &ExperimentConfig) -> Self {
        Self {
            service,
            shape: config.shape(),
            bounds: config.amplitude_bounds,
            shot_count: config.shot_count,
        }
    }

    pub fn shape(&self) -> &PulseShape {
        &self.shape
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Run `candidates` and return one outcome per candidate, in input order.
    ///
    /// Candidates are checked for segment count and finite amplitudes only;
    /// optimizer proposals may sit marginally outside the configured bounds.
    #[instrument(skip_all, fields(service = self.service.name(), candidates = candidates.len()))]
    pub async fn measure(&self, candidates: &[PulseCandidate]) -> Result<Vec<MeasurementOutcome>> {
        validate_batch(candidates, &self.shape)?;

        let request = RunRequest {
            duration_ns: self.shape.duration_ns,
            segment_count: self.shape.segment_count,
            shot_count: self.shot_count,
            candidates,
        };

        let outcomes = self.service.run_candidates(&request).await?;
        validate_outcomes(&outcomes, candidates.len(), self.shot_count as usize)?;

        debug!(shots = self.shot_count, "Batch measured");
        Ok(outcomes)
    }
}
