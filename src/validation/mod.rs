// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input and response-shape validation.

use crate::error::{Result, ValidationError};
use crate::pulse::{Bounds, MeasurementOutcome, PulseCandidate, PulseShape, MAX_SHOT_LEVEL};

/// Validate a candidate against the run's pulse shape.
///
/// Checks segment count and finiteness only. Amplitude bounds are the
/// remote optimizer's business once the loop is running.
pub fn validate_candidate(
    index: usize,
    candidate: &PulseCandidate,
    shape: &PulseShape,
) -> Result<()> {
    if candidate.len() != shape.segment_count {
        return Err(ValidationError::ShapeMismatch {
            what: format!("candidate {} segments", index),
            expected: shape.segment_count,
            actual: candidate.len(),
        }
        .into());
    }

    if let Some(i) = candidate.values().iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::Field {
            field: format!("candidate[{}]", index),
            message: format!("non-finite amplitude at segment {}", i),
        }
        .into());
    }

    Ok(())
}

/// Validate a batch of candidates before it is sent for execution.
pub fn validate_batch(candidates: &[PulseCandidate], shape: &PulseShape) -> Result<()> {
    if candidates.is_empty() {
        return Err(ValidationError::Field {
            field: "candidates".into(),
            message: "batch cannot be empty".into(),
        }
        .into());
    }

    for (i, candidate) in candidates.iter().enumerate() {
        validate_candidate(i, candidate, shape)?;
    }

    Ok(())
}

/// Check that every amplitude of a caller-supplied starting batch lies
/// within `bounds`.
pub fn validate_within_bounds(candidates: &[PulseCandidate], bounds: &Bounds) -> Result<()> {
    for (index, candidate) in candidates.iter().enumerate() {
        if let Some((i, val)) = candidate
            .values()
            .iter()
            .enumerate()
            .find(|(_, v)| !bounds.contains(**v))
        {
            return Err(ValidationError::Field {
                field: format!("candidate[{}]", index),
                message: format!(
                    "amplitude {} at segment {} outside [{}, {}]",
                    val, i, bounds.lower, bounds.upper
                ),
            }
            .into());
        }
    }
    Ok(())
}

/// Check that the execution service answered with the shape that was asked for.
pub fn validate_outcomes(
    outcomes: &[MeasurementOutcome],
    expected_count: usize,
    shot_count: usize,
) -> Result<()> {
    if outcomes.len() != expected_count {
        return Err(ValidationError::ShapeMismatch {
            what: "measurement outcomes".into(),
            expected: expected_count,
            actual: outcomes.len(),
        }
        .into());
    }

    for (i, outcome) in outcomes.iter().enumerate() {
        if outcome.shot_count() != shot_count {
            return Err(ValidationError::ShapeMismatch {
                what: format!("outcome {} shots", i),
                expected: shot_count,
                actual: outcome.shot_count(),
            }
            .into());
        }
        if let Some(pos) = outcome.shots().iter().position(|&s| s > MAX_SHOT_LEVEL) {
            return Err(ValidationError::Field {
                field: format!("outcome[{}]", i),
                message: format!(
                    "shot {} reported level {} (max {})",
                    pos,
                    outcome.shots()[pos],
                    MAX_SHOT_LEVEL
                ),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn shape() -> PulseShape {
        PulseShape {
            duration_ns: 100.0,
            segment_count: 4,
        }
    }

    #[test]
    fn test_validate_candidate() {
        assert!(validate_candidate(0, &PulseCandidate::new(vec![0.0; 4]), &shape()).is_ok());

        // Wrong segment count
        let err =
            validate_candidate(0, &PulseCandidate::new(vec![0.0; 3]), &shape()).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::ShapeMismatch { expected: 4, actual: 3, .. })
        ));

        // NaN
        let c = PulseCandidate::new(vec![0.0, f64::NAN, 0.0, 0.0]);
        assert!(validate_candidate(0, &c, &shape()).is_err());

        // Amplitudes past the configured bounds are not a shape problem
        let c = PulseCandidate::new(vec![0.0, 1.5, 0.0, 0.0]);
        assert!(validate_candidate(0, &c, &shape()).is_ok());
    }

    #[test]
    fn test_validate_batch_empty() {
        assert!(validate_batch(&[], &shape()).is_err());
    }

    #[test]
    fn test_validate_within_bounds() {
        let bounds = Bounds::default();
        let ok = vec![PulseCandidate::new(vec![-1.0, 1.0, 0.0, 0.5])];
        assert!(validate_within_bounds(&ok, &bounds).is_ok());

        let bad = vec![
            PulseCandidate::new(vec![0.0; 4]),
            PulseCandidate::new(vec![0.0, 1.5, 0.0, 0.0]),
        ];
        let msg = validate_within_bounds(&bad, &bounds).unwrap_err().to_string();
        assert!(msg.contains("candidate[1]"));
        assert!(msg.contains("segment 1"));
    }

    #[test]
    fn test_validate_outcomes() {
        let good = vec![MeasurementOutcome::new(vec![0, 1, 2]); 2];
        assert!(validate_outcomes(&good, 2, 3).is_ok());

        // Wrong number of outcomes
        assert!(validate_outcomes(&good, 3, 3).is_err());

        // Wrong shot count
        assert!(validate_outcomes(&good, 2, 4).is_err());

        // Level out of range
        let bad = vec![MeasurementOutcome::new(vec![0, 3, 1])];
        let msg = validate_outcomes(&bad, 1, 3).unwrap_err().to_string();
        assert!(msg.contains("level 3"));
    }
}
