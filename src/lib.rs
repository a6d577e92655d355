// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS closed-loop gate calibration.
//!
//! This crate tunes piecewise-constant control pulses for single-qubit gates
//! by looping measurements on a remote quantum-control service through its
//! Gaussian-process optimizer.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │             CalibrationLoop                 │
//! ├───────────────────┬────────────────────────┤
//! │ ExperimentDriver  │   Cost evaluator       │
//! │ (run candidates)  │   (X / H infidelity)   │
//! ├───────────────────┴────────────────────────┤
//! │   ExperimentService + OptimizerService      │
//! │          (ReqwestServiceClient)             │
//! └────────────────────────────────────────────┘
//!                       │
//!                 Result exporter
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`pulse`]: Pulse, outcome and optimizer data types
//! - [`service`]: Remote service traits and HTTP client
//! - [`driver`]: Batch execution with response checks
//! - [`cost`]: Infidelity from shot outcomes
//! - [`calibration`]: The closed loop
//! - [`export`]: Calibrated pulse artifact
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod calibration;
pub mod config;
pub mod cost;
pub mod driver;
pub mod error;
pub mod export;
pub mod pulse;
pub mod service;
pub mod validation;

pub use calibration::{CalibrationLoop, CalibrationOutcome, StopReason};
pub use config::Config;
pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
