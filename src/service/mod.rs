// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Remote quantum-control service.
//!
//! This module provides the [`ExperimentService`] and [`OptimizerService`]
//! traits the calibration loop talks to, and [`client::ReqwestServiceClient`],
//! the HTTP implementation of both.

pub mod client;
pub mod r#trait;

pub use client::ReqwestServiceClient;
pub use r#trait::{
    ExperimentService, HealthStatus, OptimizerRequest, OptimizerResponse, OptimizerService,
    RunRequest,
};
