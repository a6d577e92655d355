// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for calibration runs.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. calibration.yaml file
//! 3. Environment variables (QUBITOS_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pulse::{Bounds, Gate, PulseShape};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service connection
    #[serde(default)]
    pub service: ServiceConfig,

    /// Experiment parameters
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Loop termination bounds
    #[serde(default)]
    pub termination: TerminationConfig,

    /// Output artifact settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &["calibration.yaml", "calibration.yml", "/etc/qubitos/calibration.yaml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `QUBITOS_*` overrides read through `lookup`. Values that fail to
    /// parse are ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("QUBITOS_CAL_SERVICE_URL") {
            self.service.base_url = Some(val);
        }
        if let Some(val) = lookup("QUBITOS_CAL_AUTH_TOKEN") {
            self.service.auth_token = Some(val);
        }
        if let Some(val) = lookup("QUBITOS_CAL_GATE") {
            if let Ok(gate) = val.parse() {
                self.experiment.gate = gate;
            }
        }
        if let Some(val) = lookup("QUBITOS_CAL_SEED") {
            if let Ok(seed) = val.parse() {
                self.experiment.seed = Some(seed);
            }
        }
        if let Some(val) = lookup("QUBITOS_CAL_MAX_ITERATIONS") {
            if let Ok(n) = val.parse() {
                self.termination.max_iterations = n;
            }
        }
        if let Some(val) = lookup("QUBITOS_CAL_OUTPUT") {
            self.output.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("QUBITOS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("QUBITOS_LOG_FORMAT") {
            self.logging.format = val;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        let exp = &self.experiment;
        if !(exp.duration_ns.is_finite() && exp.duration_ns > 0.0) {
            return Err(Error::Config("duration_ns must be > 0".into()));
        }
        if exp.segment_count == 0 {
            return Err(Error::Config("segment_count must be > 0".into()));
        }
        if exp.shot_count == 0 {
            return Err(Error::Config("shot_count must be > 0".into()));
        }
        if exp.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".into()));
        }
        if !(exp.measurement_std.is_finite() && exp.measurement_std > 0.0) {
            return Err(Error::Config("measurement_std must be > 0".into()));
        }
        let b = exp.amplitude_bounds;
        if !b.is_valid() {
            return Err(Error::Config(format!(
                "amplitude_bounds must satisfy lower < upper, got [{}, {}]",
                b.lower, b.upper
            )));
        }
        if self.service.timeout_sec == 0 {
            return Err(Error::Config("service timeout_sec cannot be 0".into()));
        }
        if self.termination.max_iterations == 0 && self.termination.max_duration_sec.is_none() {
            tracing::warn!(
                "Calibration loop has no iteration or time bound and will run until it converges"
            );
        }
        Ok(())
    }
}

/// Remote quantum-control service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the service API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_sec: u64,

    /// Maximum number of retries for transient errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout_sec: default_service_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_service_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

/// Experiment parameters shared by every candidate in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Gate to calibrate
    #[serde(default = "default_gate")]
    pub gate: Gate,

    /// Pulse duration in nanoseconds
    #[serde(default = "default_duration_ns")]
    pub duration_ns: f64,

    /// Number of piecewise-constant segments
    #[serde(default = "default_segment_count")]
    pub segment_count: usize,

    /// Shots per candidate
    #[serde(default = "default_shot_count")]
    pub shot_count: u32,

    /// Candidates per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Amplitude bounds applied to every segment
    #[serde(default)]
    pub amplitude_bounds: Bounds,

    /// Standard deviation of measured costs; also the cost uncertainty
    #[serde(default = "default_measurement_std")]
    pub measurement_std: f64,

    /// Seed for initial candidates and the remote optimizer
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ExperimentConfig {
    pub fn shape(&self) -> PulseShape {
        PulseShape {
            duration_ns: self.duration_ns,
            segment_count: self.segment_count,
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            gate: default_gate(),
            duration_ns: default_duration_ns(),
            segment_count: default_segment_count(),
            shot_count: default_shot_count(),
            batch_size: default_batch_size(),
            amplitude_bounds: Bounds::default(),
            measurement_std: default_measurement_std(),
            seed: None,
        }
    }
}

fn default_gate() -> Gate {
    Gate::X
}

fn default_duration_ns() -> f64 {
    100.0
}

fn default_segment_count() -> usize {
    10
}

fn default_shot_count() -> u32 {
    1024
}

fn default_batch_size() -> usize {
    20
}

fn default_measurement_std() -> f64 {
    0.01
}

/// Loop termination bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationConfig {
    /// Maximum optimizer calls (0 = unbounded)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget in seconds
    #[serde(default)]
    pub max_duration_sec: Option<u64>,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_duration_sec: None,
        }
    }
}

fn default_max_iterations() -> u32 {
    100
}

/// Output artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the calibrated pulse is written
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("calibrated_pulse.json")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, text)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write as _;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.experiment.gate, Gate::X);
        assert_eq!(config.experiment.segment_count, 10);
        assert_eq!(config.experiment.shot_count, 1024);
        assert_eq!(config.termination.max_iterations, 100);
        assert!(config.service.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
service:
  base_url: "https://cal.example.com/api"
experiment:
  gate: h
  duration_ns: 50.0
  segment_count: 8
  amplitude_bounds:
    lower: -0.5
    upper: 0.5
termination:
  max_iterations: 25
  max_duration_sec: 600
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(
            config.service.base_url.as_deref(),
            Some("https://cal.example.com/api")
        );
        assert_eq!(config.experiment.gate, Gate::H);
        assert_eq!(config.experiment.segment_count, 8);
        assert_eq!(config.experiment.amplitude_bounds.upper, 0.5);
        // Unspecified fields keep their defaults
        assert_eq!(config.experiment.shot_count, 1024);
        assert_eq!(config.termination.max_iterations, 25);
        assert_eq!(config.termination.max_duration_sec, Some(600));
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let path = Path::new("/tmp/does_not_exist_qubitos_cal_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.experiment.batch_size, 20);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();
        assert!(Config::load(Some(f.path())).is_err());
    }

    #[test]
    fn test_auth_token_never_serialized() {
        let mut config = Config::default();
        config.service.auth_token = Some("secret-token".into());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret-token"));
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overrides() {
        let env = vars(&[
            ("QUBITOS_CAL_SERVICE_URL", "https://cal.example.com"),
            ("QUBITOS_CAL_GATE", "hadamard"),
            ("QUBITOS_CAL_SEED", "42"),
            ("QUBITOS_CAL_MAX_ITERATIONS", "7"),
            ("QUBITOS_CAL_OUTPUT", "/tmp/pulses/x.json"),
            ("QUBITOS_LOG_LEVEL", "debug"),
            ("QUBITOS_LOG_FORMAT", "json"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(
            config.service.base_url.as_deref(),
            Some("https://cal.example.com")
        );
        assert_eq!(config.experiment.gate, Gate::H);
        assert_eq!(config.experiment.seed, Some(42));
        assert_eq!(config.termination.max_iterations, 7);
        assert_eq!(config.output.path, PathBuf::from("/tmp/pulses/x.json"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert!(config.service.auth_token.is_none());
    }

    #[test]
    fn test_overrides_ignore_unparseable_values() {
        let env = vars(&[
            ("QUBITOS_CAL_MAX_ITERATIONS", "many"),
            ("QUBITOS_CAL_SEED", "-1"),
            ("QUBITOS_CAL_GATE", "cz"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(config.termination.max_iterations, 100);
        assert_eq!(config.experiment.seed, None);
        assert_eq!(config.experiment.gate, Gate::X);
    }

    #[test]
    fn test_validate_rejects_bad_experiment() {
        let mut config = Config::default();
        config.experiment.segment_count = 0;
        assert!(config.validate().unwrap_err().to_string().contains("segment_count"));

        let mut config = Config::default();
        config.experiment.shot_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.experiment.measurement_std = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.experiment.amplitude_bounds = Bounds {
            lower: 1.0,
            upper: -1.0,
        };
        assert!(config.validate().unwrap_err().to_string().contains("lower < upper"));
    }

    #[test]
    fn test_validate_unbounded_loop_still_passes() {
        let mut config = Config::default();
        config.termination.max_iterations = 0;
        // Should warn but still pass validation
        assert!(config.validate().is_ok());
    }
}
