// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS calibration CLI
//!
//! Runs closed-loop gate calibration against a remote quantum-control service.
//!
//! # Usage
//!
//! ```bash
//! # Calibrate an X gate with the default configuration
//! qubit-os-cal run
//!
//! # Calibrate a Hadamard-like gate, writing the pulse elsewhere
//! qubit-os-cal run --gate h --output pulses/h_gate.json
//!
//! # Check the remote service
//! qubit-os-cal health
//!
//! # Inspect a calibrated pulse
//! qubit-os-cal show pulses/h_gate.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_calibration::{
    calibration::initial_batch,
    config::{Config, LoggingConfig},
    driver::ExperimentDriver,
    export::{load_pulse, save_pulse, CalibratedPulse},
    pulse::Gate,
    service::{ExperimentService, HealthStatus, OptimizerService, ReqwestServiceClient},
    CalibrationLoop, Result, VERSION,
};

/// Exit code for a run that stopped on a bound before converging.
const EXIT_NOT_CONVERGED: i32 = 2;

/// QubitOS closed-loop gate calibration
#[derive(Parser)]
#[command(name = "qubit-os-cal")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Closed-loop gate calibration against a remote quantum-control service")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "QUBITOS_CAL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a calibration
    Run {
        /// Gate to calibrate (x, h)
        #[arg(short, long)]
        gate: Option<Gate>,

        /// Where to write the calibrated pulse
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum optimizer calls (0 = unbounded)
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Wall-clock budget in seconds
        #[arg(long)]
        max_duration_sec: Option<u64>,

        /// Seed for the initial batch and the optimizer
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check remote service health
    Health,

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,

    /// Print a calibrated pulse file
    Show {
        /// Pulse file written by `run`
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging);

    match cli.command {
        Commands::Run {
            gate,
            output,
            max_iterations,
            max_duration_sec,
            seed,
        } => {
            if let Some(gate) = gate {
                config.experiment.gate = gate;
            }
            if let Some(path) = output {
                config.output.path = path;
            }
            if let Some(n) = max_iterations {
                config.termination.max_iterations = n;
            }
            if let Some(secs) = max_duration_sec {
                config.termination.max_duration_sec = Some(secs);
            }
            if let Some(seed) = seed {
                config.experiment.seed = Some(seed);
            }

            config.validate()?;

            let client = Arc::new(ReqwestServiceClient::from_config(&config.service)?);
            let experiment = &config.experiment;
            let shape = experiment.shape();

            info!(
                version = VERSION,
                gate = %experiment.gate,
                duration_ns = shape.duration_ns,
                segments = shape.segment_count,
                shots = experiment.shot_count,
                batch_size = experiment.batch_size,
                "Starting QubitOS calibration"
            );

            let driver = ExperimentDriver::new(client.clone(), experiment);
            let calibration = CalibrationLoop::new(driver, client, experiment, &config.termination);

            let batch = initial_batch(
                &shape,
                &experiment.amplitude_bounds,
                experiment.batch_size,
                experiment.seed,
            )?;
            let outcome = calibration.run(batch).await?;

            let pulse = CalibratedPulse::from_outcome(&outcome, experiment.gate, &shape);
            save_pulse(&config.output.path, &pulse)?;

            println!(
                "{} gate: best infidelity {:.4} after {} optimizer calls ({})",
                experiment.gate, outcome.best_cost, outcome.optimizer_calls, outcome.stop_reason
            );
            println!("Pulse written to {}", config.output.path.display());

            if !outcome.converged() {
                warn!(threshold = calibration.threshold(), "Pulse did not reach the threshold");
                std::process::exit(EXIT_NOT_CONVERGED);
            }
        }

        Commands::Health => {
            let client = ReqwestServiceClient::from_config(&config.service)?;
            let checks = [
                ("experiments", ExperimentService::health_check(&client).await),
                ("optimizer", OptimizerService::health_check(&client).await),
            ];

            let mut healthy = true;
            for (part, result) in checks {
                match result {
                    Ok(HealthStatus::Healthy) => println!("{} {}: Healthy", client.name(), part),
                    Ok(status) => {
                        healthy = false;
                        println!("{} {}: {:?}", client.name(), part, status);
                    }
                    Err(e) => {
                        healthy = false;
                        eprintln!("{} {}: Error - {}", client.name(), part, e);
                    }
                }
            }
            if !healthy {
                std::process::exit(1);
            }
        }

        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Show { path } => {
            let pulse = load_pulse(&path)?;
            println!("{}", serde_json::to_string_pretty(&pulse)?);
        }
    }

    Ok(())
}

/// Initialize logging with tracing.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
