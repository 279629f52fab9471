//! Engine binary for the Precinct simulation.
//!
//! This is the main entry point that wires together configuration,
//! storage, the simulation, and operator controls, then runs the stepping
//! loop until the episode window is reached or the operator stops it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `precinct-config.yaml` (or `PRECINCT_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the registry and learned-state stores
//! 4. Resume the simulation, or start fresh with `--fresh`
//! 5. Create operator state; `--turbo` starts in turbo mode and each
//!    `--set key=value` is queued as a tunable change
//! 6. Install the Ctrl-C handler as an operator stop
//! 7. Run the stepping loop
//! 8. Log the result
//!
//! # Usage
//!
//! ```text
//! precinct-engine [--fresh] [--turbo] [--set schedule.episode_window=200 ...]
//! ```

mod error;
mod observer;

use std::path::PathBuf;
use std::sync::Arc;

use precinct_core::config::LoggingConfig;
use precinct_core::operator::OperatorState;
use precinct_core::{Simulation, SimulationConfig, runner};
use precinct_db::{FileBrainStore, FileStore};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer::LoggingObserver;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "precinct-config.yaml";

/// Observed episodes between progress lines.
const PROGRESS_EVERY: u64 = 100;

/// Command-line switches.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Args {
    fresh: bool,
    turbo: bool,
    tunables: Vec<(String, String)>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, EngineError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--fresh" => parsed.fresh = true,
                "--turbo" => parsed.turbo = true,
                "--set" => {
                    let pair = args.next().unwrap_or_default();
                    let Some((key, value)) = pair.split_once('=') else {
                        return Err(EngineError::Usage { arg: pair });
                    };
                    parsed.tunables.push((key.to_owned(), value.to_owned()));
                }
                _ => return Err(EngineError::Usage { arg }),
            }
        }
        Ok(parsed)
    }
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, storage, or a step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1))?;

    // 1. Load configuration.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("precinct-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        step_interval_ms = config.world.step_interval_ms,
        episode_window = config.schedule.episode_window,
        "Configuration loaded"
    );

    // 3. Open stores.
    let store = FileStore::open(&config.storage.data_dir)?;
    let brains = FileBrainStore::open(&config.storage.brain_dir)?;
    info!(
        data_dir = %config.storage.data_dir.display(),
        brain_dir = %config.storage.brain_dir.display(),
        "Stores opened"
    );

    // 4. Build the simulation.
    let operator = Arc::new(OperatorState::new(&config.world));
    let mut sim = if args.fresh {
        Simulation::new(config, store, brains)
    } else {
        Simulation::open(config, store, brains)
    };
    info!(
        episode = sim.episode(),
        agents = sim.roster().len(),
        history = sim.history().len(),
        "Simulation ready"
    );

    // 5. Operator state.
    if args.turbo {
        operator.set_turbo(true);
    }
    for (key, value) in args.tunables {
        info!(key = %key, value = %value, "Tunable queued");
        operator.queue_tunable(key, Value::String(value)).await;
    }
    info!(
        turbo = operator.is_turbo(),
        step_interval_ms = operator.step_interval_ms(),
        "Operator state initialized"
    );

    // 6. Ctrl-C stops the loop cleanly.
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current episode");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to install the interrupt handler"),
            }
        });
    }

    // 7. Run the simulation.
    let mut observer = LoggingObserver::new(PROGRESS_EVERY);
    let result = runner::run_simulation(&mut sim, &operator, &mut observer)
        .await
        .map_err(EngineError::from)?;

    // 8. Log results.
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_episodes = result.total_episodes,
        executions = observer.executions(),
        "precinct-engine shutdown complete"
    );

    Ok(())
}

/// Load the configuration from `PRECINCT_CONFIG` or [`CONFIG_FILE`].
///
/// Returns the defaults, and `false`, if the file does not exist.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let path = std::env::var_os("PRECINCT_CONFIG")
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if path.exists() {
        Ok((SimulationConfig::from_file(&path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
