//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the run.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: precinct_core::ConfigError,
    },

    /// A store could not be opened.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying persistence error.
        #[from]
        source: precinct_db::PersistenceError,
    },

    /// The stepping loop halted on a failed step.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: precinct_core::RunnerError,
    },

    /// A command-line argument was not recognised.
    #[error("unknown argument: {arg}")]
    Usage {
        /// The rejected argument.
        arg: String,
    },
}
