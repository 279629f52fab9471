//! Episode orchestration, hierarchy, lifecycle, and run control for the
//! Precinct simulation.
//!
//! This crate owns the episode step that drives the simulation: one
//! officer faces one scenario, is scored and learns; every few episodes
//! the detective audits a sample of the force and the controller punishes
//! what the detective escalates.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `precinct-config.yaml` into
//!   strongly-typed structs.
//! - [`tunables`] -- The flat, typed namespace of runtime-adjustable
//!   parameters.
//! - [`rewards`] -- The officer outcome-to-reward table.
//! - [`roster`] -- Every active agent, partitioned by role.
//! - [`lifecycle`] -- Execution and knowledge-inheriting replacement.
//! - [`hierarchy`] -- The periodic detective/controller pass.
//! - [`engine`] -- [`Simulation`] and the per-episode step.
//! - [`operator`] -- Shared control state for pause, turbo, reset, stop.
//! - [`runner`] -- The async stepping loop.
//!
//! [`Simulation`]: engine::Simulation

pub mod config;
pub mod engine;
pub mod hierarchy;
pub mod lifecycle;
pub mod operator;
pub mod rewards;
pub mod roster;
pub mod runner;
pub mod tunables;

pub use config::{ConfigError, SimulationConfig};
pub use engine::{Simulation, StepError, StepReport};
pub use lifecycle::{LifecycleError, Replacement};
pub use operator::{OperatorState, SimulationEndReason};
pub use roster::Roster;
pub use runner::{RunnerError, SimulationResult, StepObserver, run_simulation};
