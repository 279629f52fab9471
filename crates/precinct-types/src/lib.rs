//! Shared type definitions for the Precinct simulation.
//!
//! This crate is the single source of truth for the vocabulary used across
//! the Precinct workspace: identifiers, the closed action and outcome sets,
//! the per-episode [`Scenario`], the observable [`AgentProfile`] projection,
//! the rows handed to the persistence layer, and the explicit
//! [`EpisodeContext`] that carries the episode counter and seeded RNG.
//!
//! # Modules
//!
//! - [`ids`] -- Integer agent identifiers and UUID run identifiers
//! - [`enums`] -- Roles, personalities, crimes, actions, outcomes, statuses
//! - [`scenario`] -- The situational state an officer acts on
//! - [`records`] -- Observable projection and persistence rows
//! - [`context`] -- Episode counter and deterministic randomness

pub mod context;
pub mod enums;
pub mod ids;
pub mod records;
pub mod scenario;

pub use context::EpisodeContext;
pub use enums::{
    AgentStatus, ControllerAction, CrimeType, DetectiveAction, EvidenceGrade, ExecutionReason,
    OfficerAction, Outcome, Personality, Role, WealthTier,
};
pub use ids::{AgentId, RunId};
pub use records::{AgentProfile, EpisodeStatsRow, HistoryRow, InvestigationRow, RosterRow};
pub use scenario::Scenario;
