//! Data layer for the Precinct simulation.
//!
//! Two independent stores sit behind traits so the orchestrator never
//! depends on storage mechanics:
//!
//! ```text
//! Simulation::step
//!     |
//!     +-- roster rows, history, investigations, stats --> SimulationStore
//!     |                                                   |-- MemoryStore
//!     |                                                   +-- FileStore (JSON / JSON lines)
//!     |
//!     +-- learned state per agent ----------------------> BrainStore
//!                                                         |-- MemoryBrainStore
//!                                                         +-- FileBrainStore (JSON per key)
//! ```
//!
//! Both are synchronous: one step writes start-to-finish before the next
//! begins. Callers log and continue on [`PersistenceError`]; a missing or
//! unreadable learned-state blob surfaces as `Ok(None)` or a
//! [`PolicyLoadError`](precinct_agents::PolicyLoadError) and the caller
//! falls back to a fresh policy.
//!
//! # Modules
//!
//! - [`store`] -- The [`SimulationStore`] trait and its implementations
//! - [`brain_store`] -- Learned-state blobs keyed by agent
//! - [`error`] -- Shared error types

pub mod brain_store;
pub mod error;
pub mod store;

pub use brain_store::{BrainKey, BrainStore, FileBrainStore, MemoryBrainStore};
pub use error::PersistenceError;
pub use store::{FileStore, MemoryStore, SimulationStore};
