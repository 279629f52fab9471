//! The environment officers act in.
//!
//! The environment holds no state across episodes. Each episode it builds a
//! fresh [`Scenario`](precinct_types::Scenario) and then resolves whatever
//! the officer chooses to do against it, one action at a time.
//!
//! # Modules
//!
//! - [`risk`] -- Detection risk weights and the caught probability
//! - [`environment`] -- Scenario generation and the outcome state machine

pub mod environment;
pub mod risk;

pub use environment::{Environment, Resolution};
pub use risk::RiskConfig;
