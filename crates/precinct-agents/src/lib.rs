//! Agent policies for the Precinct simulation.
//!
//! Four role variants share the capability set decide / learn /
//! update-stats. The corrupt officer, detective, and controller learn
//! through the shared [`learning`] module; the honest officer follows a
//! fixed rule ladder. Every variant can produce the same observable
//! [`AgentProfile`](precinct_types::AgentProfile), which is all the
//! detective and controller ever see of the officers they judge.
//!
//! # Modules
//!
//! - [`agent`] -- The tagged [`Agent`] variant and the [`Officer`] trait
//! - [`corrupt`] -- Learned corrupt officer
//! - [`honest`] -- Rule-based honest officer
//! - [`detective`] -- Learned internal-affairs auditor
//! - [`controller`] -- Learned chief and the setpoint reward
//! - [`features`] -- State-vector normalisation helpers
//! - [`learning`] -- Replay buffer, Q-network, optimizer, learner
//! - [`config`] -- Tunable parameters for the policies
//! - [`error`] -- Agent error types

pub mod agent;
pub mod config;
pub mod controller;
pub mod corrupt;
pub mod detective;
pub mod error;
pub mod features;
pub mod honest;
pub mod learning;

pub use agent::{Agent, Officer};
pub use config::{ControllerConfig, DetectiveConfig, OfficerConfig};
pub use controller::Controller;
pub use corrupt::CorruptOfficer;
pub use detective::Detective;
pub use error::AgentError;
pub use honest::HonestOfficer;
pub use learning::{DqnLearner, LearnedState, LearningConfig, PolicyLoadError};
