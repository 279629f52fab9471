//! The shared learning module.
//!
//! All three learned roles use the same update protocol: transitions go
//! into a bounded FIFO [`ReplayBuffer`]; once it holds a full batch, each
//! learn call samples uniformly, bootstraps targets through a lagged copy
//! of the [`QNetwork`] (or uses the bare reward for terminal transitions),
//! applies a Huber loss, clips gradients, and steps an [`Adam`] optimizer.
//! Exploration decays geometrically after every learn call, floored at a
//! configured minimum.
//!
//! # Modules
//!
//! - [`replay`] -- Fixed-capacity FIFO transition store
//! - [`network`] -- Two-layer Q-network with manual backpropagation
//! - [`optimizer`] -- Adam optimizer state
//! - [`learner`] -- The [`DqnLearner`] tying it all together
//! - [`checkpoint`] -- Serializable learned state and load errors

pub mod checkpoint;
pub mod learner;
pub mod network;
pub mod optimizer;
pub mod replay;

use serde::Deserialize;

pub use checkpoint::{LearnedState, PolicyLoadError};
pub use learner::{DqnLearner, Transition};
pub use network::{Parameters, QNetwork};
pub use optimizer::Adam;
pub use replay::ReplayBuffer;

/// Hyperparameters shared by every learned policy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LearningConfig {
    /// Optimizer step size (default: 0.001).
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Discount applied to bootstrapped targets (default: 0.99).
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Exploration rate of a fresh policy (default: 1.0).
    #[serde(default = "default_epsilon_start")]
    pub epsilon_start: f64,

    /// Exploration floor (default: 0.01).
    #[serde(default = "default_epsilon_min")]
    pub epsilon_min: f64,

    /// Multiplicative decay applied after every learn call (default: 0.999).
    #[serde(default = "default_epsilon_decay")]
    pub epsilon_decay: f64,

    /// Transitions per update (default: 32).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Replay buffer capacity (default: 10000).
    #[serde(default = "default_memory_size")]
    pub memory_size: usize,

    /// Hidden layer width (default: 64).
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,

    /// Updates between target-network synchronisations (default: 200).
    #[serde(default = "default_target_update")]
    pub target_update: u64,

    /// Per-element gradient clip magnitude (default: 1.0).
    #[serde(default = "default_gradient_clip")]
    pub gradient_clip: f64,

    /// Added to the exploration floor when a replacement inherits a policy (default: 0.09).
    #[serde(default = "default_inheritance_margin")]
    pub inheritance_margin: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            gamma: default_gamma(),
            epsilon_start: default_epsilon_start(),
            epsilon_min: default_epsilon_min(),
            epsilon_decay: default_epsilon_decay(),
            batch_size: default_batch_size(),
            memory_size: default_memory_size(),
            hidden_dim: default_hidden_dim(),
            target_update: default_target_update(),
            gradient_clip: default_gradient_clip(),
            inheritance_margin: default_inheritance_margin(),
        }
    }
}

impl LearningConfig {
    /// Minimum exploration rate granted to a policy inherited by a replacement.
    pub fn inherited_epsilon_floor(&self) -> f64 {
        (self.epsilon_min + self.inheritance_margin).min(1.0)
    }
}

const fn default_learning_rate() -> f64 {
    0.001
}

const fn default_gamma() -> f64 {
    0.99
}

const fn default_epsilon_start() -> f64 {
    1.0
}

const fn default_epsilon_min() -> f64 {
    0.01
}

const fn default_epsilon_decay() -> f64 {
    0.999
}

const fn default_batch_size() -> usize {
    32
}

const fn default_memory_size() -> usize {
    10_000
}

const fn default_hidden_dim() -> usize {
    64
}

const fn default_target_update() -> u64 {
    200
}

const fn default_gradient_clip() -> f64 {
    1.0
}

const fn default_inheritance_margin() -> f64 {
    0.09
}
