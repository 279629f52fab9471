//! Tunable parameters for the agent policies.
//!
//! Each struct mirrors one section of `precinct-config.yaml`. Every field
//! has a named default so a partial YAML section still yields a complete
//! configuration.

use serde::Deserialize;

/// Largest accepted half-width of the detective's estimate noise, in score points.
pub const MAX_ESTIMATE_NOISE: f64 = 100.0;

/// Stat dynamics for officers.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OfficerConfig {
    /// Corruption gained per undetected corrupt success (default: 2).
    #[serde(default = "default_corruption_gain")]
    pub corruption_gain: f64,

    /// Corruption lost when caught (default: 10).
    #[serde(default = "default_corruption_loss")]
    pub corruption_loss: f64,

    /// Paranoia gained when caught (default: 0.2).
    #[serde(default = "default_paranoia_gain")]
    pub paranoia_gain: f64,

    /// Loyalty lost when caught (default: 5).
    #[serde(default = "default_loyalty_loss")]
    pub loyalty_loss: f64,

    /// Wealth credited for a corrupt success that carries no offer (default: 1000).
    #[serde(default = "default_bribe_amount")]
    pub default_bribe: u64,

    /// Offer above which an honest officer treats a scenario as a bribe attempt (default: 50).
    #[serde(default = "default_honest_offer_threshold")]
    pub honest_offer_threshold: u64,
}

impl Default for OfficerConfig {
    fn default() -> Self {
        Self {
            corruption_gain: default_corruption_gain(),
            corruption_loss: default_corruption_loss(),
            paranoia_gain: default_paranoia_gain(),
            loyalty_loss: default_loyalty_loss(),
            default_bribe: default_bribe_amount(),
            honest_offer_threshold: default_honest_offer_threshold(),
        }
    }
}

/// Audit parameters for the detective.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DetectiveConfig {
    /// Corruption score above which a target counts as guilty (default: 50).
    #[serde(default = "default_guilty_threshold")]
    pub guilty_threshold: f64,

    /// Half-width of the noise on the corruption estimate, in score points (default: 15).
    #[serde(default = "default_estimate_noise")]
    pub estimate_noise: f64,

    /// Reward for escalating a guilty officer (default: 100).
    #[serde(default = "default_solved_reward")]
    pub solved_reward: f64,

    /// Reward for escalating an innocent officer (default: -100).
    #[serde(default = "default_wrongful_reward")]
    pub wrongful_reward: f64,

    /// Reward for ignoring a guilty officer (default: -50).
    #[serde(default = "default_missed_reward")]
    pub missed_reward: f64,

    /// Reward for ignoring an innocent officer (default: 10).
    #[serde(default = "default_cleared_reward")]
    pub cleared_reward: f64,
}

impl Default for DetectiveConfig {
    fn default() -> Self {
        Self {
            guilty_threshold: default_guilty_threshold(),
            estimate_noise: default_estimate_noise(),
            solved_reward: default_solved_reward(),
            wrongful_reward: default_wrongful_reward(),
            missed_reward: default_missed_reward(),
            cleared_reward: default_cleared_reward(),
        }
    }
}

/// Setpoint and reward shape for the controller.
///
/// The controller is rewarded as a proportional feedback controller
/// around `target_corruption`, with a dead band of `tolerance` on either
/// side in which every action earns `status_quo_reward`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ControllerConfig {
    /// Target mean corruption of the corrupt-officer group (default: 50).
    #[serde(default = "default_target_corruption")]
    pub target_corruption: f64,

    /// Half-width of the dead band around the target (default: 5).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Base reward for executing while above target (default: 500).
    #[serde(default = "default_execute_base")]
    pub execute_base: f64,

    /// Additional execute reward per point of excess (default: 10).
    #[serde(default = "default_execute_gain")]
    pub execute_gain: f64,

    /// Reward for firing while above target (default: 200).
    #[serde(default = "default_fire_above")]
    pub fire_above_reward: f64,

    /// Reward for warning while above target (default: -500).
    #[serde(default = "default_warning_penalty")]
    pub warning_penalty: f64,

    /// Base reward for warning while below target (default: 300).
    #[serde(default = "default_warning_base")]
    pub warning_base: f64,

    /// Additional warning reward per point of deficit (default: 20).
    #[serde(default = "default_warning_gain")]
    pub warning_gain: f64,

    /// Execute penalty per `deficit_scale` points of deficit (default: 500).
    #[serde(default = "default_execute_penalty")]
    pub execute_penalty: f64,

    /// Deficit points per unit of execute penalty (default: 10).
    #[serde(default = "default_deficit_scale")]
    pub deficit_scale: f64,

    /// Reward for firing while below target (default: 50).
    #[serde(default = "default_fire_below")]
    pub fire_below_reward: f64,

    /// Reward for any action inside the dead band (default: 50).
    #[serde(default = "default_status_quo")]
    pub status_quo_reward: f64,

    /// Corruption points knocked off a dismissed officer (default: 50).
    #[serde(default = "default_fire_corruption_penalty")]
    pub fire_corruption_penalty: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target_corruption: default_target_corruption(),
            tolerance: default_tolerance(),
            execute_base: default_execute_base(),
            execute_gain: default_execute_gain(),
            fire_above_reward: default_fire_above(),
            warning_penalty: default_warning_penalty(),
            warning_base: default_warning_base(),
            warning_gain: default_warning_gain(),
            execute_penalty: default_execute_penalty(),
            deficit_scale: default_deficit_scale(),
            fire_below_reward: default_fire_below(),
            status_quo_reward: default_status_quo(),
            fire_corruption_penalty: default_fire_corruption_penalty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_corruption_gain() -> f64 {
    2.0
}

const fn default_corruption_loss() -> f64 {
    10.0
}

const fn default_paranoia_gain() -> f64 {
    0.2
}

const fn default_loyalty_loss() -> f64 {
    5.0
}

const fn default_bribe_amount() -> u64 {
    1_000
}

const fn default_honest_offer_threshold() -> u64 {
    50
}

const fn default_guilty_threshold() -> f64 {
    50.0
}

const fn default_estimate_noise() -> f64 {
    15.0
}

const fn default_solved_reward() -> f64 {
    100.0
}

const fn default_wrongful_reward() -> f64 {
    -100.0
}

const fn default_missed_reward() -> f64 {
    -50.0
}

const fn default_cleared_reward() -> f64 {
    10.0
}

const fn default_target_corruption() -> f64 {
    50.0
}

const fn default_tolerance() -> f64 {
    5.0
}

const fn default_execute_base() -> f64 {
    500.0
}

const fn default_execute_gain() -> f64 {
    10.0
}

const fn default_fire_above() -> f64 {
    200.0
}

const fn default_warning_penalty() -> f64 {
    -500.0
}

const fn default_warning_base() -> f64 {
    300.0
}

const fn default_warning_gain() -> f64 {
    20.0
}

const fn default_execute_penalty() -> f64 {
    500.0
}

const fn default_deficit_scale() -> f64 {
    10.0
}

const fn default_fire_below() -> f64 {
    50.0
}

const fn default_status_quo() -> f64 {
    50.0
}

const fn default_fire_corruption_penalty() -> f64 {
    50.0
}
