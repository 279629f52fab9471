//! The learned controller (chief).
//!
//! The controller decides how to punish an escalated officer. Its reward is
//! not about the individual case at all: it is a proportional feedback
//! signal on the distance between the force's mean corruption and the
//! configured setpoint, so over time the chief learns to execute when the
//! force is too corrupt and to go easy when it is too clean.

use precinct_types::{
    AgentId, AgentProfile, ControllerAction, EpisodeContext, EvidenceGrade, Role,
};
use rand::Rng;

use crate::config::ControllerConfig;
use crate::features::capped_ratio;
use crate::learning::{DqnLearner, LearningConfig, Transition};

/// Length of the controller's state vector.
pub const STATE_DIM: usize = 6;

/// Well-known display name of the controller.
pub const CONTROLLER_NAME: &str = "Chief_Justice";

/// The singleton chief.
#[derive(Debug, Clone)]
pub struct Controller {
    id: AgentId,
    wealth: f64,
    config: ControllerConfig,
    learner: DqnLearner,
    executions: u32,
    dismissals: u32,
    warnings: u32,
    pending: Option<(Vec<f64>, usize)>,
}

impl Controller {
    /// Create a controller with a fresh policy.
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        config: ControllerConfig,
        learning: LearningConfig,
        rng: &mut R,
    ) -> Self {
        Self {
            id,
            wealth: 0.0,
            config,
            learner: DqnLearner::new(STATE_DIM, ControllerAction::ALL.len(), learning, rng),
            executions: 0,
            dismissals: 0,
            warnings: 0,
            pending: None,
        }
    }

    /// Agent identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Wealth collected through kickbacks.
    pub const fn wealth(&self) -> f64 {
        self.wealth
    }

    /// Restore kickback wealth (cold start).
    pub const fn set_wealth(&mut self, wealth: f64) {
        self.wealth = wealth;
    }

    /// Setpoint and reward shape.
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Replace the setpoint and reward shape (runtime tunable overrides).
    pub const fn set_config(&mut self, config: ControllerConfig) {
        self.config = config;
    }

    /// `(executions, dismissals, warnings)` issued so far.
    pub const fn punishments(&self) -> (u32, u32, u32) {
        (self.executions, self.dismissals, self.warnings)
    }

    /// The controller's learner.
    pub const fn learner(&self) -> &DqnLearner {
        &self.learner
    }

    /// The controller's learner, mutably.
    pub const fn learner_mut(&mut self) -> &mut DqnLearner {
        &mut self.learner
    }

    /// Credit a kickback.
    pub fn receive_kickback(&mut self, amount: f64) {
        self.wealth += amount;
    }

    /// Encode an escalated case against the state of the force.
    pub fn encode_state(
        &self,
        evidence: EvidenceGrade,
        target: &AgentProfile,
        mean_corruption: f64,
    ) -> Vec<f64> {
        vec![
            evidence.strength(),
            capped_ratio(target.times_caught, 5),
            target.loyalty / 100.0,
            target.corruption_score / 100.0,
            mean_corruption / 100.0,
            (mean_corruption - self.config.target_corruption) / 100.0,
        ]
    }

    /// Choose a punishment for an escalated officer.
    pub fn decide_punishment(
        &mut self,
        evidence: EvidenceGrade,
        target: &AgentProfile,
        mean_corruption: f64,
        ctx: &mut EpisodeContext,
    ) -> ControllerAction {
        let state = self.encode_state(evidence, target, mean_corruption);
        let index = self.learner.select_action(&state, ctx.rng());
        self.pending = Some((state, index));
        let action = ControllerAction::from_index(index).unwrap_or(ControllerAction::Warning);
        match action {
            ControllerAction::Execute => self.executions = self.executions.saturating_add(1),
            ControllerAction::Fire => self.dismissals = self.dismissals.saturating_add(1),
            ControllerAction::Warning => self.warnings = self.warnings.saturating_add(1),
        }
        action
    }

    /// Setpoint reward for `action` given the force's mean corruption.
    pub fn calculate_reward(&self, action: ControllerAction, mean_corruption: f64) -> f64 {
        setpoint_reward(&self.config, action, mean_corruption)
    }

    /// Learn from the last decision. Punishments are single-step.
    pub fn learn(&mut self, reward: f64, ctx: &mut EpisodeContext) -> Option<f64> {
        let (state, action) = self.pending.take()?;
        self.learner.remember(Transition {
            state,
            action,
            next_state: None,
            reward,
        });
        self.learner.learn(ctx.rng())
    }

    /// Observable projection.
    pub const fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id,
            role: Role::Controller,
            corruption_score: 0.0,
            wealth: self.wealth,
            times_caught: 0,
            loyalty: 100.0,
        }
    }
}

/// Proportional reward around the corruption setpoint.
///
/// Above the band, executing pays more the further corruption overshoots
/// and warning is penalised. Below the band, warning pays more the further
/// corruption undershoots and executing is penalised in proportion to the
/// deficit. Inside the band every action earns the same status-quo reward.
pub fn setpoint_reward(
    config: &ControllerConfig,
    action: ControllerAction,
    mean_corruption: f64,
) -> f64 {
    let error = mean_corruption - config.target_corruption;
    if error > config.tolerance {
        match action {
            ControllerAction::Execute => error.mul_add(config.execute_gain, config.execute_base),
            ControllerAction::Fire => config.fire_above_reward,
            ControllerAction::Warning => config.warning_penalty,
        }
    } else if error < -config.tolerance {
        let deficit = -error;
        match action {
            ControllerAction::Warning => deficit.mul_add(config.warning_gain, config.warning_base),
            ControllerAction::Execute => {
                let scale = if config.deficit_scale > 0.0 {
                    config.deficit_scale
                } else {
                    1.0
                };
                -config.execute_penalty * deficit / scale
            }
            ControllerAction::Fire => config.fire_below_reward,
        }
    } else {
        config.status_quo_reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward(action: ControllerAction, mean: f64) -> f64 {
        setpoint_reward(&ControllerConfig::default(), action, mean)
    }

    #[test]
    fn overshoot_rewards_execution() {
        assert!((reward(ControllerAction::Execute, 70.0) - 700.0).abs() < 1e-9);
        assert!((reward(ControllerAction::Warning, 70.0) + 500.0).abs() < 1e-9);
        let fire = reward(ControllerAction::Fire, 70.0);
        assert!(fire > 0.0 && fire < 700.0);
    }

    #[test]
    fn undershoot_rewards_warning() {
        assert!((reward(ControllerAction::Warning, 30.0) - 700.0).abs() < 1e-9);
        assert!((reward(ControllerAction::Execute, 30.0) + 1_000.0).abs() < 1e-9);
        let fire = reward(ControllerAction::Fire, 30.0);
        assert!(fire > 0.0 && fire < 700.0);
    }

    #[test]
    fn dead_band_is_flat() {
        for mean in [45.0, 50.0, 55.0] {
            let rewards: Vec<f64> = ControllerAction::ALL
                .iter()
                .map(|a| reward(*a, mean))
                .collect();
            assert!(rewards.windows(2).all(|w| match w {
                [a, b] => (a - b).abs() < f64::EPSILON,
                _ => true,
            }));
        }
    }

    #[test]
    fn kickbacks_accumulate() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut chief = Controller::new(
            AgentId(0),
            ControllerConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        );
        chief.receive_kickback(40.0);
        chief.receive_kickback(60.0);
        assert!((chief.wealth() - 100.0).abs() < f64::EPSILON);
        assert!((chief.profile().wealth - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn signed_error_feature_tracks_setpoint() {
        let mut ctx = EpisodeContext::seeded(1);
        let chief = Controller::new(
            AgentId(0),
            ControllerConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        );
        let target = AgentProfile {
            id: AgentId(4),
            role: Role::CorruptOfficer,
            corruption_score: 80.0,
            wealth: 0.0,
            times_caught: 2,
            loyalty: 40.0,
        };
        let state = chief.encode_state(EvidenceGrade::Strong, &target, 30.0);
        assert_eq!(state.len(), STATE_DIM);
        assert!((state.last().copied().unwrap_or_default() + 0.2).abs() < 1e-12);
        assert!((state.first().copied().unwrap_or_default() - 1.0).abs() < f64::EPSILON);
    }
}
