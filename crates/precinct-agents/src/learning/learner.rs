//! The deep Q-learning update protocol.

use rand::Rng;
use tracing::debug;

use super::LearningConfig;
use super::checkpoint::{LearnedState, PolicyLoadError};
use super::network::{Parameters, QNetwork, argmax, max_value};
use super::optimizer::Adam;
use super::replay::ReplayBuffer;

/// One learning record.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Encoded state the action was chosen in.
    pub state: Vec<f64>,
    /// Index of the chosen action.
    pub action: usize,
    /// Encoded follow-up state; `None` marks a terminal transition whose
    /// target is the bare reward.
    pub next_state: Option<Vec<f64>>,
    /// Scalar reward received.
    pub reward: f64,
}

/// Epsilon-greedy policy over a [`QNetwork`], trained from replay with a
/// lagged target network.
#[derive(Debug, Clone)]
pub struct DqnLearner {
    config: LearningConfig,
    policy: QNetwork,
    target: QNetwork,
    optimizer: Adam,
    memory: ReplayBuffer<Transition>,
    epsilon: f64,
    updates: u64,
}

impl DqnLearner {
    /// Fresh learner for a `state_dim -> action_count` policy.
    pub fn new<R: Rng + ?Sized>(
        state_dim: usize,
        action_count: usize,
        config: LearningConfig,
        rng: &mut R,
    ) -> Self {
        let policy = QNetwork::new(state_dim, config.hidden_dim, action_count, rng);
        let target = policy.clone();
        let optimizer = Adam::new(config.learning_rate, policy.params());
        Self {
            config,
            policy,
            target,
            optimizer,
            memory: ReplayBuffer::new(config.memory_size),
            epsilon: bounded_epsilon(config.epsilon_start, config.epsilon_min),
            updates: 0,
        }
    }

    /// Hyperparameters in use.
    pub const fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Apply new hyperparameters. Network shape and replay contents are kept;
    /// the exploration rate is re-clamped to the new floor.
    pub fn reconfigure(&mut self, config: LearningConfig) {
        self.optimizer.set_learning_rate(config.learning_rate);
        self.epsilon = bounded_epsilon(self.epsilon, config.epsilon_min);
        self.config = config;
    }

    /// Current exploration rate.
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of gradient updates applied.
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    /// Number of stored transitions.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// `(inputs, hidden, outputs)` of the policy network.
    pub const fn dims(&self) -> (usize, usize, usize) {
        self.policy.dims()
    }

    /// Action values of the live network.
    pub fn q_values(&self, state: &[f64]) -> Vec<f64> {
        self.policy.forward(state)
    }

    /// The action the live network prefers.
    pub fn greedy_action(&self, state: &[f64]) -> usize {
        argmax(&self.policy.forward(state))
    }

    /// Epsilon-greedy action selection.
    pub fn select_action<R: Rng + ?Sized>(&self, state: &[f64], rng: &mut R) -> usize {
        if rng.random::<f64>() < self.epsilon {
            let (_, _, outputs) = self.policy.dims();
            rng.random_range(0..outputs)
        } else {
            self.greedy_action(state)
        }
    }

    /// Store a transition.
    pub fn remember(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// One learn call: a replay update once a full batch is stored, then
    /// exploration decay. Returns the batch loss when an update ran.
    pub fn learn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<f64> {
        let loss = self.replay(rng);
        self.decay_epsilon();
        loss
    }

    /// Multiply the exploration rate by the decay factor, floored at the minimum.
    pub fn decay_epsilon(&mut self) {
        let decayed = self.epsilon * self.config.epsilon_decay;
        self.epsilon = decayed.max(self.config.epsilon_min).min(self.epsilon);
    }

    fn replay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<f64> {
        let batch_size = self.config.batch_size.max(1);
        if self.memory.len() < batch_size {
            return None;
        }

        let batch = self.memory.sample(rng, batch_size);
        let scale = 1.0 / count_as_f64(batch.len());
        let gamma = self.config.gamma;
        let mut grads = Parameters::zeros_like(self.policy.params());
        let mut loss = 0.0;

        for t in &batch {
            let q = self
                .policy
                .forward(&t.state)
                .get(t.action)
                .copied()
                .unwrap_or_default();
            let target = t.next_state.as_ref().map_or(t.reward, |next| {
                gamma.mul_add(max_value(&self.target.forward(next)), t.reward)
            });
            let diff = q - target;
            loss += huber(diff);
            self.policy
                .accumulate_gradient(&t.state, t.action, huber_grad(diff) * scale, &mut grads);
        }

        grads.clamp(self.config.gradient_clip);
        self.optimizer.step(self.policy.params_mut(), &grads);
        self.updates = self.updates.saturating_add(1);

        let sync = self
            .updates
            .checked_rem(self.config.target_update)
            .is_none_or(|r| r == 0);
        if sync {
            self.target.copy_from(&self.policy);
            debug!(updates = self.updates, "Target network synchronised");
        }

        Some(loss * scale)
    }

    /// Snapshot the learned state.
    pub fn checkpoint(&self) -> LearnedState {
        LearnedState {
            network: self.policy.clone(),
            optimizer: self.optimizer.clone(),
            epsilon: self.epsilon,
            updates: self.updates,
        }
    }

    /// Replace the learned state with a saved one.
    ///
    /// On error the learner is left untouched.
    pub fn restore(&mut self, state: LearnedState) -> Result<(), PolicyLoadError> {
        state.validate()?;
        let expected = self.policy.dims();
        let found = state.network.dims();
        if expected != found {
            return Err(PolicyLoadError::Incompatible { expected, found });
        }
        self.target = state.network.clone();
        self.policy = state.network;
        self.optimizer = state.optimizer;
        self.optimizer.set_learning_rate(self.config.learning_rate);
        self.epsilon = bounded_epsilon(state.epsilon, self.config.epsilon_min);
        self.updates = state.updates;
        Ok(())
    }

    /// Take over a predecessor's learned state, exploring at least at `floor`.
    pub fn inherit(&mut self, state: LearnedState, floor: f64) -> Result<(), PolicyLoadError> {
        self.restore(state)?;
        self.epsilon = bounded_epsilon(self.epsilon, floor);
        Ok(())
    }
}

/// Smooth L1 loss with unit threshold.
fn huber(diff: f64) -> f64 {
    let abs = diff.abs();
    if abs <= 1.0 { 0.5 * diff * diff } else { abs - 0.5 }
}

/// Derivative of [`huber`].
fn huber_grad(diff: f64) -> f64 {
    diff.clamp(-1.0, 1.0)
}

/// Exploration rate raised to `floor` and capped at 1.
fn bounded_epsilon(value: f64, floor: f64) -> f64 {
    value.max(floor).min(1.0)
}

fn count_as_f64(n: usize) -> f64 {
    u32::try_from(n).map_or(f64::from(u32::MAX), f64::from).max(1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn small_config() -> LearningConfig {
        LearningConfig {
            batch_size: 4,
            memory_size: 64,
            hidden_dim: 8,
            target_update: 5,
            learning_rate: 0.01,
            ..LearningConfig::default()
        }
    }

    #[test]
    fn no_update_until_batch_is_full() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut learner = DqnLearner::new(2, 2, small_config(), &mut rng);
        for _ in 0..3 {
            learner.remember(Transition {
                state: vec![0.0, 1.0],
                action: 0,
                next_state: None,
                reward: 1.0,
            });
            assert!(learner.learn(&mut rng).is_none());
        }
        assert_eq!(learner.updates(), 0);
    }

    #[test]
    fn epsilon_is_non_increasing_and_floored() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = LearningConfig {
            epsilon_decay: 0.5,
            epsilon_min: 0.05,
            ..small_config()
        };
        let mut learner = DqnLearner::new(2, 2, config, &mut rng);
        let mut previous = learner.epsilon();
        for _ in 0..20 {
            learner.learn(&mut rng);
            assert!(learner.epsilon() <= previous);
            assert!(learner.epsilon() >= 0.05);
            previous = learner.epsilon();
        }
        assert!((learner.epsilon() - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn learns_reward_only_classification() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut learner = DqnLearner::new(1, 2, small_config(), &mut rng);
        for i in 0..400 {
            let action = i % 2;
            let reward = if action == 1 { 1.0 } else { -1.0 };
            learner.remember(Transition {
                state: vec![1.0],
                action,
                next_state: None,
                reward,
            });
            learner.learn(&mut rng);
        }
        assert_eq!(learner.greedy_action(&[1.0]), 1);
        assert!(learner.updates() > 0);
    }

    #[test]
    fn restore_round_trips_and_rejects_other_shapes() {
        let mut rng = StdRng::seed_from_u64(3);
        let source = DqnLearner::new(3, 4, small_config(), &mut rng);
        let mut twin = DqnLearner::new(3, 4, small_config(), &mut rng);
        twin.restore(source.checkpoint()).unwrap();
        assert_eq!(twin.q_values(&[0.1, 0.2, 0.3]), source.q_values(&[0.1, 0.2, 0.3]));

        let mut other = DqnLearner::new(5, 4, small_config(), &mut rng);
        let before = other.q_values(&[0.0; 5]);
        let err = other.restore(source.checkpoint()).unwrap_err();
        assert!(matches!(err, PolicyLoadError::Incompatible { .. }));
        assert_eq!(other.q_values(&[0.0; 5]), before);
    }

    #[test]
    fn inherit_raises_exploration_to_floor() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = LearningConfig {
            epsilon_start: 0.01,
            ..small_config()
        };
        let source = DqnLearner::new(3, 4, config, &mut rng);
        let mut heir = DqnLearner::new(3, 4, config, &mut rng);
        heir.inherit(source.checkpoint(), 0.1).unwrap();
        assert!((heir.epsilon() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn huber_is_quadratic_then_linear() {
        assert!((huber(0.5) - 0.125).abs() < f64::EPSILON);
        assert!((huber(-3.0) - 2.5).abs() < f64::EPSILON);
        assert!((huber_grad(7.0) - 1.0).abs() < f64::EPSILON);
    }
}
