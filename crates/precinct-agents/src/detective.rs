//! The learned internal-affairs detective.
//!
//! The detective sees an officer only through its [`AgentProfile`] and a
//! noisy estimate of its corruption, and decides whether to ignore the file
//! or escalate it to the controller. It is scored as a classifier against
//! the officer's true corruption.

use precinct_types::{AgentId, AgentProfile, DetectiveAction, EpisodeContext, EvidenceGrade};
use rand::Rng;

use crate::config::{DetectiveConfig, MAX_ESTIMATE_NOISE};
use crate::features::{capped_ratio, log_scale};
use crate::learning::{DqnLearner, LearningConfig, Transition};

/// Length of the detective's state vector.
pub const STATE_DIM: usize = 5;

/// Well-known display name of the detective.
pub const DETECTIVE_NAME: &str = "Det_Holmes";

/// Result of executing an audit decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuditVerdict {
    /// Evidence handed to the controller (`None` when ignored).
    pub evidence: EvidenceGrade,
    /// Classification reward for the detective.
    pub reward: f64,
    /// Whether the target was truly guilty.
    pub guilty: bool,
}

/// The singleton internal-affairs detective.
#[derive(Debug, Clone)]
pub struct Detective {
    id: AgentId,
    config: DetectiveConfig,
    learner: DqnLearner,
    cases_solved: u32,
    cases_failed: u32,
    pending: Option<(Vec<f64>, usize)>,
}

impl Detective {
    /// Create a detective with a fresh policy.
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        config: DetectiveConfig,
        learning: LearningConfig,
        rng: &mut R,
    ) -> Self {
        Self {
            id,
            config,
            learner: DqnLearner::new(STATE_DIM, DetectiveAction::ALL.len(), learning, rng),
            cases_solved: 0,
            cases_failed: 0,
            pending: None,
        }
    }

    /// Agent identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Guilty officers escalated.
    pub const fn cases_solved(&self) -> u32 {
        self.cases_solved
    }

    /// Innocent officers escalated.
    pub const fn cases_failed(&self) -> u32 {
        self.cases_failed
    }

    /// Restore case counters (cold start).
    pub const fn set_case_counts(&mut self, solved: u32, failed: u32) {
        self.cases_solved = solved;
        self.cases_failed = failed;
    }

    /// The detective's learner.
    pub const fn learner(&self) -> &DqnLearner {
        &self.learner
    }

    /// The detective's learner, mutably.
    pub const fn learner_mut(&mut self) -> &mut DqnLearner {
        &mut self.learner
    }

    /// Replace the audit parameters (runtime tunable overrides).
    pub const fn set_config(&mut self, config: DetectiveConfig) {
        self.config = config;
    }

    /// Encode the target's observable profile.
    ///
    /// The last component is pure noise so that identical profiles do not
    /// always produce identical decisions.
    pub fn encode_state<R: Rng + ?Sized>(
        &self,
        target: &AgentProfile,
        alert_level: f64,
        rng: &mut R,
    ) -> Vec<f64> {
        // f64::min maps NaN to the bound.
        let noise = self.config.estimate_noise.abs().min(MAX_ESTIMATE_NOISE);
        let perturbation = rng.random_range(-noise..=noise);
        vec![
            ((target.corruption_score + perturbation) / 100.0).clamp(0.0, 1.0),
            log_scale(target.wealth),
            capped_ratio(target.times_caught, 5),
            alert_level,
            rng.random::<f64>(),
        ]
    }

    /// Choose whether to escalate the target.
    pub fn decide(
        &mut self,
        target: &AgentProfile,
        alert_level: f64,
        ctx: &mut EpisodeContext,
    ) -> DetectiveAction {
        let state = self.encode_state(target, alert_level, ctx.rng());
        let index = self.learner.select_action(&state, ctx.rng());
        self.pending = Some((state, index));
        DetectiveAction::from_index(index).unwrap_or(DetectiveAction::Ignore)
    }

    /// Score the decision against the target's true corruption and grade
    /// the evidence for an escalation.
    pub fn execute_logic(
        &mut self,
        action: DetectiveAction,
        target: &AgentProfile,
    ) -> AuditVerdict {
        let guilty = target.corruption_score > self.config.guilty_threshold;
        let reward = classification_reward(&self.config, action, target.corruption_score);
        let evidence = match action {
            DetectiveAction::Ignore => EvidenceGrade::None,
            DetectiveAction::Escalate => {
                if guilty {
                    self.cases_solved = self.cases_solved.saturating_add(1);
                } else {
                    self.cases_failed = self.cases_failed.saturating_add(1);
                }
                evidence_grade(target)
            }
        };
        AuditVerdict {
            evidence,
            reward,
            guilty,
        }
    }

    /// Learn from the last decision. Audits are single-step, so the target
    /// is the reward itself.
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

    /// Observable projection. The detective holds no wealth.
    pub const fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id,
            role: precinct_types::Role::Detective,
            corruption_score: 0.0,
            wealth: 0.0,
            times_caught: 0,
            loyalty: 100.0,
        }
    }
}

/// Classification reward for an audit decision.
pub fn classification_reward(
    config: &DetectiveConfig,
    action: DetectiveAction,
    true_corruption: f64,
) -> f64 {
    let guilty = true_corruption > config.guilty_threshold;
    match (action, guilty) {
        (DetectiveAction::Escalate, true) => config.solved_reward,
        (DetectiveAction::Escalate, false) => config.wrongful_reward,
        (DetectiveAction::Ignore, true) => config.missed_reward,
        (DetectiveAction::Ignore, false) => config.cleared_reward,
    }
}

/// Grade the case from corruption and capture history.
pub fn evidence_grade(target: &AgentProfile) -> EvidenceGrade {
    let score = f64::from(target.times_caught).mul_add(15.0, target.corruption_score);
    if score >= 70.0 {
        EvidenceGrade::Strong
    } else if score >= 40.0 {
        EvidenceGrade::Moderate
    } else {
        EvidenceGrade::Weak
    }
}

#[cfg(test)]
mod tests {
    use precinct_types::Role;

    use super::*;

    fn target(corruption_score: f64, times_caught: u32) -> AgentProfile {
        AgentProfile {
            id: AgentId(3),
            role: Role::CorruptOfficer,
            corruption_score,
            wealth: 2_000.0,
            times_caught,
            loyalty: 50.0,
        }
    }

    fn detective(ctx: &mut EpisodeContext) -> Detective {
        Detective::new(
            AgentId(1),
            DetectiveConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        )
    }

    #[test]
    fn ignoring_a_guilty_officer_is_a_miss() {
        let config = DetectiveConfig::default();
        let reward = classification_reward(&config, DetectiveAction::Ignore, 80.0);
        assert!((reward - config.missed_reward).abs() < f64::EPSILON);
        assert!(reward < 0.0);
    }

    #[test]
    fn ignoring_an_innocent_officer_is_correct() {
        let config = DetectiveConfig::default();
        let reward = classification_reward(&config, DetectiveAction::Ignore, 10.0);
        assert!((reward - config.cleared_reward).abs() < f64::EPSILON);
        assert!(reward > 0.0);
    }

    #[test]
    fn escalations_update_case_counters() {
        let mut ctx = EpisodeContext::seeded(4);
        let mut det = detective(&mut ctx);
        let solved = det.execute_logic(DetectiveAction::Escalate, &target(90.0, 0));
        assert!(solved.guilty);
        assert!(solved.reward > 0.0);
        let failed = det.execute_logic(DetectiveAction::Escalate, &target(20.0, 0));
        assert!(!failed.guilty);
        assert!(failed.reward < 0.0);
        assert_eq!(det.cases_solved(), 1);
        assert_eq!(det.cases_failed(), 1);
    }

    #[test]
    fn ignore_hands_over_no_evidence() {
        let mut ctx = EpisodeContext::seeded(4);
        let mut det = detective(&mut ctx);
        let verdict = det.execute_logic(DetectiveAction::Ignore, &target(90.0, 3));
        assert_eq!(verdict.evidence, EvidenceGrade::None);
        assert_eq!(det.cases_solved(), 0);
    }

    #[test]
    fn evidence_grades_scale_with_history() {
        assert_eq!(evidence_grade(&target(75.0, 0)), EvidenceGrade::Strong);
        assert_eq!(evidence_grade(&target(30.0, 1)), EvidenceGrade::Moderate);
        assert_eq!(evidence_grade(&target(10.0, 0)), EvidenceGrade::Weak);
    }

    #[test]
    fn oversized_noise_is_bounded_when_sampling() {
        let mut ctx = EpisodeContext::seeded(4);
        let mut det = detective(&mut ctx);
        for noise in [f64::MAX, f64::INFINITY, f64::NAN] {
            det.set_config(DetectiveConfig {
                estimate_noise: noise,
                ..DetectiveConfig::default()
            });
            let state = det.encode_state(&target(50.0, 0), 0.0, ctx.rng());
            assert!((0.0..=1.0).contains(&state[0]));
        }
    }

    #[test]
    fn state_is_clamped_and_sized() {
        let mut ctx = EpisodeContext::seeded(4);
        let det = detective(&mut ctx);
        for _ in 0..100 {
            let state = det.encode_state(&target(99.0, 9), 0.3, ctx.rng());
            assert_eq!(state.len(), STATE_DIM);
            assert!(state.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn learn_consumes_pending_decision() {
        let mut ctx = EpisodeContext::seeded(4);
        let mut det = detective(&mut ctx);
        det.decide(&target(60.0, 0), 0.0, &mut ctx);
        assert!(det.learn(100.0, &mut ctx).is_none());
        assert_eq!(det.learner().memory_len(), 1);
        assert!(det.learn(100.0, &mut ctx).is_none());
        assert_eq!(det.learner().memory_len(), 1);
    }
}
