//! The learned corrupt officer.
//!
//! Chooses among all 16 officer actions with an epsilon-greedy policy over
//! a 14-feature view of the scenario and of its own history. Its stats move
//! with what it gets away with: undetected corrupt successes make it richer
//! and more corrupt, getting caught makes it poorer in standing, more
//! paranoid, and less loyal.

use chrono::Utc;
use precinct_types::{
    AgentId, AgentProfile, AgentStatus, EpisodeContext, OfficerAction, Outcome, Personality, Role,
    RosterRow, Scenario,
};
use rand::Rng;

use crate::agent::Officer;
use crate::config::OfficerConfig;
use crate::error::AgentError;
use crate::features::{capped_ratio, capture_recency, currency, flag, log_scale};
use crate::learning::{DqnLearner, LearningConfig, Transition};

/// Length of the corrupt officer's state vector.
pub const STATE_DIM: usize = 14;

/// Loyalty a new corrupt officer starts with.
const STARTING_LOYALTY: f64 = 100.0;

/// A corrupt officer and its policy.
#[derive(Debug, Clone)]
pub struct CorruptOfficer {
    id: AgentId,
    name: String,
    personality: Personality,
    corruption_score: f64,
    loyalty_score: f64,
    paranoia_level: f64,
    times_caught: u32,
    times_bribed: u32,
    wealth: f64,
    last_caught_episode: Option<u64>,
    stats: OfficerConfig,
    learner: DqnLearner,
    pending: Option<(Vec<f64>, usize)>,
}

impl CorruptOfficer {
    /// Create an officer with a fresh policy.
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        personality: Personality,
        corruption_score: f64,
        stats: OfficerConfig,
        learning: LearningConfig,
        rng: &mut R,
    ) -> Self {
        Self {
            id,
            name: format!("Officer_{id}"),
            personality,
            corruption_score: corruption_score.clamp(0.0, 100.0),
            loyalty_score: STARTING_LOYALTY,
            paranoia_level: starting_paranoia(personality),
            times_caught: 0,
            times_bribed: 0,
            wealth: 0.0,
            last_caught_episode: None,
            stats,
            learner: DqnLearner::new(STATE_DIM, OfficerAction::COUNT, learning, rng),
            pending: None,
        }
    }

    /// Rebuild an officer from its registry row with a fresh policy.
    pub fn from_row<R: Rng + ?Sized>(
        row: &RosterRow,
        stats: OfficerConfig,
        learning: LearningConfig,
        rng: &mut R,
    ) -> Result<Self, AgentError> {
        if row.role != Role::CorruptOfficer {
            return Err(AgentError::RoleMismatch {
                id: row.id,
                role: row.role,
                expected: Role::CorruptOfficer,
            });
        }
        let personality = row
            .personality
            .ok_or(AgentError::MissingPersonality(row.id))?;
        let mut officer =
            Self::new(row.id, personality, row.corruption_score, stats, learning, rng);
        officer.name.clone_from(&row.name);
        officer.loyalty_score = row.loyalty_score.clamp(0.0, 100.0);
        officer.paranoia_level = row.paranoia_level.clamp(0.0, 1.0);
        officer.times_caught = row.times_caught;
        officer.times_bribed = row.times_bribed;
        officer.wealth = row.total_money_earned;
        officer.last_caught_episode = row.last_caught_episode;
        Ok(officer)
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Behavioural flavour.
    pub const fn personality(&self) -> Personality {
        self.personality
    }

    /// Corruption score in `[0, 100]`.
    pub const fn corruption_score(&self) -> f64 {
        self.corruption_score
    }

    /// Paranoia in `[0, 1]`.
    pub const fn paranoia_level(&self) -> f64 {
        self.paranoia_level
    }

    /// Loyalty in `[0, 100]`.
    pub const fn loyalty_score(&self) -> f64 {
        self.loyalty_score
    }

    /// Accumulated wealth.
    pub const fn wealth(&self) -> f64 {
        self.wealth
    }

    /// Times caught or punished.
    pub const fn times_caught(&self) -> u32 {
        self.times_caught
    }

    /// Corrupt acts committed.
    pub const fn times_bribed(&self) -> u32 {
        self.times_bribed
    }

    /// Episode of the most recent capture.
    pub const fn last_caught_episode(&self) -> Option<u64> {
        self.last_caught_episode
    }

    /// The officer's learner.
    pub const fn learner(&self) -> &DqnLearner {
        &self.learner
    }

    /// The officer's learner, mutably.
    pub const fn learner_mut(&mut self) -> &mut DqnLearner {
        &mut self.learner
    }

    /// Replace the stat dynamics (runtime tunable overrides).
    pub const fn set_stats(&mut self, stats: OfficerConfig) {
        self.stats = stats;
    }

    /// Hand over a share of the officer's wealth to the chief.
    pub fn pay_kickback(&mut self, amount: f64) {
        self.wealth -= amount;
    }

    /// Zero wealth, knock `penalty` points off corruption, and count a capture.
    pub fn apply_dismissal(&mut self, penalty: f64) {
        self.wealth = 0.0;
        self.corruption_score = (self.corruption_score - penalty).max(0.0);
        self.times_caught = self.times_caught.saturating_add(1);
    }

    /// Count a warning on file.
    pub const fn apply_warning(&mut self) {
        self.times_caught = self.times_caught.saturating_add(1);
    }

    /// Encode a scenario and the officer's own history.
    pub fn encode_state(&self, s: &Scenario, episode: u64) -> Vec<f64> {
        vec![
            (f64::from(s.witnesses) / 5.0).min(1.0),
            flag(s.detective_nearby),
            log_scale(currency(s.offer)),
            f64::from(s.severity) / 10.0,
            s.alert_level,
            s.evidence_strength,
            flag(s.has_warrant),
            flag(s.gang_affiliated),
            log_scale(currency(s.seized_value)),
            s.suspect_aggression,
            capped_ratio(self.times_caught, 5),
            log_scale(self.wealth),
            capture_recency(self.last_caught_episode, episode),
            (self.paranoia_level.mul_add(100.0, self.corruption_score) / 200.0).min(1.0),
        ]
    }

    /// Registry row for this officer.
    pub fn roster_row(&self, status: AgentStatus) -> RosterRow {
        RosterRow {
            id: self.id,
            name: self.name.clone(),
            role: Role::CorruptOfficer,
            rank: Role::CorruptOfficer.rank().to_owned(),
            personality: Some(self.personality),
            corruption_score: self.corruption_score,
            loyalty_score: self.loyalty_score,
            paranoia_level: self.paranoia_level,
            times_caught: self.times_caught,
            times_bribed: self.times_bribed,
            total_money_earned: self.wealth,
            last_caught_episode: self.last_caught_episode,
            status,
            updated_at: Utc::now(),
        }
    }
}

impl Officer for CorruptOfficer {
    fn id(&self) -> AgentId {
        self.id
    }

    fn decide(&mut self, scenario: &Scenario, ctx: &mut EpisodeContext) -> OfficerAction {
        let state = self.encode_state(scenario, ctx.episode());
        let index = self.learner.select_action(&state, ctx.rng());
        self.pending = Some((state, index));
        OfficerAction::from_index(index).unwrap_or(OfficerAction::Investigate)
    }

    fn learn(
        &mut self,
        reward: f64,
        next: Option<&Scenario>,
        ctx: &mut EpisodeContext,
    ) -> Option<f64> {
        let (state, action) = self.pending.take()?;
        let next_state = next.map(|s| self.encode_state(s, ctx.episode()));
        self.learner.remember(Transition {
            state,
            action,
            next_state,
            reward,
        });
        self.learner.learn(ctx.rng())
    }

    fn update_stats(&mut self, outcome: Outcome, value: u64, ctx: &EpisodeContext) {
        if outcome.is_corrupt_success() {
            self.times_bribed = self.times_bribed.saturating_add(1);
            let amount = if value > 0 {
                value
            } else {
                self.stats.default_bribe
            };
            self.wealth += currency(amount);
            self.corruption_score = (self.corruption_score + self.stats.corruption_gain).min(100.0);
        } else if outcome == Outcome::Caught {
            self.corruption_score = (self.corruption_score - self.stats.corruption_loss).max(0.0);
            self.paranoia_level = (self.paranoia_level + self.stats.paranoia_gain).min(1.0);
            self.loyalty_score = (self.loyalty_score - self.stats.loyalty_loss).max(0.0);
            self.times_caught = self.times_caught.saturating_add(1);
            self.last_caught_episode = Some(ctx.episode());
        }
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id,
            role: Role::CorruptOfficer,
            corruption_score: self.corruption_score,
            wealth: self.wealth,
            times_caught: self.times_caught,
            loyalty: self.loyalty_score,
        }
    }
}

const fn starting_paranoia(personality: Personality) -> f64 {
    match personality {
        Personality::Greedy => 0.0,
        Personality::Cautious => 0.1,
        Personality::Paranoid => 0.3,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use precinct_types::CrimeType;

    use super::*;

    fn officer(ctx: &mut EpisodeContext) -> CorruptOfficer {
        CorruptOfficer::new(
            AgentId(2),
            Personality::Greedy,
            70.0,
            OfficerConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        )
    }

    #[test]
    fn state_vector_has_fourteen_normalised_features() {
        let mut ctx = EpisodeContext::seeded(1);
        let cop = officer(&mut ctx);
        let mut scenario = Scenario::quiet(CrimeType::Murder);
        scenario.offer = 100_000_000;
        scenario.witnesses = 4;
        let state = cop.encode_state(&scenario, 0);
        assert_eq!(state.len(), STATE_DIM);
        assert!((state.first().copied().unwrap() - 0.8).abs() < 1e-12);
        assert!((state.get(2).copied().unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(state.iter().all(|v| (0.0..=1.0).contains(v)));
        // Suspicion: (70 + 0) / 200.
        assert!((state.get(13).copied().unwrap() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn recruits_start_fully_loyal() {
        let mut ctx = EpisodeContext::seeded(1);
        let cop = officer(&mut ctx);
        assert!((cop.loyalty_score() - 100.0).abs() < f64::EPSILON);
        assert!((cop.profile().loyalty - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn corrupt_success_pays_offer_or_default() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        cop.update_stats(Outcome::Success, 400, &ctx);
        assert!((cop.wealth() - 400.0).abs() < f64::EPSILON);
        cop.update_stats(Outcome::StealSuccess, 0, &ctx);
        assert!((cop.wealth() - 1_400.0).abs() < f64::EPSILON);
        assert_eq!(cop.times_bribed(), 2);
        assert!((cop.corruption_score() - 74.0).abs() < 1e-12);
    }

    #[test]
    fn corruption_is_capped_at_one_hundred() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        for _ in 0..50 {
            cop.update_stats(Outcome::Success, 1, &ctx);
        }
        assert!((cop.corruption_score() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn caught_updates_every_penalty_stat() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        ctx.advance();
        ctx.advance();
        cop.update_stats(Outcome::Caught, 0, &ctx);
        assert!((cop.corruption_score() - 60.0).abs() < 1e-12);
        assert!((cop.paranoia_level() - 0.2).abs() < 1e-12);
        assert!((cop.loyalty_score() - 95.0).abs() < 1e-12);
        assert_eq!(cop.times_caught(), 1);
        assert_eq!(cop.last_caught_episode(), Some(2));
    }

    #[test]
    fn lawful_outcomes_leave_stats_alone() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        cop.update_stats(Outcome::ArrestSuccess, 500, &ctx);
        assert!(cop.wealth().abs() < f64::EPSILON);
        assert_eq!(cop.times_bribed(), 0);
    }

    #[test]
    fn learn_without_decision_is_a_no_op() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        assert!(cop.learn(1.0, None, &mut ctx).is_none());
        assert_eq!(cop.learner().memory_len(), 0);
    }

    #[test]
    fn decide_then_learn_stores_one_transition() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        let scenario = Scenario::quiet(CrimeType::Burglary);
        let _ = cop.decide(&scenario, &mut ctx);
        cop.learn(10.0, Some(&scenario), &mut ctx);
        assert_eq!(cop.learner().memory_len(), 1);
        assert!(cop.learner().epsilon() < 1.0);
    }

    #[test]
    fn row_round_trip_keeps_stats() {
        let mut ctx = EpisodeContext::seeded(1);
        let mut cop = officer(&mut ctx);
        cop.update_stats(Outcome::Caught, 0, &ctx);
        let row = cop.roster_row(AgentStatus::Active);
        let rebuilt = CorruptOfficer::from_row(
            &row,
            OfficerConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        )
        .unwrap();
        assert_eq!(rebuilt.profile(), cop.profile());
        assert_eq!(rebuilt.name(), "Officer_2");
    }
}
