//! The tagged agent variant and the officer capability set.

use chrono::Utc;
use precinct_types::{
    AgentId, AgentProfile, AgentStatus, ControllerAction, EpisodeContext, OfficerAction, Outcome,
    Role, RosterRow, Scenario,
};

use crate::config::ControllerConfig;
use crate::controller::{CONTROLLER_NAME, Controller};
use crate::corrupt::CorruptOfficer;
use crate::detective::{DETECTIVE_NAME, Detective};
use crate::honest::HonestOfficer;
use crate::learning::DqnLearner;

/// What the step loop needs from whoever walks the beat.
pub trait Officer {
    /// Agent identifier.
    fn id(&self) -> AgentId;

    /// Choose an action for the scenario.
    fn decide(&mut self, scenario: &Scenario, ctx: &mut EpisodeContext) -> OfficerAction;

    /// Learn from the reward of the last decision. `next` is the follow-up
    /// scenario of a continuing chain, or `None` when the step ended.
    /// Returns the training loss when an update ran.
    fn learn(
        &mut self,
        reward: f64,
        next: Option<&Scenario>,
        ctx: &mut EpisodeContext,
    ) -> Option<f64>;

    /// Move the officer's stats after an outcome. `value` is the offer
    /// actually paid (zero when nothing changed hands).
    fn update_stats(&mut self, outcome: Outcome, value: u64, ctx: &EpisodeContext);

    /// Observable projection.
    fn profile(&self) -> AgentProfile;
}

/// Every member of the roster.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Agent {
    /// The chief.
    Controller(Controller),
    /// The internal-affairs detective.
    Detective(Detective),
    /// A learned corrupt officer.
    Corrupt(CorruptOfficer),
    /// A rule-based honest officer.
    Honest(HonestOfficer),
}

impl Agent {
    /// Agent identifier.
    pub fn id(&self) -> AgentId {
        match self {
            Self::Controller(c) => c.id(),
            Self::Detective(d) => d.id(),
            Self::Corrupt(o) => Officer::id(o),
            Self::Honest(o) => Officer::id(o),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::Controller(_) => CONTROLLER_NAME,
            Self::Detective(_) => DETECTIVE_NAME,
            Self::Corrupt(o) => o.name(),
            Self::Honest(o) => o.name(),
        }
    }

    /// Role of the variant.
    pub const fn role(&self) -> Role {
        match self {
            Self::Controller(_) => Role::Controller,
            Self::Detective(_) => Role::Detective,
            Self::Corrupt(_) => Role::CorruptOfficer,
            Self::Honest(_) => Role::HonestOfficer,
        }
    }

    /// Observable projection.
    pub fn profile(&self) -> AgentProfile {
        match self {
            Self::Controller(c) => c.profile(),
            Self::Detective(d) => d.profile(),
            Self::Corrupt(o) => o.profile(),
            Self::Honest(o) => o.profile(),
        }
    }

    /// The officer capability set, for the two officer variants.
    pub fn as_officer_mut(&mut self) -> Option<&mut dyn Officer> {
        match self {
            Self::Corrupt(o) => Some(o),
            Self::Honest(o) => Some(o),
            Self::Controller(_) | Self::Detective(_) => None,
        }
    }

    /// The learner of a learned variant.
    pub const fn learner(&self) -> Option<&DqnLearner> {
        match self {
            Self::Controller(c) => Some(c.learner()),
            Self::Detective(d) => Some(d.learner()),
            Self::Corrupt(o) => Some(o.learner()),
            Self::Honest(_) => None,
        }
    }

    /// The learner of a learned variant, mutably.
    pub const fn learner_mut(&mut self) -> Option<&mut DqnLearner> {
        match self {
            Self::Controller(c) => Some(c.learner_mut()),
            Self::Detective(d) => Some(d.learner_mut()),
            Self::Corrupt(o) => Some(o.learner_mut()),
            Self::Honest(_) => None,
        }
    }

    /// Registry row for this agent.
    pub fn roster_row(&self, status: AgentStatus) -> RosterRow {
        match self {
            Self::Corrupt(o) => o.roster_row(status),
            Self::Honest(o) => o.roster_row(status),
            Self::Controller(c) => RosterRow {
                id: c.id(),
                name: CONTROLLER_NAME.to_owned(),
                role: Role::Controller,
                rank: Role::Controller.rank().to_owned(),
                personality: None,
                corruption_score: 0.0,
                loyalty_score: 100.0,
                paranoia_level: 0.0,
                times_caught: 0,
                times_bribed: 0,
                total_money_earned: c.wealth(),
                last_caught_episode: None,
                status,
                updated_at: Utc::now(),
            },
            Self::Detective(d) => RosterRow {
                id: d.id(),
                name: DETECTIVE_NAME.to_owned(),
                role: Role::Detective,
                rank: Role::Detective.rank().to_owned(),
                personality: None,
                corruption_score: 0.0,
                loyalty_score: 100.0,
                paranoia_level: 0.0,
                times_caught: d.cases_failed(),
                times_bribed: d.cases_solved(),
                total_money_earned: 0.0,
                last_caught_episode: None,
                status,
                updated_at: Utc::now(),
            },
        }
    }

    /// Apply a non-lethal punishment to an officer.
    ///
    /// Returns `false` when nothing was applied: executions go through the
    /// lifecycle, and the chief and detective cannot be punished.
    pub fn punish(&mut self, action: ControllerAction, config: &ControllerConfig) -> bool {
        match (self, action) {
            (Self::Corrupt(o), ControllerAction::Fire) => {
                o.apply_dismissal(config.fire_corruption_penalty);
                true
            }
            (Self::Honest(o), ControllerAction::Fire) => {
                o.apply_dismissal();
                true
            }
            (Self::Corrupt(o), ControllerAction::Warning) => {
                o.apply_warning();
                true
            }
            (Self::Honest(o), ControllerAction::Warning) => {
                o.apply_warning();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use precinct_types::Personality;

    use super::*;
    use crate::config::{DetectiveConfig, OfficerConfig};
    use crate::learning::LearningConfig;

    fn corrupt(ctx: &mut EpisodeContext) -> Agent {
        Agent::Corrupt(CorruptOfficer::new(
            AgentId(3),
            Personality::Cautious,
            80.0,
            OfficerConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        ))
    }

    #[test]
    fn only_officers_expose_the_officer_capability() {
        let mut ctx = EpisodeContext::seeded(2);
        let mut chief = Agent::Controller(Controller::new(
            AgentId(0),
            ControllerConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        ));
        let mut det = Agent::Detective(Detective::new(
            AgentId(1),
            DetectiveConfig::default(),
            LearningConfig::default(),
            ctx.rng(),
        ));
        let mut cop = corrupt(&mut ctx);
        let mut honest = Agent::Honest(HonestOfficer::new(AgentId(7), 50, 90.0));
        assert!(chief.as_officer_mut().is_none());
        assert!(det.as_officer_mut().is_none());
        assert!(cop.as_officer_mut().is_some());
        assert!(honest.as_officer_mut().is_some());
        assert!(honest.learner().is_none());
        assert_eq!(chief.name(), "Chief_Justice");
        assert_eq!(det.name(), "Det_Holmes");
        assert_eq!(cop.name(), "Officer_3");
    }

    #[test]
    fn dismissal_zeroes_wealth_and_cuts_corruption() {
        let mut ctx = EpisodeContext::seeded(2);
        let mut cop = corrupt(&mut ctx);
        if let Some(officer) = cop.as_officer_mut() {
            officer.update_stats(Outcome::Success, 900, &ctx);
        }
        assert!(cop.punish(ControllerAction::Fire, &ControllerConfig::default()));
        let profile = cop.profile();
        assert!(profile.wealth.abs() < f64::EPSILON);
        assert!((profile.corruption_score - 32.0).abs() < 1e-12);
        assert_eq!(profile.times_caught, 1);
    }

    #[test]
    fn warning_only_counts_a_capture() {
        let mut ctx = EpisodeContext::seeded(2);
        let mut cop = corrupt(&mut ctx);
        assert!(cop.punish(ControllerAction::Warning, &ControllerConfig::default()));
        let profile = cop.profile();
        assert!((profile.corruption_score - 80.0).abs() < f64::EPSILON);
        assert_eq!(profile.times_caught, 1);
    }

    #[test]
    fn execution_is_not_a_punishment_here() {
        let mut ctx = EpisodeContext::seeded(2);
        let mut cop = corrupt(&mut ctx);
        assert!(!cop.punish(ControllerAction::Execute, &ControllerConfig::default()));
        assert_eq!(cop.profile().times_caught, 0);
    }
}
