//! The roster: every agent on the force, keyed by id.
//!
//! The roster is partitioned into exactly one controller, exactly one
//! detective, a corrupt-officer group whose size is preserved by
//! replacement, and a fixed honest-officer group. Ids only grow: a new
//! agent is always registered under the current maximum plus one.

use std::collections::BTreeMap;

use precinct_agents::{
    Agent, AgentError, Controller, CorruptOfficer, Detective, HonestOfficer,
};
use precinct_types::{AgentId, AgentStatus, EpisodeContext, Personality, Role, RosterRow};
use rand::Rng;

use crate::config::SimulationConfig;

/// Id of the controller in a fresh roster.
pub const CONTROLLER_ID: AgentId = AgentId(0);

/// Id of the detective in a fresh roster.
pub const DETECTIVE_ID: AgentId = AgentId(1);

/// Spread of an honest officer's starting loyalty around the configured integrity.
const LOYALTY_SPREAD: f64 = 5.0;

/// Errors raised when rebuilding a roster from registry rows.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// No active row for a singleton role.
    #[error("registry has no active {0:?}")]
    MissingRole(Role),

    /// More than one active row for a singleton role.
    #[error("registry has more than one active {0:?}")]
    DuplicateRole(Role),

    /// Two active rows share an id.
    #[error("registry has duplicate id {0}")]
    DuplicateId(AgentId),

    /// No officers at all.
    #[error("registry has no active officers")]
    NoOfficers,

    /// A row could not be turned back into an agent.
    #[error("agent row rejected: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}

/// Every active agent, partitioned by role.
#[derive(Debug, Clone)]
pub struct Roster {
    agents: BTreeMap<AgentId, Agent>,
    controller: AgentId,
    detective: AgentId,
    corrupt: Vec<AgentId>,
    honest: Vec<AgentId>,
}

impl Roster {
    /// Build a fresh roster: controller `0`, detective `1`, then the corrupt
    /// officers, then the honest officers.
    pub fn fresh(config: &SimulationConfig, ctx: &mut EpisodeContext) -> Self {
        let mut agents = BTreeMap::new();
        agents.insert(
            CONTROLLER_ID,
            Agent::Controller(Controller::new(
                CONTROLLER_ID,
                config.controller,
                config.learning,
                ctx.rng(),
            )),
        );
        agents.insert(
            DETECTIVE_ID,
            Agent::Detective(Detective::new(
                DETECTIVE_ID,
                config.detective,
                config.learning,
                ctx.rng(),
            )),
        );

        let roster = &config.roster;
        let mut next = DETECTIVE_ID.into_inner();
        let mut corrupt = Vec::new();
        for (i, personality) in Personality::ALL
            .iter()
            .cycle()
            .take(usize::try_from(roster.corrupt_officers).unwrap_or_default())
            .enumerate()
        {
            next = next.saturating_add(1);
            let id = AgentId(next);
            let corruption = ctx
                .rng()
                .random_range(roster.initial_corruption_min..=roster.initial_corruption_max);
            tracing::debug!(
                %id,
                slot = i,
                personality = personality.label(),
                corruption,
                "Recruited corrupt officer"
            );
            agents.insert(
                id,
                Agent::Corrupt(CorruptOfficer::new(
                    id,
                    *personality,
                    corruption,
                    config.officer,
                    config.learning,
                    ctx.rng(),
                )),
            );
            corrupt.push(id);
        }

        let mut honest = Vec::new();
        for _ in 0..roster.honest_officers {
            next = next.saturating_add(1);
            let id = AgentId(next);
            let low = roster.honest_integrity - LOYALTY_SPREAD;
            let high = roster.honest_integrity + LOYALTY_SPREAD;
            let loyalty = ctx.rng().random_range(low..=high);
            agents.insert(
                id,
                Agent::Honest(HonestOfficer::new(
                    id,
                    config.officer.honest_offer_threshold,
                    loyalty,
                )),
            );
            honest.push(id);
        }

        tracing::info!(
            corrupt = corrupt.len(),
            honest = honest.len(),
            "Fresh roster initialised"
        );

        Self {
            agents,
            controller: CONTROLLER_ID,
            detective: DETECTIVE_ID,
            corrupt,
            honest,
        }
    }

    /// Rebuild a roster from active registry rows. Learned policies start
    /// fresh; the caller restores them from the learned-state store.
    ///
    /// # Errors
    ///
    /// Returns a [`RosterError`] if the rows do not describe a complete
    /// roster.
    pub fn from_rows(
        rows: &[RosterRow],
        config: &SimulationConfig,
        ctx: &mut EpisodeContext,
    ) -> Result<Self, RosterError> {
        let mut agents = BTreeMap::new();
        let mut controller = None;
        let mut detective = None;
        let mut corrupt = Vec::new();
        let mut honest = Vec::new();

        for row in rows.iter().filter(|r| r.status == AgentStatus::Active) {
            let agent = match row.role {
                Role::Controller => {
                    if controller.replace(row.id).is_some() {
                        return Err(RosterError::DuplicateRole(Role::Controller));
                    }
                    let mut chief =
                        Controller::new(row.id, config.controller, config.learning, ctx.rng());
                    chief.set_wealth(row.total_money_earned);
                    Agent::Controller(chief)
                }
                Role::Detective => {
                    if detective.replace(row.id).is_some() {
                        return Err(RosterError::DuplicateRole(Role::Detective));
                    }
                    let mut det =
                        Detective::new(row.id, config.detective, config.learning, ctx.rng());
                    det.set_case_counts(row.times_bribed, row.times_caught);
                    Agent::Detective(det)
                }
                Role::CorruptOfficer => {
                    corrupt.push(row.id);
                    Agent::Corrupt(CorruptOfficer::from_row(
                        row,
                        config.officer,
                        config.learning,
                        ctx.rng(),
                    )?)
                }
                Role::HonestOfficer => {
                    honest.push(row.id);
                    Agent::Honest(HonestOfficer::from_row(
                        row,
                        config.officer.honest_offer_threshold,
                    )?)
                }
            };
            if agents.insert(row.id, agent).is_some() {
                return Err(RosterError::DuplicateId(row.id));
            }
        }

        let controller = controller.ok_or(RosterError::MissingRole(Role::Controller))?;
        let detective = detective.ok_or(RosterError::MissingRole(Role::Detective))?;
        if corrupt.is_empty() && honest.is_empty() {
            return Err(RosterError::NoOfficers);
        }
        corrupt.sort_unstable();
        honest.sort_unstable();

        Ok(Self {
            agents,
            controller,
            detective,
            corrupt,
            honest,
        })
    }

    /// Number of agents on the roster.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the roster is empty. A well-formed roster never is.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Whether `id` is on the roster.
    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    /// Every id, ascending.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    /// Every agent, by ascending id.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Every agent mutably, by ascending id.
    pub fn agents_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    /// Id of the controller.
    pub const fn controller_id(&self) -> AgentId {
        self.controller
    }

    /// Id of the detective.
    pub const fn detective_id(&self) -> AgentId {
        self.detective
    }

    /// Corrupt officer ids in registration order.
    pub fn corrupt_ids(&self) -> &[AgentId] {
        &self.corrupt
    }

    /// Honest officer ids.
    pub fn honest_ids(&self) -> &[AgentId] {
        &self.honest
    }

    /// The combined officer pool: corrupt officers first, then honest ones.
    pub fn officer_ids(&self) -> Vec<AgentId> {
        self.corrupt.iter().chain(&self.honest).copied().collect()
    }

    /// The controller.
    pub fn controller(&self) -> Option<&Controller> {
        match self.agents.get(&self.controller) {
            Some(Agent::Controller(c)) => Some(c),
            _ => None,
        }
    }

    /// The controller, mutably.
    pub fn controller_mut(&mut self) -> Option<&mut Controller> {
        match self.agents.get_mut(&self.controller) {
            Some(Agent::Controller(c)) => Some(c),
            _ => None,
        }
    }

    /// The detective.
    pub fn detective(&self) -> Option<&Detective> {
        match self.agents.get(&self.detective) {
            Some(Agent::Detective(d)) => Some(d),
            _ => None,
        }
    }

    /// The detective, mutably.
    pub fn detective_mut(&mut self) -> Option<&mut Detective> {
        match self.agents.get_mut(&self.detective) {
            Some(Agent::Detective(d)) => Some(d),
            _ => None,
        }
    }

    /// Highest id on the roster.
    pub fn max_id(&self) -> Option<AgentId> {
        self.agents.keys().next_back().copied()
    }

    /// The id the next spawned agent receives, or `None` if the id space is
    /// exhausted.
    pub fn next_id(&self) -> Option<AgentId> {
        self.max_id().map_or(Some(AgentId(0)), AgentId::successor)
    }

    /// Mean corruption score across corrupt officers (0 when there are none).
    pub fn mean_corruption(&self) -> f64 {
        mean(self.corrupt_profiles().map(|p| p.corruption_score))
    }

    /// Mean wealth across corrupt officers (0 when there are none).
    pub fn mean_wealth(&self) -> f64 {
        mean(self.corrupt_profiles().map(|p| p.wealth))
    }

    /// Controller wealth from kickbacks.
    pub fn controller_wealth(&self) -> f64 {
        self.controller().map_or(0.0, Controller::wealth)
    }

    fn corrupt_profiles(&self) -> impl Iterator<Item = precinct_types::AgentProfile> + '_ {
        self.corrupt
            .iter()
            .filter_map(|id| self.agents.get(id))
            .map(Agent::profile)
    }

    /// Swap a corrupt officer for its replacement: `old` leaves the roster
    /// and the corrupt group, `new` joins both at the end.
    ///
    /// Returns the removed agent, or `None` (roster unchanged) if `old` is
    /// not a corrupt officer or `new`'s id is taken.
    pub fn replace(&mut self, old: AgentId, new: Agent) -> Option<Agent> {
        let position = self.corrupt.iter().position(|id| *id == old)?;
        let new_id = new.id();
        if self.agents.contains_key(&new_id) || new.role() != Role::CorruptOfficer {
            return None;
        }
        let removed = self.agents.remove(&old)?;
        self.corrupt.remove(position);
        self.agents.insert(new_id, new);
        self.corrupt.push(new_id);
        Some(removed)
    }

    /// Registry rows for every agent on the roster.
    pub fn rows(&self) -> Vec<RosterRow> {
        self.agents
            .values()
            .map(|a| a.roster_row(AgentStatus::Active))
            .collect()
    }

    /// Push a changed configuration into every live agent.
    pub fn apply_config(&mut self, config: &SimulationConfig) {
        for agent in self.agents.values_mut() {
            match agent {
                Agent::Controller(c) => c.set_config(config.controller),
                Agent::Detective(d) => d.set_config(config.detective),
                Agent::Corrupt(o) => o.set_stats(config.officer),
                Agent::Honest(o) => o.set_offer_threshold(config.officer.honest_offer_threshold),
            }
            if let Some(learner) = agent.learner_mut() {
                learner.reconfigure(config.learning);
            }
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), v| {
        (sum + v, count.saturating_add(1))
    });
    if count == 0 {
        0.0
    } else {
        sum / f64::from(count)
    }
}
