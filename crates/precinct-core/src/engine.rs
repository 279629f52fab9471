//! The episode orchestrator.
//!
//! [`Simulation`] owns the roster, the environment, the episode context,
//! and both stores. One call to [`Simulation::step`] runs one episode
//! start-to-finish:
//!
//! 1. Advance the episode counter and decay the global alert level
//! 2. Pick one officer uniformly from the corrupt and honest groups
//! 3. Generate a scenario and run up to `max_chain` decide/resolve rounds
//! 4. Score each round, update the officer's stats, route kickbacks, learn
//! 5. Every `inspection_frequency` episodes, run the hierarchy pass
//! 6. Persist history, investigations, roster changes, and episode stats
//!
//! Persistence failures are logged and never abort a step. A [`StepError`]
//! means the roster itself is broken and the loop must halt.

use chrono::Utc;
use precinct_agents::features::currency;
use precinct_agents::{Agent, Officer};
use precinct_db::{BrainKey, BrainStore, PersistenceError, SimulationStore};
use precinct_types::{
    AgentId, AgentStatus, EpisodeContext, EpisodeStatsRow, ExecutionReason, HistoryRow,
    InvestigationRow, OfficerAction, Outcome, Role, RunId, Scenario,
};
use precinct_world::Environment;
use rand::seq::IndexedRandom;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SimulationConfig};
use crate::hierarchy::{self, Audit, HierarchyError};
use crate::lifecycle::{self, LifecycleError, Replacement};
use crate::rewards::{officer_reward, outcome_value};
use crate::roster::Roster;
use crate::tunables;

/// Errors that halt the episode loop.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Neither officer group has a member left.
    #[error("roster has no officers")]
    NoOfficers,

    /// An id the step was working with vanished from the roster.
    #[error("agent {0} is not on the roster")]
    MissingAgent(AgentId),

    /// The picked agent cannot act on a scenario.
    #[error("agent {0} is not an officer")]
    NotAnOfficer(AgentId),

    /// The hierarchy pass could not run.
    #[error("hierarchy pass failed: {source}")]
    Hierarchy {
        /// The underlying hierarchy error.
        #[from]
        source: HierarchyError,
    },
}

/// One decide/resolve round inside an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// The action taken.
    pub action: OfficerAction,
    /// What it produced.
    pub outcome: Outcome,
    /// Reward credited for it.
    pub reward: f64,
    /// Training loss, if the officer learns and had a full batch.
    pub loss: Option<f64>,
}

/// Everything one episode did.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Global episode number.
    pub episode: u64,
    /// Episodes run in this session, including this one.
    pub session_episode: u64,
    /// The officer who acted.
    pub officer: AgentId,
    /// Its role.
    pub role: Role,
    /// The scenario as it stood after the last round.
    pub scenario: Scenario,
    /// Every round, in order.
    pub resolutions: Vec<Resolved>,
    /// Sum of the round rewards.
    pub reward: f64,
    /// Total routed to the controller.
    pub kickback: f64,
    /// Hierarchy audits, empty outside inspection episodes.
    pub audits: Vec<Audit>,
    /// Aggregate stats emitted for the episode.
    pub stats: EpisodeStatsRow,
}

impl StepReport {
    /// Outcome of the final round.
    pub fn final_outcome(&self) -> Option<Outcome> {
        self.resolutions.last().map(|r| r.outcome)
    }

    /// Whether a hierarchy pass ran.
    pub fn inspected(&self) -> bool {
        !self.audits.is_empty()
    }
}

#[derive(Debug, Default)]
struct Chain {
    resolutions: Vec<Resolved>,
    reward: f64,
    kickback: f64,
}

/// The running simulation.
pub struct Simulation<S, B> {
    config: SimulationConfig,
    run_id: RunId,
    ctx: EpisodeContext,
    env: Environment,
    roster: Roster,
    alert_level: f64,
    session_episodes: u64,
    store: S,
    brains: B,
}

impl<S: SimulationStore, B: BrainStore> Simulation<S, B> {
    /// Start a fresh simulation from `config`, wiping both stores.
    pub fn new(config: SimulationConfig, store: S, brains: B) -> Self {
        let mut ctx = EpisodeContext::seeded(config.world.seed);
        let roster = Roster::fresh(&config, &mut ctx);
        let env = Environment::new(config.risk.clone());
        let mut sim = Self {
            config,
            run_id: RunId::new(),
            ctx,
            env,
            roster,
            alert_level: 0.0,
            session_episodes: 0,
            store,
            brains,
        };
        sim.wipe_and_register();
        info!(
            run_id = %sim.run_id,
            seed = sim.config.world.seed,
            agents = sim.roster.len(),
            "Fresh simulation initialized"
        );
        sim
    }

    /// Resume from the registry and learned-state store.
    ///
    /// Falls back to [`Simulation::new`] when there is no saved progress,
    /// no active rows, or the rows do not form a complete roster. Blobs
    /// that are missing or fail to load leave that agent with a fresh
    /// policy.
    pub fn open(config: SimulationConfig, store: S, brains: B) -> Self {
        let progress = store.progress().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read saved progress");
            None
        });
        let rows = store.active_roster().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read the registry");
            Vec::new()
        });

        let Some(episode) = progress.filter(|_| !rows.is_empty()) else {
            info!("No saved state, starting fresh");
            return Self::new(config, store, brains);
        };

        let mut ctx = EpisodeContext::resume(config.world.seed, episode);
        let roster = match Roster::from_rows(&rows, &config, &mut ctx) {
            Ok(roster) => roster,
            Err(e) => {
                warn!(error = %e, "Registry is unusable, starting fresh");
                return Self::new(config, store, brains);
            }
        };

        let env = Environment::new(config.risk.clone());
        let mut sim = Self {
            config,
            run_id: RunId::new(),
            ctx,
            env,
            roster,
            alert_level: 0.0,
            session_episodes: 0,
            store,
            brains,
        };
        let restored = sim.restore_brains();
        info!(
            run_id = %sim.run_id,
            episode,
            agents = sim.roster.len(),
            restored,
            "Simulation resumed"
        );
        sim
    }

    /// Run one episode.
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] if the roster cannot support an episode.
    pub fn step(&mut self) -> Result<StepReport, StepError> {
        let episode = self.ctx.advance();
        self.session_episodes = self.session_episodes.saturating_add(1);
        self.alert_level = (self.alert_level - self.config.schedule.alert_decay).max(0.0);

        let officer = self
            .roster
            .officer_ids()
            .choose(self.ctx.rng())
            .copied()
            .ok_or(StepError::NoOfficers)?;
        let role = self
            .roster
            .get(officer)
            .map(Agent::role)
            .ok_or(StepError::MissingAgent(officer))?;
        let mut scenario = self.env.generate_scenario(self.alert_level, &mut self.ctx);
        let chain = self.resolve_chain(episode, officer, &mut scenario)?;

        debug!(
            episode,
            officer = %officer,
            crime = scenario.crime.label(),
            offer = scenario.offer,
            rounds = chain.resolutions.len(),
            outcome = ?chain.resolutions.last().map(|r| r.outcome),
            reward = chain.reward,
            "Episode resolved"
        );

        let inspect = self
            .session_episodes
            .checked_rem(self.config.schedule.inspection_frequency)
            == Some(0);
        let audits = if inspect {
            let audits = hierarchy::run_inspection(
                &mut self.roster,
                self.alert_level,
                &self.config,
                &mut self.brains,
                &mut self.ctx,
            )?;
            self.persist_audits(episode, &audits);
            audits
        } else {
            Vec::new()
        };

        self.persist_agent(officer, "officer row");
        self.persist_agent(self.roster.controller_id(), "controller row");

        let stats = self.stats_row(episode);
        persisted(self.store.append_episode_stats(&stats), "episode stats");
        persisted(self.store.save_progress(episode), "progress");

        Ok(StepReport {
            episode,
            session_episode: self.session_episodes,
            officer,
            role,
            scenario,
            resolutions: chain.resolutions,
            reward: chain.reward,
            kickback: chain.kickback,
            audits,
            stats,
        })
    }

    /// Decide and resolve until a terminal outcome or `max_chain` rounds.
    ///
    /// The last round always learns with no next state.
    fn resolve_chain(
        &mut self,
        episode: u64,
        officer: AgentId,
        scenario: &mut Scenario,
    ) -> Result<Chain, StepError> {
        let max_chain = self.config.schedule.max_chain.max(1);
        let mut chain = Chain::default();

        for position in 0..max_chain {
            let actor = acting_officer(&mut self.roster, officer)?;
            let action = actor.decide(scenario, &mut self.ctx);
            let resolution = self.env.resolve_outcome(action, scenario, &mut self.ctx);
            let outcome = resolution.outcome;
            let reward = officer_reward(&self.config.rewards, outcome, scenario);
            let value = outcome_value(outcome, scenario);
            actor.update_stats(outcome, value, &self.ctx);

            chain.kickback += route_kickback(
                &mut self.roster,
                officer,
                value,
                self.config.schedule.kickback_rate,
            );

            let last = resolution.terminal || position.saturating_add(1) >= max_chain;
            let next = if last { None } else { Some(&*scenario) };
            let loss =
                acting_officer(&mut self.roster, officer)?.learn(reward, next, &mut self.ctx);
            chain.reward += reward;

            if self.config.schedule.persist_history {
                let row = HistoryRow {
                    run_id: self.run_id,
                    episode,
                    agent_id: officer,
                    crime: scenario.crime,
                    severity: scenario.severity,
                    offer: scenario.offer,
                    action,
                    outcome,
                    reward,
                    chain_position: u8::try_from(position).unwrap_or(u8::MAX),
                    recorded_at: Utc::now(),
                };
                persisted(self.store.append_history(&row), "history row");
            }

            chain.resolutions.push(Resolved {
                action,
                outcome,
                reward,
                loss,
            });
            if last {
                break;
            }
        }

        Ok(chain)
    }

    /// Execute an officer on the operator's command and register its
    /// replacement.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] if the target is protected, missing,
    /// or not a corrupt officer. Nothing changes on error.
    pub fn execute_agent(&mut self, target: AgentId) -> Result<Replacement, LifecycleError> {
        let replacement = lifecycle::execute_and_replace(
            &mut self.roster,
            target,
            ExecutionReason::OperatorCommand,
            &self.config,
            &mut self.brains,
            &mut self.ctx,
        )?;
        self.persist_replacement(&replacement);
        Ok(replacement)
    }

    /// Write progress, the registry, and every learned state.
    ///
    /// Returns the number of learned-state blobs written. Failures are
    /// logged and skipped.
    pub fn save_state(&mut self) -> usize {
        let episode = self.ctx.episode();
        persisted(self.store.save_progress(episode), "progress");
        for row in self.roster.rows() {
            persisted(self.store.upsert_agent(&row), "roster row");
        }

        let mut saved: usize = 0;
        for agent in self.roster.agents() {
            let (Some(key), Some(learner)) = (brain_key(agent), agent.learner()) else {
                continue;
            };
            match self.brains.save(key, &learner.checkpoint()) {
                Ok(()) => saved = saved.saturating_add(1),
                Err(e) => warn!(%key, error = %e, "Failed to save learned state"),
            }
        }

        info!(episode, saved, "Simulation state saved");
        saved
    }

    /// Wipe both stores and start over from the configuration.
    ///
    /// The caller must have halted stepping first.
    pub fn reset(&mut self) {
        self.ctx = EpisodeContext::seeded(self.config.world.seed);
        self.roster = Roster::fresh(&self.config, &mut self.ctx);
        self.env = Environment::new(self.config.risk.clone());
        self.run_id = RunId::new();
        self.alert_level = 0.0;
        self.session_episodes = 0;
        self.wipe_and_register();
        info!(run_id = %self.run_id, "Simulation reset");
    }

    /// Change one tunable and push it into the environment and every agent.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown key, an uncoercible value,
    /// or a value that breaks the configuration. The prior value is kept.
    pub fn set_tunable(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        tunables::set(&mut self.config, key, value)?;
        self.env.set_risk(self.config.risk.clone());
        self.roster.apply_config(&self.config);
        info!(key, %value, "Tunable changed");
        Ok(())
    }

    /// Current value of one tunable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] if `key` is not a tunable.
    pub fn tunable(&self, key: &str) -> Result<Value, ConfigError> {
        tunables::get(&self.config, key)
    }

    /// Raise the global alert level, capped at 1.
    pub fn raise_alert(&mut self, amount: f64) {
        self.alert_level = (self.alert_level + amount.max(0.0)).min(1.0);
    }

    /// The last `n` episode stats rows, oldest first.
    pub fn recent_stats(&self, n: usize) -> Vec<EpisodeStatsRow> {
        self.store.recent_stats(n).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read episode stats");
            Vec::new()
        })
    }

    /// Stats rows replayed to a newly attached observer.
    pub fn history(&self) -> Vec<EpisodeStatsRow> {
        self.recent_stats(self.config.schedule.history_window)
    }

    /// The active configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The active roster.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Id of this run.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Global episode counter.
    pub const fn episode(&self) -> u64 {
        self.ctx.episode()
    }

    /// Episodes run since this process started or last reset.
    pub const fn session_episodes(&self) -> u64 {
        self.session_episodes
    }

    /// Current global alert level.
    pub const fn alert_level(&self) -> f64 {
        self.alert_level
    }

    /// The registry and log store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The learned-state store.
    pub const fn brains(&self) -> &B {
        &self.brains
    }

    fn wipe_and_register(&mut self) {
        persisted(self.store.clear(), "store wipe");
        persisted(self.brains.clear(), "learned-state wipe");
        for row in self.roster.rows() {
            persisted(self.store.upsert_agent(&row), "roster row");
        }
        persisted(self.store.save_progress(self.ctx.episode()), "progress");
    }

    fn restore_brains(&mut self) -> usize {
        let mut restored: usize = 0;
        for agent in self.roster.agents_mut() {
            let id = agent.id();
            let Some(key) = brain_key(agent) else {
                continue;
            };
            let Some(learner) = agent.learner_mut() else {
                continue;
            };
            match self.brains.load(key) {
                Ok(Some(state)) => match learner.restore(state) {
                    Ok(()) => restored = restored.saturating_add(1),
                    Err(e) => warn!(agent = %id, error = %e, "Learned state rejected"),
                },
                Ok(None) => debug!(agent = %id, "No learned state, fresh policy"),
                Err(e) => warn!(agent = %id, error = %e, "Learned state unreadable"),
            }
        }
        restored
    }

    fn persist_audits(&mut self, episode: u64, audits: &[Audit]) {
        for audit in audits {
            let row = InvestigationRow {
                run_id: self.run_id,
                episode,
                target_id: audit.target,
                detective_action: audit.detective_action,
                evidence: audit.evidence,
                controller_action: audit.controller_action,
                summary: audit.summary(),
                recorded_at: Utc::now(),
            };
            persisted(self.store.append_investigation(&row), "investigation row");

            if let Some(replacement) = &audit.replacement {
                self.persist_replacement(replacement);
            } else if audit.controller_action.is_some() {
                self.persist_agent(audit.target, "punished officer row");
            }
        }
        self.persist_agent(self.roster.detective_id(), "detective row");
    }

    fn persist_replacement(&mut self, replacement: &Replacement) {
        persisted(
            self.store.upsert_agent(&replacement.retired),
            "executed officer row",
        );
        self.persist_agent(replacement.successor, "replacement row");
    }

    /// Upsert the active row of `id`, if it is still on the roster.
    fn persist_agent(&mut self, id: AgentId, what: &'static str) {
        if let Some(agent) = self.roster.get(id) {
            persisted(
                self.store.upsert_agent(&agent.roster_row(AgentStatus::Active)),
                what,
            );
        }
    }

    fn stats_row(&self, episode: u64) -> EpisodeStatsRow {
        EpisodeStatsRow {
            run_id: self.run_id,
            episode,
            mean_corruption: self.roster.mean_corruption(),
            mean_wealth: self.roster.mean_wealth(),
            controller_wealth: self.roster.controller_wealth(),
            corrupt_officers: u32::try_from(self.roster.corrupt_ids().len()).unwrap_or(u32::MAX),
            recorded_at: Utc::now(),
        }
    }
}

impl<S, B> std::fmt::Debug for Simulation<S, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("run_id", &self.run_id)
            .field("episode", &self.ctx.episode())
            .field("session_episodes", &self.session_episodes)
            .field("alert_level", &self.alert_level)
            .field("agents", &self.roster.len())
            .finish_non_exhaustive()
    }
}

fn acting_officer(roster: &mut Roster, id: AgentId) -> Result<&mut dyn Officer, StepError> {
    roster
        .get_mut(id)
        .ok_or(StepError::MissingAgent(id))?
        .as_officer_mut()
        .ok_or(StepError::NotAnOfficer(id))
}

/// Move `rate` of a paid offer from a corrupt officer to the controller.
fn route_kickback(roster: &mut Roster, officer: AgentId, value: u64, rate: f64) -> f64 {
    if value == 0 {
        return 0.0;
    }
    let Some(Agent::Corrupt(cop)) = roster.get_mut(officer) else {
        return 0.0;
    };
    let amount = currency(value) * rate;
    cop.pay_kickback(amount);
    if let Some(controller) = roster.controller_mut() {
        controller.receive_kickback(amount);
    }
    amount
}

fn brain_key(agent: &Agent) -> Option<BrainKey> {
    match agent.role() {
        Role::Controller => Some(BrainKey::Controller),
        Role::Detective => Some(BrainKey::Detective),
        Role::CorruptOfficer => Some(BrainKey::Officer(agent.id())),
        Role::HonestOfficer => None,
    }
}

fn persisted(result: Result<(), PersistenceError>, what: &'static str) {
    if let Some(e) = result.err() {
        warn!(what, error = %e, "Persistence write failed, continuing");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use precinct_db::{MemoryBrainStore, MemoryStore};

    use super::*;

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.learning.hidden_dim = 8;
        config.learning.batch_size = 4;
        config
    }

    fn sim() -> Simulation<MemoryStore, MemoryBrainStore> {
        Simulation::new(config(), MemoryStore::new(), MemoryBrainStore::new())
    }

    #[test]
    fn fresh_simulation_registers_the_roster() {
        let sim = sim();
        assert_eq!(sim.store().roster().unwrap().len(), 9);
        assert_eq!(sim.store().progress().unwrap(), Some(0));
        assert_eq!(sim.episode(), 0);
    }

    #[test]
    fn step_emits_stats_and_bounded_chain() {
        let mut sim = sim();
        for n in 1..=25_u64 {
            let report = sim.step().unwrap();
            assert_eq!(report.episode, n);
            assert!(!report.resolutions.is_empty());
            assert!(report.resolutions.len() <= 3);
            assert!(report.role.is_officer());
            for r in &report.resolutions[..report.resolutions.len() - 1] {
                assert_eq!(r.outcome, Outcome::IsolateSuccess);
            }
        }
        assert_eq!(sim.store().stats().len(), 25);
        assert!(sim.store().history().len() >= 25);
    }

    #[test]
    fn inspection_runs_on_cadence() {
        let mut sim = sim();
        for n in 1..=20_u64 {
            let report = sim.step().unwrap();
            if n % 10 != 0 {
                assert!(!report.inspected());
            }
        }
        assert_eq!(sim.roster().corrupt_ids().len(), 5);
        assert_eq!(sim.roster().honest_ids().len(), 2);
    }

    #[test]
    fn kickback_moves_a_tenth_of_the_offer() {
        let mut roster = Roster::fresh(&config(), &mut EpisodeContext::seeded(3));
        let cop = roster.corrupt_ids()[0];
        if let Some(Agent::Corrupt(o)) = roster.get_mut(cop) {
            o.update_stats(Outcome::Success, 1_000, &EpisodeContext::seeded(0));
        }
        let before = roster.controller_wealth();
        let moved = route_kickback(&mut roster, cop, 1_000, 0.1);
        assert!((moved - 100.0).abs() < 1e-9);
        assert!((roster.controller_wealth() - before - 100.0).abs() < 1e-9);
        let wealth = roster.get(cop).unwrap().profile().wealth;
        assert!((wealth - 900.0).abs() < 1e-9);

        let honest = roster.honest_ids()[0];
        assert!((route_kickback(&mut roster, honest, 1_000, 0.1)).abs() < f64::EPSILON);
    }

    #[test]
    fn operator_execution_is_persisted() {
        let mut sim = sim();
        let target = sim.roster().corrupt_ids()[1];
        let r = sim.execute_agent(target).unwrap();
        let rows = sim.store().roster().unwrap();
        let retired = rows.iter().find(|row| row.id == target).unwrap();
        assert_eq!(retired.status, AgentStatus::ExecutedByPlayer);
        assert!(rows.iter().any(|row| row.id == r.successor));
        assert!(sim.execute_agent(sim.roster().controller_id()).is_err());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut sim = sim();
        for _ in 0..12 {
            sim.step().unwrap();
        }
        sim.reset();
        assert_eq!(sim.episode(), 0);
        assert_eq!(sim.session_episodes(), 0);
        assert!(sim.store().stats().is_empty());
        assert!(sim.brains().is_empty());
        assert_eq!(sim.roster().len(), 9);
    }

    #[test]
    fn tunable_changes_reach_the_environment() {
        let mut sim = sim();
        sim.set_tunable("risk.alert_risk_factor", &Value::from(0.9))
            .unwrap();
        assert_eq!(
            sim.tunable("risk.alert_risk_factor").unwrap(),
            Value::from(0.9)
        );
        assert!(sim.set_tunable("risk.nope", &Value::from(1)).is_err());
    }

    #[test]
    fn alert_decays_toward_zero() {
        let mut sim = sim();
        sim.raise_alert(0.12);
        sim.step().unwrap();
        assert!((sim.alert_level() - 0.07).abs() < 1e-9);
        sim.step().unwrap();
        sim.step().unwrap();
        assert!(sim.alert_level().abs() < f64::EPSILON);
        sim.raise_alert(5.0);
        assert!((sim.alert_level() - 1.0).abs() < f64::EPSILON);
    }
}
