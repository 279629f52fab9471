//! Execution and knowledge-inheriting replacement.
//!
//! Only corrupt officers can be executed. The dead officer's learned state
//! is persisted, a replacement with a random personality and a fresh
//! corruption score is registered under the next id, and the replacement
//! takes over the predecessor's policy with its exploration rate raised to
//! the inheritance floor. Every rejection leaves the roster unchanged.

use precinct_agents::{Agent, CorruptOfficer};
use precinct_db::{BrainKey, BrainStore};
use precinct_types::{AgentId, EpisodeContext, ExecutionReason, Personality, Role, RosterRow};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::roster::Roster;

/// Errors raised by the lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The controller and detective can never be executed.
    #[error("agent {id} is a protected {role:?}")]
    ProtectedRole {
        /// The rejected target.
        id: AgentId,
        /// Its role.
        role: Role,
    },

    /// The target is not on the active roster.
    #[error("agent {0} is not on the roster")]
    NotFound(AgentId),

    /// The target's role has no replacement procedure.
    #[error("agent {id} has role {role:?}, which cannot be replaced")]
    NotSupported {
        /// The rejected target.
        id: AgentId,
        /// Its role.
        role: Role,
    },

    /// No id is left for a replacement.
    #[error("agent id space exhausted")]
    IdsExhausted,
}

/// What an execution changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// The executed officer.
    pub executed: AgentId,
    /// Its replacement.
    pub successor: AgentId,
    /// Who ordered the execution.
    pub reason: ExecutionReason,
    /// Final registry row of the executed officer, with its execution status.
    pub retired: RosterRow,
    /// Whether the successor took over the predecessor's policy.
    pub inherited: bool,
}

/// Execute `target` and register its inheriting replacement.
///
/// # Errors
///
/// Returns [`LifecycleError`] if `target` is missing, protected, or not a
/// corrupt officer, or if no id is left. The roster is unchanged on error.
pub fn execute_and_replace<B: BrainStore + ?Sized>(
    roster: &mut Roster,
    target: AgentId,
    reason: ExecutionReason,
    config: &SimulationConfig,
    brains: &mut B,
    ctx: &mut EpisodeContext,
) -> Result<Replacement, LifecycleError> {
    let agent = roster.get(target).ok_or(LifecycleError::NotFound(target))?;
    let role = agent.role();
    if role.is_protected() {
        return Err(LifecycleError::ProtectedRole { id: target, role });
    }
    if role != Role::CorruptOfficer {
        return Err(LifecycleError::NotSupported { id: target, role });
    }
    let successor_id = roster.next_id().ok_or(LifecycleError::IdsExhausted)?;

    let retired = agent.roster_row(reason.status());
    let legacy = agent.learner().map(precinct_agents::DqnLearner::checkpoint);
    if let Some(state) = &legacy {
        if let Err(e) = brains.save(BrainKey::Officer(target), state) {
            warn!(
                officer = %target,
                error = %e,
                "Failed to persist executed officer's learned state"
            );
        }
    }

    let rng = ctx.rng();
    let personality = Personality::ALL
        .choose(rng)
        .copied()
        .unwrap_or(Personality::Greedy);
    let corruption = rng.random_range(
        config.roster.replacement_corruption_min..=config.roster.replacement_corruption_max,
    );
    let successor = CorruptOfficer::new(
        successor_id,
        personality,
        corruption,
        config.officer,
        config.learning,
        rng,
    );

    roster
        .replace(target, Agent::Corrupt(successor))
        .ok_or(LifecycleError::NotFound(target))?;

    let floor = config.learning.inherited_epsilon_floor();
    let inherited = match (legacy, roster.get_mut(successor_id).and_then(Agent::learner_mut)) {
        (Some(state), Some(learner)) => match learner.inherit(state, floor) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    officer = %successor_id,
                    error = %e,
                    "Replacement starts with a fresh policy"
                );
                false
            }
        },
        _ => false,
    };

    info!(
        executed = %target,
        successor = %successor_id,
        ?reason,
        personality = personality.label(),
        corruption,
        inherited,
        "Officer executed and replaced"
    );

    Ok(Replacement {
        executed: target,
        successor: successor_id,
        reason,
        retired,
        inherited,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use precinct_db::MemoryBrainStore;
    use precinct_types::AgentStatus;

    use super::*;

    fn setup(seed: u64) -> (SimulationConfig, Roster, EpisodeContext) {
        let mut config = SimulationConfig::default();
        config.learning.hidden_dim = 8;
        let mut ctx = EpisodeContext::seeded(seed);
        let roster = Roster::fresh(&config, &mut ctx);
        (config, roster, ctx)
    }

    #[test]
    fn execution_preserves_group_size_and_uses_next_id() {
        let (config, mut roster, mut ctx) = setup(1);
        let mut brains = MemoryBrainStore::new();
        let before = roster.corrupt_ids().len();
        let max = roster.max_id().unwrap();

        let r = execute_and_replace(
            &mut roster,
            AgentId(4),
            ExecutionReason::ControllerDecision,
            &config,
            &mut brains,
            &mut ctx,
        )
        .unwrap();

        assert_eq!(roster.corrupt_ids().len(), before);
        assert_eq!(r.successor, max.successor().unwrap());
        assert!(!roster.contains(AgentId(4)));
        assert!(roster.corrupt_ids().contains(&r.successor));
        assert_eq!(r.retired.status, AgentStatus::Executed);
        assert!(brains.contains(BrainKey::Officer(AgentId(4))));
    }

    #[test]
    fn successor_inherits_with_raised_exploration() {
        let (mut config, mut roster, mut ctx) = setup(2);
        config.learning.epsilon_start = 0.0;
        config.learning.epsilon_min = 0.0;
        let mut brains = MemoryBrainStore::new();
        if let Some(learner) = roster.get_mut(AgentId(2)).and_then(Agent::learner_mut) {
            learner.reconfigure(config.learning);
        }
        let parent = roster
            .get(AgentId(2))
            .and_then(Agent::learner)
            .unwrap()
            .checkpoint();

        let r = execute_and_replace(
            &mut roster,
            AgentId(2),
            ExecutionReason::OperatorCommand,
            &config,
            &mut brains,
            &mut ctx,
        )
        .unwrap();

        assert!(r.inherited);
        assert_eq!(r.retired.status, AgentStatus::ExecutedByPlayer);
        let child = roster.get(r.successor).and_then(Agent::learner).unwrap();
        assert_eq!(child.checkpoint().network, parent.network);
        let floor = config.learning.inherited_epsilon_floor();
        assert!(child.epsilon() >= floor - 1e-12);
        let corruption = roster.get(r.successor).unwrap().profile().corruption_score;
        assert!((30.0..=60.0).contains(&corruption));
    }

    #[test]
    fn protected_roles_are_rejected_and_roster_untouched() {
        let (config, mut roster, mut ctx) = setup(3);
        let mut brains = MemoryBrainStore::new();
        let ids = roster.ids();
        for target in [roster.controller_id(), roster.detective_id()] {
            let err = execute_and_replace(
                &mut roster,
                target,
                ExecutionReason::OperatorCommand,
                &config,
                &mut brains,
                &mut ctx,
            )
            .unwrap_err();
            assert!(matches!(err, LifecycleError::ProtectedRole { .. }));
        }
        assert_eq!(roster.ids(), ids);
        assert!(brains.is_empty());
    }

    #[test]
    fn honest_and_unknown_targets_are_rejected() {
        let (config, mut roster, mut ctx) = setup(4);
        let mut brains = MemoryBrainStore::new();
        let honest = roster.honest_ids()[0];
        let err = execute_and_replace(
            &mut roster,
            honest,
            ExecutionReason::OperatorCommand,
            &config,
            &mut brains,
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::NotSupported { .. }));

        let err = execute_and_replace(
            &mut roster,
            AgentId(999),
            ExecutionReason::OperatorCommand,
            &config,
            &mut brains,
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(AgentId(999))));
        assert_eq!(roster.len(), 9);
    }
}
