//! The periodic hierarchy pass.
//!
//! A handful of distinct roster members are sampled. For each officer
//! among them the detective decides whether to escalate, is scored as a
//! classifier, and learns. Only escalated cases reach the controller, who
//! picks a punishment, is scored against the corruption setpoint, and
//! learns. Execute hands corrupt officers to the lifecycle manager; Fire
//! and Warning are applied in place.

use precinct_agents::Agent;
use precinct_db::BrainStore;
use precinct_types::{
    AgentId, ControllerAction, DetectiveAction, EpisodeContext, EvidenceGrade, ExecutionReason,
    Role,
};
use rand::seq::index;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::lifecycle::{self, Replacement};
use crate::roster::Roster;

/// Errors that stop a hierarchy pass.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// A singleton role is missing from the roster.
    #[error("roster has no {0:?}")]
    MissingRole(Role),
}

/// One audited officer.
#[derive(Debug, Clone, PartialEq)]
pub struct Audit {
    /// The audited officer.
    pub target: AgentId,
    /// What the detective did.
    pub detective_action: DetectiveAction,
    /// Evidence handed to the controller.
    pub evidence: EvidenceGrade,
    /// Whether the target was truly guilty.
    pub guilty: bool,
    /// The detective's classification reward.
    pub detective_reward: f64,
    /// The controller's punishment, for escalated cases.
    pub controller_action: Option<ControllerAction>,
    /// The controller's setpoint reward, for escalated cases.
    pub controller_reward: Option<f64>,
    /// The execution, if one took place.
    pub replacement: Option<Replacement>,
}

impl Audit {
    /// `detective_action->evidence->controller_action` summary line.
    pub fn summary(&self) -> String {
        format!(
            "{}->{}->{}",
            self.detective_action.label(),
            self.evidence.label(),
            self.controller_action.map_or("none", ControllerAction::label)
        )
    }
}

/// Run one hierarchy pass over a sample of the roster.
///
/// Failed executions are logged and the pass continues.
///
/// # Errors
///
/// Returns [`HierarchyError::MissingRole`] if the roster has no detective
/// or no controller when one is needed.
pub fn run_inspection<B: BrainStore + ?Sized>(
    roster: &mut Roster,
    alert_level: f64,
    config: &SimulationConfig,
    brains: &mut B,
    ctx: &mut EpisodeContext,
) -> Result<Vec<Audit>, HierarchyError> {
    let ids = roster.ids();
    let amount = config.schedule.audit_sample_size.min(ids.len());
    let picks: Vec<AgentId> = index::sample(ctx.rng(), ids.len(), amount)
        .into_iter()
        .filter_map(|i| ids.get(i).copied())
        .collect();

    let mut audits = Vec::with_capacity(picks.len());
    for target in picks {
        let Some(profile) = roster
            .get(target)
            .filter(|a| a.role().is_officer())
            .map(Agent::profile)
        else {
            continue;
        };

        let detective = roster
            .detective_mut()
            .ok_or(HierarchyError::MissingRole(Role::Detective))?;
        let detective_action = detective.decide(&profile, alert_level, ctx);
        let verdict = detective.execute_logic(detective_action, &profile);
        detective.learn(verdict.reward, ctx);

        let mut audit = Audit {
            target,
            detective_action,
            evidence: verdict.evidence,
            guilty: verdict.guilty,
            detective_reward: verdict.reward,
            controller_action: None,
            controller_reward: None,
            replacement: None,
        };

        if detective_action == DetectiveAction::Escalate {
            let mean = roster.mean_corruption();
            let controller = roster
                .controller_mut()
                .ok_or(HierarchyError::MissingRole(Role::Controller))?;
            let action = controller.decide_punishment(verdict.evidence, &profile, mean, ctx);
            let reward = controller.calculate_reward(action, mean);
            controller.learn(reward, ctx);
            audit.controller_action = Some(action);
            audit.controller_reward = Some(reward);

            match action {
                ControllerAction::Execute if profile.role == Role::CorruptOfficer => {
                    match lifecycle::execute_and_replace(
                        roster,
                        target,
                        ExecutionReason::ControllerDecision,
                        config,
                        brains,
                        ctx,
                    ) {
                        Ok(replacement) => audit.replacement = Some(replacement),
                        Err(e) => warn!(officer = %target, error = %e, "Execution rejected"),
                    }
                }
                ControllerAction::Execute => {
                    debug!(officer = %target, "Execution of a non-corrupt officer skipped");
                }
                ControllerAction::Fire | ControllerAction::Warning => {
                    if let Some(agent) = roster.get_mut(target) {
                        agent.punish(action, &config.controller);
                    }
                }
            }

            info!(
                episode = ctx.episode(),
                officer = %target,
                evidence = verdict.evidence.label(),
                guilty = verdict.guilty,
                punishment = action.label(),
                reward,
                mean_corruption = mean,
                "Case escalated"
            );
        } else {
            debug!(
                episode = ctx.episode(),
                officer = %target,
                guilty = verdict.guilty,
                "Case closed"
            );
        }

        audits.push(audit);
    }

    Ok(audits)
}
