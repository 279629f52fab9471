//! Stepping loop with operator controls.
//!
//! [`run_simulation`] drives [`Simulation::step`] with support for:
//!
//! - **Bounded sessions**: stop after `episode_window` episodes
//! - **Pause/resume**: the operator can halt and continue the loop
//! - **Turbo mode**: shorter interval, observers see every Nth episode
//! - **Manual executions**: queued ids are executed between steps
//! - **Live tunables**: queued changes are applied between steps; the
//!   window, turbo interval, and snapshot cadence are re-read every step
//! - **Reset**: the loop wipes and reinitializes between steps
//! - **Clean shutdown**: learned state is saved unless a reset is pending
//!
//! Steps never overlap: the loop owns the simulation exclusively and
//! every control request is applied between two steps.

use std::sync::Arc;

use precinct_db::{BrainStore, SimulationStore};
use tracing::{error, info, warn};

use crate::engine::{Simulation, StepError, StepReport};
use crate::operator::{OperatorState, STEP_INTERVAL_KEY, SimulationEndReason};
use crate::roster::Roster;

/// Errors that can occur during the run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },
}

/// Result of a run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the loop ended.
    pub end_reason: SimulationEndReason,
    /// The last step report, if any step completed.
    pub final_report: Option<StepReport>,
    /// Steps executed by this call.
    pub total_episodes: u64,
}

/// Callback invoked after observed steps.
///
/// In turbo mode only every `turbo_snapshot_interval`-th step is observed.
pub trait StepObserver: Send {
    /// Called after an observed step completes.
    fn on_step(&mut self, report: &StepReport, roster: &Roster);

    /// Called after the loop has wiped and reinitialized the simulation.
    fn on_reset(&mut self, _roster: &Roster) {}
}

/// An observer that ignores everything.
pub struct NoOpObserver;

impl StepObserver for NoOpObserver {
    fn on_step(&mut self, _report: &StepReport, _roster: &Roster) {}
}

/// Run the stepping loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails. State is saved best-effort
/// first, unless a reset is pending.
pub async fn run_simulation<S, B>(
    sim: &mut Simulation<S, B>,
    operator: &Arc<OperatorState>,
    observer: &mut dyn StepObserver,
) -> Result<SimulationResult, RunnerError>
where
    S: SimulationStore,
    B: BrainStore,
{
    let mut last_report: Option<StepReport> = None;
    let mut total_episodes: u64 = 0;

    info!(
        episode = sim.episode(),
        episode_window = sim.config().schedule.episode_window,
        step_interval_ms = operator.step_interval_ms(),
        "Simulation starting"
    );

    loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Simulation paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Simulation resumed");
        }

        // --- Check reset ---
        if operator.take_reset_request() {
            sim.reset();
            observer.on_reset(sim.roster());
            last_report = None;
        }

        // --- Check stop request (before step) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            return finish(
                sim,
                operator,
                SimulationEndReason::OperatorStop,
                last_report,
                total_episodes,
            )
            .await;
        }

        // --- Apply queued tunables ---
        apply_tunables(sim, operator).await;

        // --- Apply queued executions ---
        for id in operator.drain_executions().await {
            if let Err(e) = sim.execute_agent(id) {
                warn!(officer = %id, error = %e, "Execution command rejected");
            }
        }

        // --- Execute step ---
        let report = match sim.step() {
            Ok(report) => report,
            Err(e) => {
                error!(episode = sim.episode(), error = %e, "Step failed, halting");
                if !operator.is_reset_requested() {
                    sim.save_state();
                }
                operator.set_end_reason(SimulationEndReason::StepFailed).await;
                return Err(e.into());
            }
        };
        total_episodes = total_episodes.saturating_add(1);

        // --- Notify observer ---
        let observed =
            !operator.is_turbo() || sim.config().schedule.is_snapshot(report.session_episode);
        if observed {
            observer.on_step(&report, sim.roster());
        }

        // --- Check episode window (after step) ---
        if sim
            .config()
            .schedule
            .window_reached(report.session_episode)
        {
            info!(
                episode = report.episode,
                episode_window = sim.config().schedule.episode_window,
                "Episode window reached"
            );
            return finish(
                sim,
                operator,
                SimulationEndReason::EpisodeWindowReached,
                Some(report),
                total_episodes,
            )
            .await;
        }

        last_report = Some(report);

        // --- Sleep for step interval ---
        let interval_ms = operator.interval_ms(sim.config().world.turbo_interval_ms);
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// Apply every queued tunable change in order. Rejected changes are
/// logged and leave the prior value in place.
async fn apply_tunables<S: SimulationStore, B: BrainStore>(
    sim: &mut Simulation<S, B>,
    operator: &OperatorState,
) {
    for (key, value) in operator.drain_tunables().await {
        match sim.set_tunable(&key, &value) {
            Ok(()) if key == STEP_INTERVAL_KEY => {
                let ms = sim.config().world.step_interval_ms;
                if operator.set_step_interval_ms(ms).is_none() {
                    warn!(ms, "Step interval out of range, keeping the live interval");
                }
            }
            Ok(()) => {}
            Err(e) => warn!(key = %key, error = %e, "Tunable change rejected"),
        }
    }
}

async fn finish<S: SimulationStore, B: BrainStore>(
    sim: &mut Simulation<S, B>,
    operator: &OperatorState,
    reason: SimulationEndReason,
    final_report: Option<StepReport>,
    total_episodes: u64,
) -> Result<SimulationResult, RunnerError> {
    if operator.is_reset_requested() {
        info!("Reset pending, skipping the final save");
    } else {
        sim.save_state();
    }
    operator.set_end_reason(reason.clone()).await;
    Ok(SimulationResult {
        end_reason: reason,
        final_report,
        total_episodes,
    })
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_episodes = result.total_episodes,
        final_episode = result.final_report.as_ref().map(|r| r.episode),
        "Simulation ended"
    );

    if let Some(ref report) = result.final_report {
        info!(
            episode = report.episode,
            mean_corruption = report.stats.mean_corruption,
            mean_wealth = report.stats.mean_wealth,
            controller_wealth = report.stats.controller_wealth,
            "Final episode stats"
        );
    } else {
        warn!("Simulation ended with no episodes executed");
    }
}
