//! Step observer that reports the run through structured logs.

use precinct_core::roster::Roster;
use precinct_core::{StepObserver, StepReport};
use tracing::{debug, info};

/// Logs every observed episode at debug level and a progress line every
/// `report_every` observed episodes.
pub struct LoggingObserver {
    report_every: u64,
    observed: u64,
    executions: u64,
}

impl LoggingObserver {
    /// Create an observer that prints progress every `report_every`
    /// observed episodes (0 = only hierarchy events).
    pub const fn new(report_every: u64) -> Self {
        Self {
            report_every,
            observed: 0,
            executions: 0,
        }
    }

    /// Executions seen so far.
    pub const fn executions(&self) -> u64 {
        self.executions
    }
}

impl StepObserver for LoggingObserver {
    fn on_step(&mut self, report: &StepReport, roster: &Roster) {
        self.observed = self.observed.saturating_add(1);

        debug!(
            episode = report.episode,
            officer = %report.officer,
            role = ?report.role,
            outcome = ?report.final_outcome(),
            reward = report.reward,
            kickback = report.kickback,
            "Episode observed"
        );

        for audit in &report.audits {
            if let Some(r) = &audit.replacement {
                self.executions = self.executions.saturating_add(1);
                info!(
                    episode = report.episode,
                    executed = %r.executed,
                    successor = %r.successor,
                    inherited = r.inherited,
                    "Replacement on duty"
                );
            }
        }

        if self.report_every > 0 && self.observed.checked_rem(self.report_every) == Some(0) {
            info!(
                episode = report.episode,
                mean_corruption = report.stats.mean_corruption,
                mean_wealth = report.stats.mean_wealth,
                controller_wealth = report.stats.controller_wealth,
                officers = roster.officer_ids().len(),
                executions = self.executions,
                "Progress"
            );
        }
    }

    fn on_reset(&mut self, roster: &Roster) {
        self.observed = 0;
        self.executions = 0;
        info!(agents = roster.len(), "Observer reset");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use precinct_core::{Simulation, SimulationConfig};
    use precinct_db::{MemoryBrainStore, MemoryStore};

    use super::*;

    #[test]
    fn counts_executions_and_resets() {
        let mut config = SimulationConfig::default();
        config.learning.hidden_dim = 8;
        config.schedule.inspection_frequency = 1;
        let mut sim = Simulation::new(config, MemoryStore::new(), MemoryBrainStore::new());
        let mut observer = LoggingObserver::new(10);

        let mut replacements: u64 = 0;
        for _ in 0..50 {
            let report = sim.step().unwrap();
            let here = report
                .audits
                .iter()
                .filter(|a| a.replacement.is_some())
                .count();
            replacements = replacements.saturating_add(u64::try_from(here).unwrap());
            observer.on_step(&report, sim.roster());
        }
        assert_eq!(observer.executions(), replacements);

        observer.on_reset(sim.roster());
        assert_eq!(observer.executions(), 0);
    }
}
