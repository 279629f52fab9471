//! Scenario generation and the action -> outcome state machine.
//!
//! [`Environment::generate_scenario`] builds one episode's situation.
//! [`Environment::resolve_outcome`] applies a single officer action to it.
//! Resolution is terminal for every action except a successful isolation,
//! which rewrites the scenario in place and hands control back to the
//! officer for another decision.

use precinct_types::{CrimeType, EpisodeContext, OfficerAction, Outcome, Scenario, WealthTier};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::risk::RiskConfig;

/// Chance that internal affairs is patrolling nearby.
const DETECTIVE_NEARBY_CHANCE: f64 = 0.2;
/// Chance that a warrant is already in hand.
const WARRANT_CHANCE: f64 = 0.3;
/// Chance that the suspect runs with a gang.
const GANG_CHANCE: f64 = 0.25;
/// Chance that assets were seized before the officer arrived.
const SEIZURE_CHANCE: f64 = 0.5;
/// Arrest success when a warrant is in hand.
const WARRANT_ARREST_SUCCESS: f64 = 0.9;
/// Aggression added by isolating the suspect.
const ISOLATION_AGGRESSION: f64 = 0.3;
/// Highest severity that still qualifies for a ticket.
const TICKET_MAX_SEVERITY: u8 = 3;

/// Result of resolving one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The outcome produced.
    pub outcome: Outcome,
    /// Whether the episode ends here.
    pub terminal: bool,
}

impl Resolution {
    const fn terminal(outcome: Outcome) -> Self {
        Self {
            outcome,
            terminal: true,
        }
    }
}

/// Stateless scenario generator and outcome resolver.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    risk: RiskConfig,
}

impl Environment {
    /// Create an environment with the given risk weights.
    pub const fn new(risk: RiskConfig) -> Self {
        Self { risk }
    }

    /// The risk weights in use.
    pub const fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    /// Replace the risk weights (runtime tunable overrides).
    pub fn set_risk(&mut self, risk: RiskConfig) {
        self.risk = risk;
    }

    /// Build a fresh scenario tagged with the current global alert level.
    pub fn generate_scenario(&self, alert_level: f64, ctx: &mut EpisodeContext) -> Scenario {
        let rng = ctx.rng();

        let crime = CrimeType::ALL
            .choose(rng)
            .copied()
            .unwrap_or(CrimeType::Speeding);
        let (base_min, base_max) = crime.base_value_range();
        let asset_value =
            rng.random_range(base_min.saturating_mul(10)..=base_max.saturating_mul(10));
        let wealth_tier = WealthTier::ALL
            .choose(rng)
            .copied()
            .unwrap_or(WealthTier::Middle);
        let suspect_wealth = scale_currency(asset_value, wealth_tier.factor());
        let severity = crime.severity();
        let offer = bribe_offer(severity, asset_value, suspect_wealth);

        let witnesses = rng.random_range(0..=4_u8);
        let detective_nearby = rng.random::<f64>() < DETECTIVE_NEARBY_CHANCE;
        let evidence_strength = rng.random::<f64>();
        let has_warrant = rng.random::<f64>() < WARRANT_CHANCE;
        let gang_affiliated = rng.random::<f64>() < GANG_CHANCE;
        let seized_value = if rng.random::<f64>() < SEIZURE_CHANCE {
            rng.random_range(0..=asset_value / 2)
        } else {
            0
        };
        let suspect_aggression = rng.random::<f64>();
        let location_risk = rng.random::<f64>();

        Scenario {
            crime,
            severity,
            offer,
            asset_value,
            wealth_tier,
            suspect_wealth,
            witnesses,
            detective_nearby,
            alert_level: alert_level.clamp(0.0, 1.0),
            evidence_strength,
            has_warrant,
            gang_affiliated,
            seized_value,
            suspect_aggression,
            location_risk,
        }
    }

    /// Apply one action to the scenario.
    ///
    /// Isolating the suspect is the only action that mutates the scenario,
    /// and the only one that can come back non-terminal.
    pub fn resolve_outcome(
        &self,
        action: OfficerAction,
        scenario: &mut Scenario,
        ctx: &mut EpisodeContext,
    ) -> Resolution {
        if action == OfficerAction::IsolateSuspect {
            return isolate(scenario);
        }

        let rng = ctx.rng();

        if !action.is_lawful() {
            let p_caught = self.risk.caught_probability(scenario);
            if rng.random::<f64>() < p_caught {
                debug!(%action, p_caught, "Corrupt act detected");
                return Resolution::terminal(Outcome::Caught);
            }
        }

        let outcome = match action {
            OfficerAction::Arrest => {
                let p_success = if scenario.has_warrant {
                    WARRANT_ARREST_SUCCESS
                } else {
                    scenario.evidence_strength.mul_add(0.6, 0.3)
                };
                if rng.random::<f64>() < p_success {
                    Outcome::ArrestSuccess
                } else {
                    Outcome::ArrestFailed
                }
            }
            OfficerAction::Investigate => Outcome::InvestigateSuccess,
            OfficerAction::DeEscalate => {
                let aggression = scenario.suspect_aggression;
                if rng.random::<f64>() < aggression * 0.6 {
                    if rng.random::<f64>() < aggression * 0.5 {
                        Outcome::SevereInjury
                    } else {
                        Outcome::DeEscalateFailed
                    }
                } else {
                    Outcome::DeEscalateSuccess
                }
            }
            OfficerAction::IssueTicket => {
                if scenario.severity <= TICKET_MAX_SEVERITY {
                    Outcome::TicketSuccess
                } else {
                    Outcome::TicketInvalid
                }
            }
            OfficerAction::ReportBribe => Outcome::ReportSuccess,
            OfficerAction::RequestWarrant => Outcome::WarrantSuccess,
            OfficerAction::Whistleblow => {
                if scenario.gang_affiliated && rng.random::<f64>() < 0.1 {
                    Outcome::SevereInjury
                } else {
                    Outcome::WhistleblowSuccess
                }
            }
            OfficerAction::AcceptBribe => Outcome::Success,
            OfficerAction::Extort => Outcome::ExtortionSuccess,
            OfficerAction::PlantEvidence => Outcome::FrameSuccess,
            OfficerAction::TipOff => {
                if scenario.gang_affiliated {
                    Outcome::TipOffSuccess
                } else {
                    Outcome::TipOffUseless
                }
            }
            OfficerAction::DestroyEvidence => Outcome::DestroySuccess,
            OfficerAction::IntimidateWitness => {
                if scenario.witnesses > 0 {
                    Outcome::IntimidateSuccess
                } else {
                    Outcome::IntimidateUseless
                }
            }
            OfficerAction::StealSeized => {
                if scenario.seized_value > 0 {
                    Outcome::StealSuccess
                } else {
                    Outcome::StealUseless
                }
            }
            OfficerAction::ExcessiveForce => Outcome::BrutalitySuccess,
            OfficerAction::IsolateSuspect => return isolate(scenario),
        };

        Resolution::terminal(outcome)
    }
}

/// Move the suspect away from witnesses.
fn isolate(scenario: &mut Scenario) -> Resolution {
    if scenario.witnesses == 0 {
        return Resolution::terminal(Outcome::IsolateUseless);
    }
    scenario.witnesses = 0;
    scenario.suspect_aggression = (scenario.suspect_aggression + ISOLATION_AGGRESSION).min(1.0);
    Resolution {
        outcome: Outcome::IsolateSuccess,
        terminal: false,
    }
}

/// Bribe offer tiered by severity.
///
/// Petty crimes offer a tenth of the assets, mid-range crimes the larger of
/// 30% of assets or 30% of suspect wealth, serious crimes half the wealth.
pub fn bribe_offer(severity: u8, asset_value: u64, suspect_wealth: u64) -> u64 {
    match severity {
        0..=3 => asset_value / 10,
        4..=7 => (asset_value.saturating_mul(3) / 10).max(suspect_wealth.saturating_mul(3) / 10),
        _ => suspect_wealth / 2,
    }
}

/// Scale a currency amount by a non-negative factor, rounding to the nearest unit.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scale_currency(amount: u64, factor: f64) -> u64 {
    (amount as f64 * factor).round().max(0.0) as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn witnessed(witnesses: u8, aggression: f64) -> Scenario {
        let mut scenario = Scenario::quiet(CrimeType::Burglary);
        scenario.witnesses = witnesses;
        scenario.suspect_aggression = aggression;
        scenario
    }

    #[test]
    fn offer_tiers_follow_severity() {
        assert_eq!(bribe_offer(1, 1_000, 5_000), 100);
        assert_eq!(bribe_offer(5, 1_000, 5_000), 1_500);
        assert_eq!(bribe_offer(5, 10_000, 5_000), 3_000);
        assert_eq!(bribe_offer(9, 1_000, 5_000), 2_500);
    }

    #[test]
    fn isolate_with_witnesses_mutates_and_continues() {
        let env = Environment::default();
        let mut ctx = EpisodeContext::seeded(1);
        let mut scenario = witnessed(3, 0.5);
        let res = env.resolve_outcome(OfficerAction::IsolateSuspect, &mut scenario, &mut ctx);
        assert_eq!(res.outcome, Outcome::IsolateSuccess);
        assert!(!res.terminal);
        assert_eq!(scenario.witnesses, 0);
        assert!((scenario.suspect_aggression - 0.8).abs() < 1e-12);
    }

    #[test]
    fn isolate_caps_aggression() {
        let env = Environment::default();
        let mut ctx = EpisodeContext::seeded(1);
        let mut scenario = witnessed(1, 0.9);
        env.resolve_outcome(OfficerAction::IsolateSuspect, &mut scenario, &mut ctx);
        assert!((scenario.suspect_aggression - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn isolate_without_witnesses_is_terminal_and_untouched() {
        let env = Environment::default();
        let mut ctx = EpisodeContext::seeded(1);
        let mut scenario = witnessed(0, 0.4);
        let before = scenario.clone();
        let res = env.resolve_outcome(OfficerAction::IsolateSuspect, &mut scenario, &mut ctx);
        assert_eq!(res.outcome, Outcome::IsolateUseless);
        assert!(res.terminal);
        assert_eq!(scenario, before);
    }

    #[test]
    fn certain_detection_catches_every_gated_corrupt_act() {
        let env = Environment::new(RiskConfig {
            alert_risk_factor: 10.0,
            ..RiskConfig::default()
        });
        let mut ctx = EpisodeContext::seeded(3);
        for action in OfficerAction::ALL
            .into_iter()
            .filter(|a| !a.is_lawful() && *a != OfficerAction::IsolateSuspect)
        {
            let mut scenario = witnessed(2, 0.1);
            scenario.alert_level = 1.0;
            let res = env.resolve_outcome(action, &mut scenario, &mut ctx);
            assert_eq!(res.outcome, Outcome::Caught, "{action}");
            assert!(res.terminal);
        }
    }

    #[test]
    fn zero_risk_corrupt_acts_resolve_by_scenario() {
        let env = Environment::new(RiskConfig {
            witness_risk_factor: 0.0,
            detective_risk_factor: 0.0,
            location_risk_weight: 0.0,
            severity_risk_factor: 0.0,
            alert_risk_factor: 0.0,
        });
        let mut ctx = EpisodeContext::seeded(5);
        let mut scenario = witnessed(0, 0.0);
        let tip = env.resolve_outcome(OfficerAction::TipOff, &mut scenario, &mut ctx);
        assert_eq!(tip.outcome, Outcome::TipOffUseless);
        let steal = env.resolve_outcome(OfficerAction::StealSeized, &mut scenario, &mut ctx);
        assert_eq!(steal.outcome, Outcome::StealUseless);
        scenario.seized_value = 400;
        let steal = env.resolve_outcome(OfficerAction::StealSeized, &mut scenario, &mut ctx);
        assert_eq!(steal.outcome, Outcome::StealSuccess);
        let bribe = env.resolve_outcome(OfficerAction::AcceptBribe, &mut scenario, &mut ctx);
        assert_eq!(bribe.outcome, Outcome::Success);
    }

    #[test]
    fn ticket_depends_on_severity() {
        let env = Environment::default();
        let mut ctx = EpisodeContext::seeded(2);
        let mut petty = Scenario::quiet(CrimeType::Jaywalking);
        let mut serious = Scenario::quiet(CrimeType::Assault);
        assert_eq!(
            env.resolve_outcome(OfficerAction::IssueTicket, &mut petty, &mut ctx)
                .outcome,
            Outcome::TicketSuccess
        );
        assert_eq!(
            env.resolve_outcome(OfficerAction::IssueTicket, &mut serious, &mut ctx)
                .outcome,
            Outcome::TicketInvalid
        );
    }

    #[test]
    fn calm_suspect_always_de_escalates() {
        let env = Environment::default();
        let mut ctx = EpisodeContext::seeded(9);
        for _ in 0..50 {
            let mut scenario = witnessed(1, 0.0);
            let res = env.resolve_outcome(OfficerAction::DeEscalate, &mut scenario, &mut ctx);
            assert_eq!(res.outcome, Outcome::DeEscalateSuccess);
        }
    }

    #[test]
    fn generated_scenarios_respect_ranges() {
        let env = Environment::default();
        let mut ctx = EpisodeContext::seeded(11);
        for _ in 0..200 {
            let s = env.generate_scenario(0.4, &mut ctx);
            let (lo, hi) = s.crime.base_value_range();
            assert!(s.asset_value >= lo * 10 && s.asset_value <= hi * 10);
            assert!(s.witnesses <= 4);
            assert_eq!(s.severity, s.crime.severity());
            assert!((0.0..=1.0).contains(&s.evidence_strength));
            assert!((0.0..=1.0).contains(&s.suspect_aggression));
            assert!(s.seized_value <= s.asset_value / 2);
            assert!((s.alert_level - 0.4).abs() < f64::EPSILON);
            assert_eq!(
                s.offer,
                bribe_offer(s.severity, s.asset_value, s.suspect_wealth)
            );
        }
    }
}
