//! The officer reward table.
//!
//! Every outcome carries a literal reward except the two that depend on
//! the scenario: a pocketed bribe pays the offer times a multiplier, and
//! stolen seized assets pay their value.

use precinct_agents::features::currency;
use precinct_types::{Outcome, Scenario};
use serde::Deserialize;

/// Reward credited to an officer for each outcome.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RewardConfig {
    /// Arrest held (default: 50).
    #[serde(default = "default_arrest_success")]
    pub arrest_success: f64,
    /// Arrest fell apart (default: -100).
    #[serde(default = "default_arrest_failed")]
    pub arrest_failed: f64,
    /// Investigation opened (default: 10).
    #[serde(default = "default_investigate_success")]
    pub investigate_success: f64,
    /// Suspect calmed down (default: 20).
    #[serde(default = "default_de_escalate_success")]
    pub de_escalate_success: f64,
    /// Suspect did not calm down (default: -200).
    #[serde(default = "default_de_escalate_failed")]
    pub de_escalate_failed: f64,
    /// Officer badly hurt (default: -2000).
    #[serde(default = "default_severe_injury")]
    pub severe_injury: f64,
    /// Ticket stuck (default: 15).
    #[serde(default = "default_ticket_success")]
    pub ticket_success: f64,
    /// Offence too serious for a ticket (default: -50).
    #[serde(default = "default_ticket_invalid")]
    pub ticket_invalid: f64,
    /// Bribe attempt reported (default: 30).
    #[serde(default = "default_report_success")]
    pub report_success: f64,
    /// Warrant issued (default: 10).
    #[serde(default = "default_warrant_success")]
    pub warrant_success: f64,
    /// Whistle blown (default: 100).
    #[serde(default = "default_whistleblow_success")]
    pub whistleblow_success: f64,
    /// Multiplier applied to the offer for a pocketed bribe (default: 5.0).
    #[serde(default = "default_success_multiplier")]
    pub success_multiplier: f64,
    /// Extortion paid out (default: 500).
    #[serde(default = "default_extortion_success")]
    pub extortion_success: f64,
    /// Frame held (default: 200).
    #[serde(default = "default_frame_success")]
    pub frame_success: f64,
    /// Gang warned (default: 150).
    #[serde(default = "default_tip_off_success")]
    pub tip_off_success: f64,
    /// No gang to warn (default: -50).
    #[serde(default = "default_useless")]
    pub tip_off_useless: f64,
    /// Evidence destroyed (default: 100).
    #[serde(default = "default_destroy_success")]
    pub destroy_success: f64,
    /// Witnesses silenced (default: 100).
    #[serde(default = "default_intimidate_success")]
    pub intimidate_success: f64,
    /// No witnesses to silence (default: -50).
    #[serde(default = "default_useless")]
    pub intimidate_useless: f64,
    /// Nothing seized to steal (default: -50).
    #[serde(default = "default_useless")]
    pub steal_useless: f64,
    /// Force without consequence (default: 50).
    #[serde(default = "default_brutality_success")]
    pub brutality_success: f64,
    /// Suspect isolated (default: 20).
    #[serde(default = "default_isolate_success")]
    pub isolate_success: f64,
    /// No witnesses to isolate from (default: -50).
    #[serde(default = "default_useless")]
    pub isolate_useless: f64,
    /// Corrupt act detected (default: -200).
    #[serde(default = "default_caught")]
    pub caught: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            arrest_success: default_arrest_success(),
            arrest_failed: default_arrest_failed(),
            investigate_success: default_investigate_success(),
            de_escalate_success: default_de_escalate_success(),
            de_escalate_failed: default_de_escalate_failed(),
            severe_injury: default_severe_injury(),
            ticket_success: default_ticket_success(),
            ticket_invalid: default_ticket_invalid(),
            report_success: default_report_success(),
            warrant_success: default_warrant_success(),
            whistleblow_success: default_whistleblow_success(),
            success_multiplier: default_success_multiplier(),
            extortion_success: default_extortion_success(),
            frame_success: default_frame_success(),
            tip_off_success: default_tip_off_success(),
            tip_off_useless: default_useless(),
            destroy_success: default_destroy_success(),
            intimidate_success: default_intimidate_success(),
            intimidate_useless: default_useless(),
            steal_useless: default_useless(),
            brutality_success: default_brutality_success(),
            isolate_success: default_isolate_success(),
            isolate_useless: default_useless(),
            caught: default_caught(),
        }
    }
}

/// Reward for `outcome` resolved against `scenario`.
///
/// `scenario` is the episode's scenario as it stands after resolution,
/// including any mutation made earlier in the same chain.
pub fn officer_reward(config: &RewardConfig, outcome: Outcome, scenario: &Scenario) -> f64 {
    match outcome {
        Outcome::ArrestSuccess => config.arrest_success,
        Outcome::ArrestFailed => config.arrest_failed,
        Outcome::InvestigateSuccess => config.investigate_success,
        Outcome::DeEscalateSuccess => config.de_escalate_success,
        Outcome::DeEscalateFailed => config.de_escalate_failed,
        Outcome::SevereInjury => config.severe_injury,
        Outcome::TicketSuccess => config.ticket_success,
        Outcome::TicketInvalid => config.ticket_invalid,
        Outcome::ReportSuccess => config.report_success,
        Outcome::WarrantSuccess => config.warrant_success,
        Outcome::WhistleblowSuccess => config.whistleblow_success,
        Outcome::Success => currency(scenario.offer) * config.success_multiplier,
        Outcome::ExtortionSuccess => config.extortion_success,
        Outcome::FrameSuccess => config.frame_success,
        Outcome::TipOffSuccess => config.tip_off_success,
        Outcome::TipOffUseless => config.tip_off_useless,
        Outcome::DestroySuccess => config.destroy_success,
        Outcome::IntimidateSuccess => config.intimidate_success,
        Outcome::IntimidateUseless => config.intimidate_useless,
        Outcome::StealSuccess => currency(scenario.seized_value),
        Outcome::StealUseless => config.steal_useless,
        Outcome::BrutalitySuccess => config.brutality_success,
        Outcome::IsolateSuccess => config.isolate_success,
        Outcome::IsolateUseless => config.isolate_useless,
        Outcome::Caught => config.caught,
    }
}

/// Monetary value of an outcome: the offer for a bribe or extortion, else 0.
pub const fn outcome_value(outcome: Outcome, scenario: &Scenario) -> u64 {
    if outcome.pays_offer() {
        scenario.offer
    } else {
        0
    }
}

const fn default_arrest_success() -> f64 {
    50.0
}

const fn default_arrest_failed() -> f64 {
    -100.0
}

const fn default_investigate_success() -> f64 {
    10.0
}

const fn default_de_escalate_success() -> f64 {
    20.0
}

const fn default_de_escalate_failed() -> f64 {
    -200.0
}

const fn default_severe_injury() -> f64 {
    -2_000.0
}

const fn default_ticket_success() -> f64 {
    15.0
}

const fn default_ticket_invalid() -> f64 {
    -50.0
}

const fn default_report_success() -> f64 {
    30.0
}

const fn default_warrant_success() -> f64 {
    10.0
}

const fn default_whistleblow_success() -> f64 {
    100.0
}

const fn default_success_multiplier() -> f64 {
    5.0
}

const fn default_extortion_success() -> f64 {
    500.0
}

const fn default_frame_success() -> f64 {
    200.0
}

const fn default_tip_off_success() -> f64 {
    150.0
}

const fn default_destroy_success() -> f64 {
    100.0
}

const fn default_intimidate_success() -> f64 {
    100.0
}

const fn default_brutality_success() -> f64 {
    50.0
}

const fn default_isolate_success() -> f64 {
    20.0
}

const fn default_useless() -> f64 {
    -50.0
}

const fn default_caught() -> f64 {
    -200.0
}

#[cfg(test)]
mod tests {
    use precinct_types::CrimeType;

    use super::*;

    #[test]
    fn bribe_pays_offer_times_multiplier() {
        let mut scenario = Scenario::quiet(CrimeType::Burglary);
        scenario.offer = 1_200;
        let reward = officer_reward(&RewardConfig::default(), Outcome::Success, &scenario);
        assert!((reward - 6_000.0).abs() < 1e-9);
        assert_eq!(outcome_value(Outcome::Success, &scenario), 1_200);
        assert_eq!(outcome_value(Outcome::ExtortionSuccess, &scenario), 1_200);
        assert_eq!(outcome_value(Outcome::FrameSuccess, &scenario), 0);
    }

    #[test]
    fn steal_pays_seized_value() {
        let mut scenario = Scenario::quiet(CrimeType::DrugDealing);
        scenario.seized_value = 7_500;
        let reward = officer_reward(&RewardConfig::default(), Outcome::StealSuccess, &scenario);
        assert!((reward - 7_500.0).abs() < 1e-9);
    }

    #[test]
    fn literal_rewards_match_table() {
        let config = RewardConfig::default();
        let scenario = Scenario::quiet(CrimeType::Speeding);
        let expect = [
            (Outcome::Caught, -200.0),
            (Outcome::SevereInjury, -2_000.0),
            (Outcome::IsolateUseless, -50.0),
            (Outcome::IsolateSuccess, 20.0),
            (Outcome::TicketSuccess, 15.0),
            (Outcome::ExtortionSuccess, 500.0),
            (Outcome::TipOffSuccess, 150.0),
        ];
        for (outcome, reward) in expect {
            assert!(
                (officer_reward(&config, outcome, &scenario) - reward).abs() < f64::EPSILON,
                "{outcome}"
            );
        }
    }
}
