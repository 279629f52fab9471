//! Detection risk for corrupt actions.
//!
//! Every corrupt action except isolating the suspect first rolls against the
//! probability of being caught, which sums independent risk signals from
//! the scenario and clamps the total to `[0, 1]`.

use precinct_types::Scenario;
use serde::Deserialize;

/// Weights of the risk signals that feed the caught probability.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiskConfig {
    /// Risk added per witness (default: 0.01).
    #[serde(default = "default_witness_risk")]
    pub witness_risk_factor: f64,

    /// Risk added when internal affairs is nearby (default: 0.20).
    #[serde(default = "default_detective_risk")]
    pub detective_risk_factor: f64,

    /// Weight of the location's exposure (default: 0.10).
    #[serde(default = "default_location_weight")]
    pub location_risk_weight: f64,

    /// Risk added per severity point (default: 0.01).
    #[serde(default = "default_severity_risk")]
    pub severity_risk_factor: f64,

    /// Weight of the global alert level (default: 0.30).
    #[serde(default = "default_alert_risk")]
    pub alert_risk_factor: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            witness_risk_factor: default_witness_risk(),
            detective_risk_factor: default_detective_risk(),
            location_risk_weight: default_location_weight(),
            severity_risk_factor: default_severity_risk(),
            alert_risk_factor: default_alert_risk(),
        }
    }
}

impl RiskConfig {
    /// Probability that a corrupt act in this scenario is detected.
    pub fn caught_probability(&self, scenario: &Scenario) -> f64 {
        let detective = if scenario.detective_nearby {
            self.detective_risk_factor
        } else {
            0.0
        };
        let risk = f64::from(scenario.witnesses).mul_add(self.witness_risk_factor, detective)
            + scenario.location_risk * self.location_risk_weight
            + f64::from(scenario.severity) * self.severity_risk_factor
            + scenario.alert_level * self.alert_risk_factor;
        risk.clamp(0.0, 1.0)
    }
}

const fn default_witness_risk() -> f64 {
    0.01
}

const fn default_detective_risk() -> f64 {
    0.20
}

const fn default_location_weight() -> f64 {
    0.10
}

const fn default_severity_risk() -> f64 {
    0.01
}

const fn default_alert_risk() -> f64 {
    0.30
}

#[cfg(test)]
mod tests {
    use precinct_types::CrimeType;

    use super::*;

    #[test]
    fn quiet_scenario_carries_only_severity_risk() {
        let risk = RiskConfig::default();
        let scenario = Scenario::quiet(CrimeType::Speeding);
        let p = risk.caught_probability(&scenario);
        assert!((p - 0.01).abs() < 1e-12);
    }

    #[test]
    fn detective_presence_dominates() {
        let risk = RiskConfig::default();
        let mut scenario = Scenario::quiet(CrimeType::Speeding);
        scenario.detective_nearby = true;
        scenario.witnesses = 4;
        let p = risk.caught_probability(&scenario);
        assert!((p - 0.25).abs() < 1e-12);
    }

    #[test]
    fn probability_is_clamped() {
        let risk = RiskConfig {
            alert_risk_factor: 5.0,
            ..RiskConfig::default()
        };
        let mut scenario = Scenario::quiet(CrimeType::Murder);
        scenario.alert_level = 1.0;
        assert!((risk.caught_probability(&scenario) - 1.0).abs() < f64::EPSILON);
    }
}
