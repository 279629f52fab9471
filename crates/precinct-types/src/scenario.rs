//! The situational state an officer must act on.

use serde::{Deserialize, Serialize};

use crate::enums::{CrimeType, WealthTier};

/// One episode's scenario.
///
/// Created fresh every episode by the environment and discarded at the end
/// of it. The only in-place mutation is the isolate-suspect action, which
/// clears witnesses and agitates the suspect before the officer acts again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Category of the crime.
    pub crime: CrimeType,
    /// Severity on the 1-10 scale (taken from the crime category).
    pub severity: u8,
    /// Bribe offered to the officer.
    pub offer: u64,
    /// Value of the assets involved.
    pub asset_value: u64,
    /// Economic standing of the suspect.
    pub wealth_tier: WealthTier,
    /// Suspect wealth derived from the asset value and tier.
    pub suspect_wealth: u64,
    /// Bystanders who can see the officer (0-4).
    pub witnesses: u8,
    /// Whether internal affairs is in the area.
    pub detective_nearby: bool,
    /// Global alert level at scenario creation, in `[0, 1]`.
    pub alert_level: f64,
    /// Strength of the case against the suspect, in `[0, 1]`.
    pub evidence_strength: f64,
    /// Whether a warrant is already in hand.
    pub has_warrant: bool,
    /// Whether the suspect runs with a gang.
    pub gang_affiliated: bool,
    /// Value of assets already seized (0 when nothing was seized).
    pub seized_value: u64,
    /// How violent the suspect is likely to get, in `[0, 1]`.
    pub suspect_aggression: f64,
    /// How exposed the location is, in `[0, 1]`.
    pub location_risk: f64,
}

impl Scenario {
    /// A quiet, low-stakes scenario, handy as a base for targeted tests.
    pub const fn quiet(crime: CrimeType) -> Self {
        Self {
            crime,
            severity: crime.severity(),
            offer: 0,
            asset_value: 0,
            wealth_tier: WealthTier::Middle,
            suspect_wealth: 0,
            witnesses: 0,
            detective_nearby: false,
            alert_level: 0.0,
            evidence_strength: 0.0,
            has_warrant: false,
            gang_affiliated: false,
            seized_value: 0,
            suspect_aggression: 0.0,
            location_risk: 0.0,
        }
    }
}
