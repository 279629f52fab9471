//! Enumeration types for the Precinct simulation.
//!
//! The action and outcome sets are closed: every officer action maps to a
//! fixed position in the 16-slot action space used by the learned policies,
//! and every outcome carries a fixed reward in the reward table.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles and personalities
// ---------------------------------------------------------------------------

/// The capability class of an agent on the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The singleton chief who punishes escalated officers.
    Controller,
    /// The singleton internal-affairs detective who audits officers.
    Detective,
    /// A learning officer that may take corrupt actions.
    CorruptOfficer,
    /// A rule-based officer that never takes corrupt actions.
    HonestOfficer,
}

impl Role {
    /// Whether the role can never be executed.
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::Controller | Self::Detective)
    }

    /// Whether the role faces scenarios in the episode loop.
    pub const fn is_officer(self) -> bool {
        matches!(self, Self::CorruptOfficer | Self::HonestOfficer)
    }

    /// Rank title stored in the roster registry.
    pub const fn rank(self) -> &'static str {
        match self {
            Self::Controller => "Chief",
            Self::Detective => "Detective",
            Self::CorruptOfficer | Self::HonestOfficer => "Officer",
        }
    }
}

/// Behavioural flavour of a corrupt officer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Chases the largest payoff.
    Greedy,
    /// Avoids visible risk.
    Cautious,
    /// Assumes it is always being watched.
    Paranoid,
}

impl Personality {
    /// Every personality, in sampling order.
    pub const ALL: [Self; 3] = [Self::Greedy, Self::Cautious, Self::Paranoid];

    /// Lowercase label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Cautious => "cautious",
            Self::Paranoid => "paranoid",
        }
    }
}

// ---------------------------------------------------------------------------
// Crime catalogue
// ---------------------------------------------------------------------------

/// Economic standing of a suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WealthTier {
    /// Suspect wealth is half the asset value.
    Poor,
    /// Suspect wealth equals the asset value.
    Middle,
    /// Suspect wealth is three times the asset value.
    Rich,
}

impl WealthTier {
    /// Every tier, in sampling order.
    pub const ALL: [Self; 3] = [Self::Poor, Self::Middle, Self::Rich];

    /// Multiplier applied to the asset value to obtain suspect wealth.
    pub const fn factor(self) -> f64 {
        match self {
            Self::Poor => 0.5,
            Self::Middle => 1.0,
            Self::Rich => 3.0,
        }
    }
}

/// Category of the crime a scenario is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrimeType {
    /// Severity 1.
    Speeding,
    /// Severity 1.
    Jaywalking,
    /// Severity 2.
    Shoplifting,
    /// Severity 3.
    Vandalism,
    /// Severity 5.
    DrunkDriving,
    /// Severity 6.
    Assault,
    /// Severity 7.
    Burglary,
    /// Severity 8.
    DrugDealing,
    /// Severity 9.
    ArmedRobbery,
    /// Severity 10.
    Murder,
}

impl CrimeType {
    /// Every category, in sampling order.
    pub const ALL: [Self; 10] = [
        Self::Speeding,
        Self::Jaywalking,
        Self::Shoplifting,
        Self::Vandalism,
        Self::DrunkDriving,
        Self::Assault,
        Self::Burglary,
        Self::DrugDealing,
        Self::ArmedRobbery,
        Self::Murder,
    ];

    /// Severity on the 1-10 scale.
    pub const fn severity(self) -> u8 {
        match self {
            Self::Speeding | Self::Jaywalking => 1,
            Self::Shoplifting => 2,
            Self::Vandalism => 3,
            Self::DrunkDriving => 5,
            Self::Assault => 6,
            Self::Burglary => 7,
            Self::DrugDealing => 8,
            Self::ArmedRobbery => 9,
            Self::Murder => 10,
        }
    }

    /// Base value range `(min, max)` before the asset multiplier is applied.
    pub const fn base_value_range(self) -> (u64, u64) {
        match self {
            Self::Speeding => (50, 200),
            Self::Jaywalking => (10, 50),
            Self::Shoplifting => (50, 500),
            Self::Vandalism => (100, 1_000),
            Self::DrunkDriving => (500, 5_000),
            Self::Assault => (500, 2_000),
            Self::Burglary => (1_000, 10_000),
            Self::DrugDealing => (2_000, 50_000),
            Self::ArmedRobbery => (5_000, 100_000),
            Self::Murder => (10_000, 1_000_000),
        }
    }

    /// Display label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Speeding => "Speeding",
            Self::Jaywalking => "Jaywalking",
            Self::Shoplifting => "Shoplifting",
            Self::Vandalism => "Vandalism",
            Self::DrunkDriving => "Drunk_Driving",
            Self::Assault => "Assault",
            Self::Burglary => "Burglary",
            Self::DrugDealing => "Drug_Dealing",
            Self::ArmedRobbery => "Armed_Robbery",
            Self::Murder => "Murder",
        }
    }
}

// ---------------------------------------------------------------------------
// Officer actions
// ---------------------------------------------------------------------------

/// One of the 16 actions an officer can take on a scenario.
///
/// The first seven are lawful, the remaining nine corrupt. The declaration
/// order is the action index used by the learned policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfficerAction {
    /// Arrest the suspect.
    Arrest,
    /// Open an investigation.
    Investigate,
    /// Talk the suspect down.
    DeEscalate,
    /// Write a ticket for a minor offence.
    IssueTicket,
    /// Report the bribe attempt.
    ReportBribe,
    /// Ask a judge for a warrant.
    RequestWarrant,
    /// Blow the whistle on colleagues.
    Whistleblow,
    /// Take the offered bribe.
    AcceptBribe,
    /// Demand money from the suspect.
    Extort,
    /// Frame the suspect with planted evidence.
    PlantEvidence,
    /// Warn a gang about an upcoming raid.
    TipOff,
    /// Destroy case evidence.
    DestroyEvidence,
    /// Lean on witnesses.
    IntimidateWitness,
    /// Pocket seized assets.
    StealSeized,
    /// Beat the suspect.
    ExcessiveForce,
    /// Move the suspect away from witnesses. Mutates the scenario.
    IsolateSuspect,
}

impl OfficerAction {
    /// Size of the action space.
    pub const COUNT: usize = 16;

    /// Number of lawful actions at the front of [`Self::ALL`].
    pub const LAWFUL_COUNT: usize = 7;

    /// Every action in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Arrest,
        Self::Investigate,
        Self::DeEscalate,
        Self::IssueTicket,
        Self::ReportBribe,
        Self::RequestWarrant,
        Self::Whistleblow,
        Self::AcceptBribe,
        Self::Extort,
        Self::PlantEvidence,
        Self::TipOff,
        Self::DestroyEvidence,
        Self::IntimidateWitness,
        Self::StealSeized,
        Self::ExcessiveForce,
        Self::IsolateSuspect,
    ];

    /// Position in the action space.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up an action by its position in the action space.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether the action is lawful.
    pub const fn is_lawful(self) -> bool {
        (self as usize) < Self::LAWFUL_COUNT
    }

    /// Upper-case label used in history rows.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Arrest => "ARREST",
            Self::Investigate => "INVESTIGATE",
            Self::DeEscalate => "DE_ESCALATE",
            Self::IssueTicket => "ISSUE_TICKET",
            Self::ReportBribe => "REPORT_BRIBE",
            Self::RequestWarrant => "REQUEST_WARRANT",
            Self::Whistleblow => "WHISTLEBLOW",
            Self::AcceptBribe => "ACCEPT_BRIBE",
            Self::Extort => "EXTORT",
            Self::PlantEvidence => "PLANT_EVIDENCE",
            Self::TipOff => "TIP_OFF",
            Self::DestroyEvidence => "DESTROY_EVIDENCE",
            Self::IntimidateWitness => "INTIMIDATE_WITNESS",
            Self::StealSeized => "STEAL_SEIZED",
            Self::ExcessiveForce => "EXCESSIVE_FORCE",
            Self::IsolateSuspect => "ISOLATE_SUSPECT",
        }
    }
}

impl core::fmt::Display for OfficerAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of resolving one officer action against a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The suspect was taken into custody.
    ArrestSuccess,
    /// The arrest fell apart.
    ArrestFailed,
    /// The investigation was opened.
    InvestigateSuccess,
    /// The suspect calmed down.
    DeEscalateSuccess,
    /// The suspect did not calm down.
    DeEscalateFailed,
    /// The officer was badly hurt.
    SevereInjury,
    /// The ticket stuck.
    TicketSuccess,
    /// The offence was too serious for a ticket.
    TicketInvalid,
    /// The bribe attempt was reported.
    ReportSuccess,
    /// A warrant was issued.
    WarrantSuccess,
    /// The whistleblow was heard.
    WhistleblowSuccess,
    /// The bribe was pocketed undetected.
    Success,
    /// The extortion paid out.
    ExtortionSuccess,
    /// The frame held.
    FrameSuccess,
    /// The gang got the warning.
    TipOffSuccess,
    /// There was no gang to warn.
    TipOffUseless,
    /// The evidence is gone.
    DestroySuccess,
    /// The witnesses went quiet.
    IntimidateSuccess,
    /// There were no witnesses to intimidate.
    IntimidateUseless,
    /// Seized assets were pocketed.
    StealSuccess,
    /// Nothing had been seized.
    StealUseless,
    /// Force was used without consequence.
    BrutalitySuccess,
    /// The suspect was isolated from witnesses. Non-terminal.
    IsolateSuccess,
    /// There were no witnesses to isolate from.
    IsolateUseless,
    /// A corrupt act was detected.
    Caught,
}

impl Outcome {
    /// Whether the outcome is a successful unlawful act.
    pub const fn is_corrupt_success(self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::ExtortionSuccess
                | Self::FrameSuccess
                | Self::TipOffSuccess
                | Self::DestroySuccess
                | Self::IntimidateSuccess
                | Self::StealSuccess
                | Self::BrutalitySuccess
                | Self::IsolateSuccess
        )
    }

    /// Whether the outcome carries the scenario's offer as its monetary value.
    pub const fn pays_offer(self) -> bool {
        matches!(self, Self::Success | Self::ExtortionSuccess)
    }

    /// Lowercase label used in history rows.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ArrestSuccess => "arrest_success",
            Self::ArrestFailed => "arrest_failed",
            Self::InvestigateSuccess => "investigate_success",
            Self::DeEscalateSuccess => "de_escalate_success",
            Self::DeEscalateFailed => "de_escalate_failed",
            Self::SevereInjury => "severe_injury",
            Self::TicketSuccess => "ticket_success",
            Self::TicketInvalid => "ticket_invalid",
            Self::ReportSuccess => "report_success",
            Self::WarrantSuccess => "warrant_success",
            Self::WhistleblowSuccess => "whistleblow_success",
            Self::Success => "success",
            Self::ExtortionSuccess => "extortion_success",
            Self::FrameSuccess => "frame_success",
            Self::TipOffSuccess => "tip_off_success",
            Self::TipOffUseless => "tip_off_useless",
            Self::DestroySuccess => "destroy_success",
            Self::IntimidateSuccess => "intimidate_success",
            Self::IntimidateUseless => "intimidate_useless",
            Self::StealSuccess => "steal_success",
            Self::StealUseless => "steal_useless",
            Self::BrutalitySuccess => "brutality_success",
            Self::IsolateSuccess => "isolate_success",
            Self::IsolateUseless => "isolate_useless",
            Self::Caught => "caught",
        }
    }
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// The detective's binary audit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectiveAction {
    /// Close the file.
    Ignore,
    /// Send the case to the controller.
    Escalate,
}

impl DetectiveAction {
    /// Every action in index order.
    pub const ALL: [Self; 2] = [Self::Ignore, Self::Escalate];

    /// Position in the action space.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up an action by its position in the action space.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Upper-case name used in logs and investigation summaries.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ignore => "IGNORE",
            Self::Escalate => "ESCALATE",
        }
    }
}

/// The controller's punishment decision for an escalated case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerAction {
    /// Execute the officer and spawn a replacement.
    Execute,
    /// Strip the officer's wealth and standing.
    Fire,
    /// Issue a warning on file.
    Warning,
}

impl ControllerAction {
    /// Every action in index order.
    pub const ALL: [Self; 3] = [Self::Execute, Self::Fire, Self::Warning];

    /// Position in the action space.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up an action by its position in the action space.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Upper-case name used in logs and investigation summaries.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Execute => "EXECUTE",
            Self::Fire => "FIRE",
            Self::Warning => "WARNING",
        }
    }
}

/// Strength of the case the detective hands to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceGrade {
    /// No escalation took place.
    None,
    /// Circumstantial.
    Weak,
    /// Suggestive.
    Moderate,
    /// Damning.
    Strong,
}

impl EvidenceGrade {
    /// Feature value the controller sees for this grade.
    pub const fn strength(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Weak => 0.3,
            Self::Moderate => 0.6,
            Self::Strong => 1.0,
        }
    }

    /// Lower-case name used in investigation summaries.
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Registry status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// On the active roster.
    Active,
    /// Dismissed from the force.
    Fired,
    /// Executed on the controller's decision.
    Executed,
    /// Executed by a manual operator command.
    ExecutedByPlayer,
}

/// Who ordered an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionReason {
    /// The controller's punishment decision.
    ControllerDecision,
    /// A manual operator command.
    OperatorCommand,
}

impl ExecutionReason {
    /// Registry status recorded for the executed agent.
    pub const fn status(self) -> AgentStatus {
        match self {
            Self::ControllerDecision => AgentStatus::Executed,
            Self::OperatorCommand => AgentStatus::ExecutedByPlayer,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn action_space_splits_lawful_and_corrupt() {
        let lawful = OfficerAction::ALL.iter().filter(|a| a.is_lawful()).count();
        assert_eq!(lawful, 7);
        assert_eq!(OfficerAction::ALL.len().saturating_sub(lawful), 9);
        assert!(!OfficerAction::IsolateSuspect.is_lawful());
        assert!(OfficerAction::Whistleblow.is_lawful());
    }

    #[test]
    fn action_index_round_trips() {
        for (i, action) in OfficerAction::ALL.iter().enumerate() {
            assert_eq!(action.index(), i);
            assert_eq!(OfficerAction::from_index(i), Some(*action));
        }
        assert_eq!(OfficerAction::from_index(16), None);
    }

    #[test]
    fn crime_catalogue_ranges_are_ordered() {
        for crime in CrimeType::ALL {
            let (lo, hi) = crime.base_value_range();
            assert!(lo < hi, "{crime:?}");
            assert!((1..=10).contains(&crime.severity()));
        }
    }

    #[test]
    fn only_offer_outcomes_pay_offer() {
        assert!(Outcome::Success.pays_offer());
        assert!(Outcome::ExtortionSuccess.pays_offer());
        assert!(!Outcome::StealSuccess.pays_offer());
        assert!(Outcome::StealSuccess.is_corrupt_success());
        assert!(!Outcome::ArrestSuccess.is_corrupt_success());
    }

    #[test]
    fn outcome_labels_serialize_snake_case() {
        let json = serde_json::to_string(&Outcome::TipOffUseless).unwrap();
        assert_eq!(json, "\"tip_off_useless\"");
        assert_eq!(Outcome::TipOffUseless.label(), "tip_off_useless");
    }
}
