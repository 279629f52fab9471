//! The rule-based honest officer.

use chrono::Utc;
use precinct_types::{
    AgentId, AgentProfile, AgentStatus, EpisodeContext, OfficerAction, Outcome, Role, RosterRow,
    Scenario,
};

use crate::agent::Officer;
use crate::error::AgentError;

/// Severity at which an honest officer goes straight for an arrest or warrant.
const SERIOUS_SEVERITY: u8 = 8;
/// Highest severity handled with a ticket.
const PETTY_SEVERITY: u8 = 3;

/// An officer who follows a fixed rule ladder and never learns.
#[derive(Debug, Clone, PartialEq)]
pub struct HonestOfficer {
    id: AgentId,
    name: String,
    loyalty_score: f64,
    times_caught: u32,
    reports_filed: u32,
    wealth: f64,
    offer_threshold: u64,
}

impl HonestOfficer {
    /// Create an honest officer. Offers above `offer_threshold` are
    /// treated as bribe attempts.
    pub fn new(id: AgentId, offer_threshold: u64, loyalty_score: f64) -> Self {
        Self {
            id,
            name: format!("Officer_{id}"),
            loyalty_score: loyalty_score.clamp(0.0, 100.0),
            times_caught: 0,
            reports_filed: 0,
            wealth: 0.0,
            offer_threshold,
        }
    }

    /// Rebuild an honest officer from its registry row.
    pub fn from_row(row: &RosterRow, offer_threshold: u64) -> Result<Self, AgentError> {
        if row.role != Role::HonestOfficer {
            return Err(AgentError::RoleMismatch {
                id: row.id,
                role: row.role,
                expected: Role::HonestOfficer,
            });
        }
        Ok(Self {
            id: row.id,
            name: row.name.clone(),
            loyalty_score: row.loyalty_score.clamp(0.0, 100.0),
            times_caught: row.times_caught,
            reports_filed: row.times_bribed,
            wealth: row.total_money_earned,
            offer_threshold,
        })
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bribe attempts and colleagues reported.
    pub const fn reports_filed(&self) -> u32 {
        self.reports_filed
    }

    /// Change the bribe-attempt threshold (runtime tunable overrides).
    pub const fn set_offer_threshold(&mut self, offer_threshold: u64) {
        self.offer_threshold = offer_threshold;
    }

    /// Zero wealth and count a capture.
    pub const fn apply_dismissal(&mut self) {
        self.wealth = 0.0;
        self.times_caught = self.times_caught.saturating_add(1);
    }

    /// Count a warning on file.
    pub const fn apply_warning(&mut self) {
        self.times_caught = self.times_caught.saturating_add(1);
    }

    /// The rule ladder.
    pub fn choose(&self, s: &Scenario) -> OfficerAction {
        if s.severity >= SERIOUS_SEVERITY {
            if s.has_warrant || s.evidence_strength > 0.6 {
                OfficerAction::Arrest
            } else {
                OfficerAction::RequestWarrant
            }
        } else if s.offer > self.offer_threshold {
            if s.evidence_strength > 0.5 {
                OfficerAction::Arrest
            } else {
                OfficerAction::ReportBribe
            }
        } else if s.severity <= PETTY_SEVERITY {
            OfficerAction::IssueTicket
        } else if s.evidence_strength > 0.7 {
            OfficerAction::Arrest
        } else {
            OfficerAction::Investigate
        }
    }

    /// Registry row for this officer. Reports filed are stored in the
    /// corrupt-act counter column.
    pub fn roster_row(&self, status: AgentStatus) -> RosterRow {
        RosterRow {
            id: self.id,
            name: self.name.clone(),
            role: Role::HonestOfficer,
            rank: Role::HonestOfficer.rank().to_owned(),
            personality: None,
            corruption_score: 0.0,
            loyalty_score: self.loyalty_score,
            paranoia_level: 0.0,
            times_caught: self.times_caught,
            times_bribed: self.reports_filed,
            total_money_earned: self.wealth,
            last_caught_episode: None,
            status,
            updated_at: Utc::now(),
        }
    }
}

impl Officer for HonestOfficer {
    fn id(&self) -> AgentId {
        self.id
    }

    fn decide(&mut self, scenario: &Scenario, _ctx: &mut EpisodeContext) -> OfficerAction {
        self.choose(scenario)
    }

    fn learn(
        &mut self,
        _reward: f64,
        _next: Option<&Scenario>,
        _ctx: &mut EpisodeContext,
    ) -> Option<f64> {
        None
    }

    fn update_stats(&mut self, outcome: Outcome, _value: u64, _ctx: &EpisodeContext) {
        if matches!(outcome, Outcome::ReportSuccess | Outcome::WhistleblowSuccess) {
            self.reports_filed = self.reports_filed.saturating_add(1);
        }
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id,
            role: Role::HonestOfficer,
            corruption_score: 0.0,
            wealth: self.wealth,
            times_caught: self.times_caught,
            loyalty: self.loyalty_score,
        }
    }
}
