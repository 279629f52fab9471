//! Observable projection and persistence rows.
//!
//! [`AgentProfile`] is the fixed view every role variant can produce; the
//! detective and controller only ever see agents through it. The `*Row`
//! types are what the orchestrator hands to the persistence interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{
    AgentStatus, ControllerAction, CrimeType, DetectiveAction, EvidenceGrade, OfficerAction,
    Outcome, Personality, Role,
};
use crate::ids::{AgentId, RunId};

/// The observable projection of any agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent identifier.
    pub id: AgentId,
    /// Capability class.
    pub role: Role,
    /// Corruption score in `[0, 100]`.
    pub corruption_score: f64,
    /// Accumulated wealth (may be negative after kickbacks).
    pub wealth: f64,
    /// Number of times the agent was caught or punished.
    pub times_caught: u32,
    /// Loyalty score in `[0, 100]`.
    pub loyalty: f64,
}

/// One entry in the roster registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRow {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Capability class.
    pub role: Role,
    /// Rank title.
    pub rank: String,
    /// Personality (corrupt officers only).
    pub personality: Option<Personality>,
    /// Corruption score in `[0, 100]`.
    pub corruption_score: f64,
    /// Loyalty score in `[0, 100]`.
    pub loyalty_score: f64,
    /// Paranoia level in `[0, 1]`.
    pub paranoia_level: f64,
    /// Times caught or punished.
    pub times_caught: u32,
    /// Corrupt acts committed, or reports filed for honest officers.
    pub times_bribed: u32,
    /// Accumulated wealth.
    pub total_money_earned: f64,
    /// Episode of the most recent capture.
    pub last_caught_episode: Option<u64>,
    /// Registry status.
    pub status: AgentStatus,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// One resolved action, appended to the action history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    /// Session the row belongs to.
    pub run_id: RunId,
    /// Global episode number.
    pub episode: u64,
    /// Acting officer.
    pub agent_id: AgentId,
    /// Crime category of the scenario.
    pub crime: CrimeType,
    /// Scenario severity.
    pub severity: u8,
    /// Bribe on offer.
    pub offer: u64,
    /// Action taken.
    pub action: OfficerAction,
    /// Resolved outcome.
    pub outcome: Outcome,
    /// Reward credited to the officer.
    pub reward: f64,
    /// Position of this resolution in the episode's chain (0-based).
    pub chain_position: u8,
    /// When the row was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// One audited target, appended to the investigation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationRow {
    /// Session the row belongs to.
    pub run_id: RunId,
    /// Global episode number.
    pub episode: u64,
    /// Audited officer.
    pub target_id: AgentId,
    /// What the detective did.
    pub detective_action: DetectiveAction,
    /// Evidence handed to the controller.
    pub evidence: EvidenceGrade,
    /// Punishment, when the case was escalated.
    pub controller_action: Option<ControllerAction>,
    /// `detective_action->evidence->controller_action` summary.
    pub summary: String,
    /// When the row was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate statistics emitted at the end of every episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStatsRow {
    /// Session the row belongs to.
    pub run_id: RunId,
    /// Global episode number.
    pub episode: u64,
    /// Mean corruption score across corrupt officers.
    pub mean_corruption: f64,
    /// Mean wealth across corrupt officers.
    pub mean_wealth: f64,
    /// Controller wealth from kickbacks.
    pub controller_wealth: f64,
    /// Size of the corrupt-officer group.
    pub corrupt_officers: u32,
    /// When the row was recorded.
    pub recorded_at: DateTime<Utc>,
}
