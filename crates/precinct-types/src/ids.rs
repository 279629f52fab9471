//! Type-safe identifier wrappers.
//!
//! Agents are keyed by a plain integer that only ever grows: a replacement
//! is always registered under `max + 1`, so an id is never reused within a
//! run. Runs themselves are tagged with a UUID v7 so persisted rows from
//! different sessions can be told apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an agent on the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Return the inner integer value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// The id that follows this one, or `None` if the id space is exhausted.
    pub const fn successor(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Unique identifier for one simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new run identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn successor_increments() {
        assert_eq!(AgentId(8).successor(), Some(AgentId(9)));
        assert_eq!(AgentId(u64::MAX).successor(), None);
    }

    #[test]
    fn agent_id_serializes_as_integer() {
        let json = serde_json::to_string(&AgentId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
