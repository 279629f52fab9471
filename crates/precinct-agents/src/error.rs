//! Error types for the precinct-agents crate.

use precinct_types::{AgentId, Role};

/// Errors raised when rebuilding or addressing agents.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A registry row describes a role that cannot be rebuilt this way.
    #[error("agent {id} has role {role:?}, expected {expected:?}")]
    RoleMismatch {
        /// The agent the row describes.
        id: AgentId,
        /// The role on the row.
        role: Role,
        /// The role the caller expected.
        expected: Role,
    },

    /// A corrupt officer row is missing its personality.
    #[error("corrupt officer {0} has no personality")]
    MissingPersonality(AgentId),
}
