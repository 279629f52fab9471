//! Error types for the data layer.

/// Errors raised by a store. Never fatal to the simulation.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row or blob could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused or could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
