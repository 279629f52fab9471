//! Serializable learned state.
//!
//! A [`LearnedState`] is the blob stored per learning agent: network
//! parameters, optimizer moments, and the current exploration rate. The
//! replay buffer is not part of it.

use serde::{Deserialize, Serialize};

use super::network::QNetwork;
use super::optimizer::Adam;

/// Errors raised when a learned-state blob cannot be used.
///
/// Callers treat every variant as non-fatal and fall back to a fresh policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    /// The blob is not valid JSON for a learned state.
    #[error("learned state could not be decoded: {source}")]
    Decode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The blob decoded but its tensors are inconsistent or non-finite.
    #[error("learned state is corrupt: {reason}")]
    Corrupt {
        /// What was wrong with it.
        reason: String,
    },

    /// The blob exists but could not be read.
    #[error("learned state could not be read: {reason}")]
    Unreadable {
        /// What went wrong.
        reason: String,
    },

    /// The blob belongs to a network of a different shape.
    #[error("learned state has dimensions {found:?}, expected {expected:?}")]
    Incompatible {
        /// `(inputs, hidden, outputs)` of the receiving policy.
        expected: (usize, usize, usize),
        /// `(inputs, hidden, outputs)` in the blob.
        found: (usize, usize, usize),
    },
}

/// Everything needed to resume a learned policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedState {
    /// Live network parameters.
    pub network: QNetwork,
    /// Optimizer moments.
    pub optimizer: Adam,
    /// Exploration rate at save time.
    pub epsilon: f64,
    /// Updates applied so far (drives target synchronisation).
    pub updates: u64,
}

impl LearnedState {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode and validate a JSON blob.
    pub fn from_json(blob: &str) -> Result<Self, PolicyLoadError> {
        let state: Self = serde_json::from_str(blob)?;
        state.validate()?;
        Ok(state)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), PolicyLoadError> {
        if !self.network.is_well_formed() {
            return Err(PolicyLoadError::Corrupt {
                reason: String::from("network tensors do not match declared dimensions"),
            });
        }
        if !self.optimizer.fits(self.network.params()) {
            return Err(PolicyLoadError::Corrupt {
                reason: String::from("optimizer moments do not match network shape"),
            });
        }
        if !self.epsilon.is_finite() {
            return Err(PolicyLoadError::Corrupt {
                reason: String::from("exploration rate is not finite"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn state() -> LearnedState {
        let mut rng = StdRng::seed_from_u64(2);
        let network = QNetwork::new(4, 6, 3, &mut rng);
        let optimizer = Adam::new(0.001, network.params());
        LearnedState {
            network,
            optimizer,
            epsilon: 0.25,
            updates: 12,
        }
    }

    #[test]
    fn json_blob_restores_identically() {
        let original = state();
        let blob = original.to_json().unwrap();
        let restored = LearnedState::from_json(&blob).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn garbage_blob_is_a_decode_error() {
        let err = LearnedState::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PolicyLoadError::Decode { .. }));
    }

    #[test]
    fn truncated_tensor_is_corrupt() {
        let mut value: serde_json::Value = serde_json::to_value(state()).unwrap();
        value["network"]["params"]["b1"] = serde_json::json!([0.0]);
        let err = LearnedState::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PolicyLoadError::Corrupt { .. }));
    }
}
