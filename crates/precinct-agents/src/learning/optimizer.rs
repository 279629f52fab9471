//! Adam optimizer state.

use serde::{Deserialize, Serialize};

use super::network::Parameters;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Adam with bias correction. The moment estimates are part of the learned
/// state and travel with the network through save/restore and inheritance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f64,
    beta1_power: f64,
    beta2_power: f64,
    steps: u64,
    first_moment: Parameters,
    second_moment: Parameters,
}

impl Adam {
    /// Fresh optimizer for parameters shaped like `template`.
    pub fn new(learning_rate: f64, template: &Parameters) -> Self {
        Self {
            learning_rate,
            beta1_power: 1.0,
            beta2_power: 1.0,
            steps: 0,
            first_moment: Parameters::zeros_like(template),
            second_moment: Parameters::zeros_like(template),
        }
    }

    /// Current step size.
    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Change the step size without resetting the moments.
    pub const fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Number of updates applied.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether the moment buffers fit parameters shaped like `template`.
    pub fn fits(&self, template: &Parameters) -> bool {
        self.first_moment.same_shape(template) && self.second_moment.same_shape(template)
    }

    /// Apply one update to `params` from `grads`.
    pub fn step(&mut self, params: &mut Parameters, grads: &Parameters) {
        self.steps = self.steps.saturating_add(1);
        self.beta1_power *= BETA1;
        self.beta2_power *= BETA2;
        let correction1 = 1.0 - self.beta1_power;
        let correction2 = 1.0 - self.beta2_power;
        let lr = self.learning_rate;

        let layers = params
            .tensors_mut()
            .into_iter()
            .zip(grads.tensors())
            .zip(self.first_moment.tensors_mut())
            .zip(self.second_moment.tensors_mut());
        for (((p, g), m), v) in layers {
            let elements = p
                .iter_mut()
                .zip(g)
                .zip(m.iter_mut())
                .zip(v.iter_mut());
            for (((pi, gi), mi), vi) in elements {
                *mi = BETA1.mul_add(*mi, (1.0 - BETA1) * gi);
                *vi = BETA2.mul_add(*vi, (1.0 - BETA2) * gi * gi);
                let m_hat = *mi / correction1;
                let v_hat = *vi / correction2;
                *pi -= lr * m_hat / (v_hat.sqrt() + EPSILON);
            }
        }
    }
}
