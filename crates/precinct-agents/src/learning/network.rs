//! Two-layer Q-network with manual backpropagation.
//!
//! `inputs -> hidden (ReLU) -> outputs`, one output per action. Weights are
//! stored row-major in flat vectors so the whole network serializes as a
//! plain JSON object and can be handed to a replacement officer intact.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Weights and biases of both layers. Also reused as the gradient and
/// optimizer-moment containers, which share the network's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Hidden-layer weights, `hidden` rows of `inputs` columns.
    pub w1: Vec<f64>,
    /// Hidden-layer biases.
    pub b1: Vec<f64>,
    /// Output-layer weights, `outputs` rows of `hidden` columns.
    pub w2: Vec<f64>,
    /// Output-layer biases.
    pub b2: Vec<f64>,
}

impl Parameters {
    /// All-zero parameters with the same shape as `template`.
    pub fn zeros_like(template: &Self) -> Self {
        Self {
            w1: vec![0.0; template.w1.len()],
            b1: vec![0.0; template.b1.len()],
            w2: vec![0.0; template.w2.len()],
            b2: vec![0.0; template.b2.len()],
        }
    }

    /// The four tensors in a fixed order.
    pub fn tensors(&self) -> [&[f64]; 4] {
        [
            self.w1.as_slice(),
            self.b1.as_slice(),
            self.w2.as_slice(),
            self.b2.as_slice(),
        ]
    }

    /// The four tensors in a fixed order, mutably.
    pub fn tensors_mut(&mut self) -> [&mut [f64]; 4] {
        [
            self.w1.as_mut_slice(),
            self.b1.as_mut_slice(),
            self.w2.as_mut_slice(),
            self.b2.as_mut_slice(),
        ]
    }

    /// Clamp every element to `[-limit, limit]`.
    pub fn clamp(&mut self, limit: f64) {
        let limit = limit.abs();
        for tensor in self.tensors_mut() {
            for value in tensor.iter_mut() {
                *value = value.clamp(-limit, limit);
            }
        }
    }

    /// Whether `other` has the same tensor lengths.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.tensors()
            .iter()
            .zip(other.tensors())
            .all(|(a, b)| a.len() == b.len())
    }

    /// Whether every element is finite.
    pub fn is_finite(&self) -> bool {
        self.tensors()
            .iter()
            .all(|t| t.iter().all(|v| v.is_finite()))
    }
}

/// Intermediate values of one forward pass.
struct Activations {
    hidden_pre: Vec<f64>,
    hidden: Vec<f64>,
    output: Vec<f64>,
}

/// A small fully connected action-value approximator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    inputs: usize,
    hidden: usize,
    outputs: usize,
    params: Parameters,
}

impl QNetwork {
    /// Create a network with uniform fan-in initialisation.
    ///
    /// Zero-sized layers are raised to one unit.
    pub fn new<R: Rng + ?Sized>(inputs: usize, hidden: usize, outputs: usize, rng: &mut R) -> Self {
        let inputs = inputs.max(1);
        let hidden = hidden.max(1);
        let outputs = outputs.max(1);
        let bound1 = fan_in_bound(inputs);
        let bound2 = fan_in_bound(hidden);
        let mut uniform = |n: usize, bound: f64| -> Vec<f64> {
            (0..n).map(|_| rng.random_range(-bound..=bound)).collect()
        };
        let params = Parameters {
            w1: uniform(hidden.saturating_mul(inputs), bound1),
            b1: uniform(hidden, bound1),
            w2: uniform(outputs.saturating_mul(hidden), bound2),
            b2: uniform(outputs, bound2),
        };
        Self {
            inputs,
            hidden,
            outputs,
            params,
        }
    }

    /// `(inputs, hidden, outputs)`.
    pub const fn dims(&self) -> (usize, usize, usize) {
        (self.inputs, self.hidden, self.outputs)
    }

    /// Current parameters.
    pub const fn params(&self) -> &Parameters {
        &self.params
    }

    /// Current parameters, mutably.
    pub const fn params_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// Overwrite this network's parameters with another's.
    pub fn copy_from(&mut self, other: &Self) {
        self.params.clone_from(&other.params);
    }

    /// Whether the tensor lengths agree with the declared dimensions.
    ///
    /// Deserialized networks must pass this before use.
    pub fn is_well_formed(&self) -> bool {
        let expect = |rows: usize, cols: usize| rows.checked_mul(cols);
        self.inputs > 0
            && self.hidden > 0
            && self.outputs > 0
            && expect(self.hidden, self.inputs) == Some(self.params.w1.len())
            && self.params.b1.len() == self.hidden
            && expect(self.outputs, self.hidden) == Some(self.params.w2.len())
            && self.params.b2.len() == self.outputs
            && self.params.is_finite()
    }

    /// Action values for a state.
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        self.activations(x).output
    }

    fn activations(&self, x: &[f64]) -> Activations {
        let hidden_pre: Vec<f64> = self
            .params
            .w1
            .chunks_exact(self.inputs)
            .zip(&self.params.b1)
            .map(|(row, b)| dot(row, x) + b)
            .collect();
        let hidden: Vec<f64> = hidden_pre.iter().map(|z| z.max(0.0)).collect();
        let output = self
            .params
            .w2
            .chunks_exact(self.hidden)
            .zip(&self.params.b2)
            .map(|(row, b)| dot(row, &hidden) + b)
            .collect();
        Activations {
            hidden_pre,
            hidden,
            output,
        }
    }

    /// Add `d loss / d params` into `grads`, given `d loss / d q[action]`.
    ///
    /// Only the chosen action's output contributes, so only its output row
    /// and the hidden units feeding it receive gradient.
    pub fn accumulate_gradient(
        &self,
        x: &[f64],
        action: usize,
        grad_q: f64,
        grads: &mut Parameters,
    ) {
        let act = self.activations(x);
        let (Some(w2_row), Some(gw2_row), Some(gb2)) = (
            self.params.w2.chunks_exact(self.hidden).nth(action),
            grads.w2.chunks_exact_mut(self.hidden).nth(action),
            grads.b2.get_mut(action),
        ) else {
            return;
        };

        *gb2 += grad_q;
        for (g, h) in gw2_row.iter_mut().zip(&act.hidden) {
            *g += grad_q * h;
        }

        let hidden_grads = grads
            .w1
            .chunks_exact_mut(self.inputs)
            .zip(grads.b1.iter_mut())
            .zip(w2_row.iter().zip(&act.hidden_pre));
        for ((gw1_row, gb1), (w, z)) in hidden_grads {
            if *z <= 0.0 {
                continue;
            }
            let delta = grad_q * w;
            *gb1 += delta;
            for (g, xi) in gw1_row.iter_mut().zip(x) {
                *g += delta * xi;
            }
        }
    }
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if *v > best.1 { (i, *v) } else { best }
        })
        .0
}

/// Largest value, or 0 for an empty slice.
pub fn max_value(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .reduce(f64::max)
        .unwrap_or(0.0)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn fan_in_bound(fan_in: usize) -> f64 {
    u32::try_from(fan_in).map_or(0.0, |n| 1.0 / f64::from(n.max(1)).sqrt())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn net() -> QNetwork {
        let mut rng = StdRng::seed_from_u64(17);
        QNetwork::new(3, 8, 2, &mut rng)
    }

    #[test]
    fn shapes_follow_dims() {
        let n = net();
        assert_eq!(n.dims(), (3, 8, 2));
        assert_eq!(n.params().w1.len(), 24);
        assert_eq!(n.params().w2.len(), 16);
        assert_eq!(n.forward(&[0.1, 0.2, 0.3]).len(), 2);
        assert!(n.is_well_formed());
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let n = net();
        let x = [0.4, -0.2, 0.9];
        let action = 1;
        let mut grads = Parameters::zeros_like(n.params());
        n.accumulate_gradient(&x, action, 1.0, &mut grads);

        let h = 1e-6;
        for i in 0..n.params().w1.len() {
            let mut plus = n.clone();
            let mut minus = n.clone();
            if let Some(w) = plus.params_mut().w1.get_mut(i) {
                *w += h;
            }
            if let Some(w) = minus.params_mut().w1.get_mut(i) {
                *w -= h;
            }
            let q_plus = plus.forward(&x).get(action).copied().unwrap_or_default();
            let q_minus = minus.forward(&x).get(action).copied().unwrap_or_default();
            let numeric = (q_plus - q_minus) / (2.0 * h);
            let analytic = grads.w1.get(i).copied().unwrap_or_default();
            assert!((numeric - analytic).abs() < 1e-5, "w1[{i}]");
        }
    }

    #[test]
    fn argmax_prefers_lowest_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[-1.0]), 0);
        assert!((max_value(&[-4.0, -2.0]) + 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_network_is_rejected() {
        let mut n = net();
        n.params_mut().b2.push(0.0);
        assert!(!n.is_well_formed());
    }

    #[test]
    fn clamp_bounds_every_element() {
        let mut p = net().params().clone();
        for t in p.tensors_mut() {
            for v in t.iter_mut() {
                *v *= 100.0;
            }
        }
        p.clamp(0.5);
        assert!(p.tensors().iter().all(|t| t.iter().all(|v| v.abs() <= 0.5)));
    }
}
