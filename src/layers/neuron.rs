//! Parameter unit of a dense layer.

use crate::optimizers::{ParamCache, UpdateContext, UpdateStrategy};

/// One output unit of a dense layer.
///
/// Owns a bias, one weight per incoming connection, the optimizer cache for
/// each of them, the mini-batch delta accumulators, and the transient values
/// of the latest forward/backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    pub bias: f64,
    pub weights: Vec<f64>,
    pub bias_cache: ParamCache,
    pub weight_caches: Vec<ParamCache>,
    pub delta_bias: f64,
    pub delta_weights: Vec<f64>,
    pub sum: f64,
    pub activation: f64,
    pub error: f64,
    pub derivative: f64,
    pub dropped: bool,
    /// Negative slope used when the layer's activation is rrelu.
    pub rrelu_slope: f64,
}

impl Neuron {
    /// A unit with the given incoming weights and a zero bias.
    pub fn new(weights: Vec<f64>) -> Self {
        let fan_in = weights.len();
        Self {
            bias: 0.0,
            weights,
            bias_cache: ParamCache::default(),
            weight_caches: vec![ParamCache::default(); fan_in],
            delta_bias: 0.0,
            delta_weights: vec![0.0; fan_in],
            sum: 0.0,
            activation: 0.0,
            error: 0.0,
            derivative: 0.0,
            dropped: false,
            rrelu_slope: 0.0,
        }
    }

    /// Unit of an input layer: no incoming weights.
    pub fn input() -> Self {
        Self::new(Vec::new())
    }

    /// `bias + Σ weights[i] * inputs[i]`, pairing by index.
    pub fn weighted_sum(&self, inputs: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(inputs)
            .fold(self.bias, |acc, (w, x)| acc + w * x)
    }

    /// Add this iteration's gradient to the accumulators.
    ///
    /// `decay` maps a weight to its regularisation term, already divided by
    /// the mini-batch size.
    pub fn accumulate(&mut self, inputs: &[f64], decay: impl Fn(f64) -> f64) {
        self.delta_bias += self.error;
        for ((delta, &w), &x) in self.delta_weights.iter_mut().zip(&self.weights).zip(inputs) {
            *delta += self.error * x - decay(w);
        }
    }

    pub fn reset_deltas(&mut self) {
        self.delta_bias = 0.0;
        self.delta_weights.iter_mut().for_each(|d| *d = 0.0);
    }

    /// Apply the accumulated deltas through `strategy`, returning the sum of
    /// absolute weights and the sum of squared weights seen before the update.
    pub fn apply_deltas(&mut self, strategy: UpdateStrategy, ctx: &UpdateContext) -> (f64, f64) {
        self.bias = strategy.apply(self.bias, self.delta_bias, &mut self.bias_cache, ctx);

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for ((w, &delta), cache) in self
            .weights
            .iter_mut()
            .zip(&self.delta_weights)
            .zip(self.weight_caches.iter_mut())
        {
            abs_sum += w.abs();
            sq_sum += *w * *w;
            *w = strategy.apply(*w, delta, cache, ctx);
        }
        (abs_sum, sq_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_sum_includes_bias() {
        let mut neuron = Neuron::new(vec![0.5, -1.0]);
        neuron.bias = 0.25;
        assert_eq!(neuron.weighted_sum(&[2.0, 1.0]), 0.25);
    }

    #[test]
    fn test_accumulate_and_reset() {
        let mut neuron = Neuron::new(vec![0.0, 0.0]);
        neuron.error = 0.5;
        neuron.accumulate(&[1.0, 2.0], |_| 0.0);
        neuron.accumulate(&[1.0, 2.0], |_| 0.0);
        assert_eq!(neuron.delta_bias, 1.0);
        assert_eq!(neuron.delta_weights, vec![1.0, 2.0]);

        neuron.reset_deltas();
        assert_eq!(neuron.delta_bias, 0.0);
        assert_eq!(neuron.delta_weights, vec![0.0, 0.0]);
    }

    #[test]
    fn test_caches_mirror_weights() {
        let neuron = Neuron::new(vec![0.1; 7]);
        assert_eq!(neuron.weight_caches.len(), 7);
        assert_eq!(neuron.delta_weights.len(), 7);
    }
}
