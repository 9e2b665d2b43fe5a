//! Parameter group of a convolutional layer.

use crate::optimizers::{ParamCache, UpdateContext, UpdateStrategy};

/// One convolution filter: a `channels`×`size`×`size` weight volume plus a bias,
/// and the maps it produced over the output grid on the latest pass.
///
/// Weights are stored flat, channel-major, so the weight at
/// `(channel, ky, kx)` lives at `channel * size² + ky * size + kx`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub channels: usize,
    pub size: usize,
    pub bias: f64,
    pub weights: Vec<f64>,
    pub bias_cache: ParamCache,
    pub weight_caches: Vec<ParamCache>,
    pub delta_bias: f64,
    pub delta_weights: Vec<f64>,
    pub sum_map: Vec<f64>,
    pub activation_map: Vec<f64>,
    pub error_map: Vec<f64>,
    pub dropout_map: Vec<bool>,
    pub rrelu_slope: f64,
}

impl Filter {
    pub fn new(channels: usize, size: usize, weights: Vec<f64>, out_cells: usize) -> Self {
        debug_assert_eq!(weights.len(), channels * size * size);
        let count = weights.len();
        Self {
            channels,
            size,
            bias: 0.0,
            weights,
            bias_cache: ParamCache::default(),
            weight_caches: vec![ParamCache::default(); count],
            delta_bias: 0.0,
            delta_weights: vec![0.0; count],
            sum_map: vec![0.0; out_cells],
            activation_map: vec![0.0; out_cells],
            error_map: vec![0.0; out_cells],
            dropout_map: vec![false; out_cells],
            rrelu_slope: 0.0,
        }
    }

    /// Flat offset of `(channel, ky, kx)` in the weight volume.
    #[inline]
    pub fn weight_index(&self, channel: usize, ky: usize, kx: usize) -> usize {
        (channel * self.size + ky) * self.size + kx
    }

    /// The weight volume as nested `[channel][ky][kx]` vectors.
    pub fn weight_volume(&self) -> Vec<Vec<Vec<f64>>> {
        self.weights
            .chunks(self.size * self.size)
            .map(|map| map.chunks(self.size).map(<[f64]>::to_vec).collect())
            .collect()
    }

    pub fn reset_deltas(&mut self) {
        self.delta_bias = 0.0;
        self.delta_weights.iter_mut().for_each(|d| *d = 0.0);
    }

    /// Same contract as [`crate::layers::Neuron::apply_deltas`].
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
