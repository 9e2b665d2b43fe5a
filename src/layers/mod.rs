//! Layer abstractions for neural networks
//!
//! A network is a chain of [`Layer`]s. `Layer` is a closed set of variants
//! (dense, convolutional, max pooling) matched exhaustively wherever the
//! behaviour differs, so the backward geometry for each pair of neighbours is
//! resolved by the type system rather than by inspecting layers at run time.
//!
//! Layers never hold references to their neighbours or to the network. The
//! network passes in what a step needs: the predecessor's flat output, the
//! successor's error contribution, and a [`LayerSettings`] snapshot of the
//! network hyper-parameters.

pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod filter;
pub mod neuron;
pub mod pool;

pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutGate;
pub use filter::Filter;
pub use neuron::Neuron;
pub use pool::MaxPoolLayer;

use crate::config::{ConvDefaults, PoolDefaults};
use crate::error::Result;
use crate::network::snapshot::LayerSnapshot;
use crate::optimizers::{UpdateContext, UpdateStrategy};
use crate::utils::activations::{Activation, ActivationContext};
use crate::utils::geometry::square_side;
use crate::utils::init::WeightInitConfig;
use crate::utils::rng::NetRng;

/// Which variant a layer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Dense,
    Conv2D,
    MaxPool,
}

/// Output geometry a layer exposes to its successor.
///
/// `side` is `None` when the output cannot be split into `channels` square maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub len: usize,
    pub channels: usize,
    pub side: Option<usize>,
}

impl Shape {
    /// A single-channel view of `len` values.
    pub fn flat(len: usize) -> Self {
        Self {
            len,
            channels: 1,
            side: square_side(len, 1),
        }
    }
}

/// Network-level values used while wiring layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireSettings {
    pub activation: Activation,
    /// Channel count a dense predecessor's output is split into for a conv/pool successor.
    pub channels: usize,
    pub conv: ConvDefaults,
    pub pool: PoolDefaults,
    pub weight_init: WeightInitConfig,
    pub rrelu_range: (f64, f64),
}

impl Default for WireSettings {
    fn default() -> Self {
        Self {
            activation: Activation::default(),
            channels: 1,
            conv: ConvDefaults::default(),
            pool: PoolDefaults::default(),
            weight_init: WeightInitConfig::default(),
            rrelu_range: (0.0, 0.001),
        }
    }
}

/// Network-level values used by backward and update steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSettings {
    pub activation: ActivationContext,
    pub l1: f64,
    pub l2: f64,
    pub mini_batch_size: usize,
    pub update: UpdateStrategy,
    pub update_ctx: UpdateContext,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            activation: ActivationContext::default(),
            l1: 0.0,
            l2: 0.0,
            mini_batch_size: 1,
            update: UpdateStrategy::default(),
            update_ctx: UpdateContext::default(),
        }
    }
}

impl LayerSettings {
    /// Per-iteration weight-decay term for weight `w`:
    /// `(l2 * w + l1 * sign(w)) / mini_batch_size`.
    pub fn decay(&self, w: f64) -> f64 {
        if self.l1 == 0.0 && self.l2 == 0.0 {
            return 0.0;
        }
        let sign = if w > 0.0 {
            1.0
        } else if w < 0.0 {
            -1.0
        } else {
            0.0
        };
        (self.l2 * w + self.l1 * sign) / self.mini_batch_size.max(1) as f64
    }
}

/// L1/L2 penalty totals collected while applying deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Penalties {
    pub l1: f64,
    pub l2: f64,
}

impl Penalties {
    pub(crate) fn add(&mut self, settings: &LayerSettings, abs_sum: f64, sq_sum: f64) {
        self.l1 += settings.l1 * abs_sum;
        self.l2 += 0.5 * settings.l2 * sq_sum;
    }
}

/// One layer of a network.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(DenseLayer),
    Conv2D(Conv2DLayer),
    MaxPool(MaxPoolLayer),
}

impl From<DenseLayer> for Layer {
    fn from(layer: DenseLayer) -> Self {
        Layer::Dense(layer)
    }
}

impl From<Conv2DLayer> for Layer {
    fn from(layer: Conv2DLayer) -> Self {
        Layer::Conv2D(layer)
    }
}

impl From<MaxPoolLayer> for Layer {
    fn from(layer: MaxPoolLayer) -> Self {
        Layer::MaxPool(layer)
    }
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Dense(_) => LayerKind::Dense,
            Layer::Conv2D(_) => LayerKind::Conv2D,
            Layer::MaxPool(_) => LayerKind::MaxPool,
        }
    }

    pub fn is_wired(&self) -> bool {
        match self {
            Layer::Dense(l) => l.is_wired(),
            Layer::Conv2D(l) => l.is_wired(),
            Layer::MaxPool(l) => l.is_wired(),
        }
    }

    /// Number of output values (units, or channels × side² for spatial layers).
    pub fn output_len(&self) -> usize {
        match self {
            Layer::Dense(l) => l.size(),
            Layer::Conv2D(l) => l.output_len(),
            Layer::MaxPool(l) => l.output_len(),
        }
    }

    /// Output geometry; `channels` is how a dense output is split for a spatial successor.
    pub fn output_shape(&self, channels: usize) -> Shape {
        match self {
            Layer::Dense(l) => l.output_shape(channels),
            Layer::Conv2D(l) => l.output_shape(),
            Layer::MaxPool(l) => l.output_shape(),
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Layer::Dense(l) => l.parameter_count(),
            Layer::Conv2D(l) => l.parameter_count(),
            Layer::MaxPool(_) => 0,
        }
    }

    /// Bind to the predecessor's output shape and allocate parameters.
    pub(crate) fn wire(
        &mut self,
        prev: Option<&Shape>,
        settings: &WireSettings,
        rng: &mut NetRng,
    ) -> Result<()> {
        match self {
            Layer::Dense(l) => l.wire(prev, settings, rng),
            Layer::Conv2D(l) => l.wire(prev, settings, rng),
            Layer::MaxPool(l) => l.wire(prev, settings),
        }
    }

    pub(crate) fn forward(&mut self, input: &[f64], ctx: &ActivationContext, gate: &mut DropoutGate) {
        match self {
            Layer::Dense(l) => l.forward(input, ctx, gate),
            Layer::Conv2D(l) => l.forward(input, ctx, gate),
            Layer::MaxPool(l) => l.forward(input, ctx),
        }
    }

    pub(crate) fn backward(&mut self, upstream: &[f64], input: &[f64], settings: &LayerSettings) {
        match self {
            Layer::Dense(l) => l.backward(upstream, input, settings),
            Layer::Conv2D(l) => l.backward(upstream, input, settings),
            Layer::MaxPool(l) => l.backward(upstream, &settings.activation),
        }
    }

    pub(crate) fn backward_output(&mut self, target: &[f64], input: &[f64], settings: &LayerSettings) {
        match self {
            Layer::Dense(l) => l.backward_output(target, input, settings),
            Layer::Conv2D(l) => l.backward_output(target, input, settings),
            Layer::MaxPool(l) => l.backward_output(target),
        }
    }

    /// This layer's error contribution to each of its predecessor's outputs.
    ///
    /// - dense: `Σ_n error[n] * weights[n][i]` through the flattened index
    /// - conv: unconvolution of every filter's error map
    /// - pool: each cell's error routed to its window maximum
    pub fn input_errors(&self) -> Vec<f64> {
        match self {
            Layer::Dense(l) => l.input_errors(),
            Layer::Conv2D(l) => l.input_errors(),
            Layer::MaxPool(l) => l.input_errors(),
        }
    }

    /// Flat view of the layer's latest activations.
    pub fn activations(&self) -> Vec<f64> {
        match self {
            Layer::Dense(l) => l.activations(),
            Layer::Conv2D(l) => l.activations(),
            Layer::MaxPool(l) => l.activations(),
        }
    }

    pub fn errors(&self) -> Vec<f64> {
        match self {
            Layer::Dense(l) => l.errors(),
            Layer::Conv2D(l) => l.errors(),
            Layer::MaxPool(l) => l.errors(),
        }
    }

    pub fn reset_delta_weights(&mut self) {
        match self {
            Layer::Dense(l) => l.reset_delta_weights(),
            Layer::Conv2D(l) => l.reset_delta_weights(),
            Layer::MaxPool(_) => {}
        }
    }

    pub(crate) fn apply_delta_weights(&mut self, settings: &LayerSettings, penalties: &mut Penalties) {
        match self {
            Layer::Dense(l) => l.apply_delta_weights(settings, penalties),
            Layer::Conv2D(l) => l.apply_delta_weights(settings, penalties),
            Layer::MaxPool(_) => {}
        }
    }

    /// Sum of squares of every weight (biases excluded).
    pub(crate) fn weight_square_sum(&self) -> f64 {
        match self {
            Layer::Dense(l) => l.weights().map(|w| w * w).sum(),
            Layer::Conv2D(l) => l.weights().map(|w| w * w).sum(),
            Layer::MaxPool(_) => 0.0,
        }
    }

    pub(crate) fn scale_weights(&mut self, factor: f64) {
        match self {
            Layer::Dense(l) => l.weights_mut().for_each(|w| *w *= factor),
            Layer::Conv2D(l) => l.weights_mut().for_each(|w| *w *= factor),
            Layer::MaxPool(_) => {}
        }
    }

    pub fn to_snapshot(&self) -> LayerSnapshot {
        match self {
            Layer::Dense(l) => l.to_snapshot(),
            Layer::Conv2D(l) => l.to_snapshot(),
            Layer::MaxPool(l) => l.to_snapshot(),
        }
    }

    pub(crate) fn check_snapshot(&self, index: usize, snapshot: &LayerSnapshot) -> Result<()> {
        match self {
            Layer::Dense(l) => l.check_snapshot(index, snapshot),
            Layer::Conv2D(l) => l.check_snapshot(index, snapshot),
            Layer::MaxPool(l) => l.check_snapshot(index, snapshot),
        }
    }

    pub(crate) fn load_snapshot(&mut self, snapshot: &LayerSnapshot) {
        match self {
            Layer::Dense(l) => l.load_snapshot(snapshot),
            Layer::Conv2D(l) => l.load_snapshot(snapshot),
            Layer::MaxPool(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_disabled_by_default() {
        let settings = LayerSettings::default();
        assert_eq!(settings.decay(3.0), 0.0);
    }

    #[test]
    fn test_decay_combines_l1_and_l2() {
        let settings = LayerSettings {
            l1: 0.5,
            l2: 0.1,
            mini_batch_size: 2,
            ..LayerSettings::default()
        };
        // (0.1 * -2 + 0.5 * -1) / 2
        assert!((settings.decay(-2.0) + 0.35).abs() < 1e-12);
        assert_eq!(settings.decay(0.0), 0.0);
    }

    #[test]
    fn test_layer_kinds() {
        assert_eq!(Layer::from(DenseLayer::new(3)).kind(), LayerKind::Dense);
        assert_eq!(Layer::from(Conv2DLayer::new(3)).kind(), LayerKind::Conv2D);
        assert_eq!(Layer::from(MaxPoolLayer::new()).kind(), LayerKind::MaxPool);
    }

    #[test]
    fn test_flat_shape() {
        assert_eq!(Shape::flat(9).side, Some(3));
        assert_eq!(Shape::flat(8).side, None);
    }
}
