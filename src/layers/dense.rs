//! Dense (fully connected) layer implementation
//!
//! Every unit sees the whole predecessor output as one flat sequence, whatever
//! the predecessor's spatial shape: a convolution or pooling predecessor is
//! read in channel-major order (`channel * side² + row * side + col`).

use crate::error::{NetError, Result};
use crate::layers::dropout::DropoutGate;
use crate::layers::neuron::Neuron;
use crate::layers::{LayerSettings, Penalties, Shape, WireSettings};
use crate::network::snapshot::{LayerSnapshot, UnitSnapshot, UnitWeights};
use crate::utils::activations::{softmax, Activation, ActivationContext};
use crate::utils::geometry::square_side;
use crate::utils::rng::NetRng;

/// Dense layer of [`Neuron`]s.
///
/// # Example
///
/// ```
/// use layered_networks::layers::DenseLayer;
/// use layered_networks::utils::activations::Activation;
///
/// let layer = DenseLayer::new(10).with_activation(Activation::Tanh);
/// assert_eq!(layer.size(), 10);
/// assert!(!layer.is_wired());
/// ```
#[derive(Debug, Clone)]
pub struct DenseLayer {
    size: usize,
    requested_activation: Option<Activation>,
    activation: Activation,
    softmax: bool,
    fan_in: usize,
    wired: bool,
    neurons: Vec<Neuron>,
}

impl DenseLayer {
    /// A layer of `size` units. Parameters are allocated when the network wires it.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            requested_activation: None,
            activation: Activation::default(),
            softmax: false,
            fan_in: 0,
            wired: false,
            neurons: Vec::new(),
        }
    }

    /// Override the network-wide activation for this layer.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.requested_activation = Some(activation);
        self
    }

    /// Normalise this layer's activations with softmax after activating them.
    pub fn with_softmax(mut self, softmax: bool) -> Self {
        self.softmax = softmax;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of incoming connections per unit (0 for an input layer).
    pub fn fan_in(&self) -> usize {
        self.fan_in
    }

    /// The activation in effect (the network default until wired).
    pub fn activation(&self) -> Activation {
        self.requested_activation.unwrap_or(self.activation)
    }

    pub fn is_softmax(&self) -> bool {
        self.softmax
    }

    pub fn is_wired(&self) -> bool {
        self.wired
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    /// Weights plus biases (an input layer has none).
    pub fn parameter_count(&self) -> usize {
        if self.fan_in == 0 {
            0
        } else {
            self.size * (self.fan_in + 1)
        }
    }

    /// Output seen as `channels` square maps when possible.
    pub fn output_shape(&self, channels: usize) -> Shape {
        Shape {
            len: self.size,
            channels,
            side: square_side(self.size, channels),
        }
    }

    pub(crate) fn wire(
        &mut self,
        prev: Option<&Shape>,
        settings: &WireSettings,
        rng: &mut NetRng,
    ) -> Result<()> {
        if self.size == 0 {
            return Err(NetError::config("dense layer size must be at least 1"));
        }
        self.activation = self.requested_activation.unwrap_or(settings.activation);
        self.fan_in = prev.map_or(0, |shape| shape.len);

        let (low, high) = settings.rrelu_range;
        self.neurons = (0..self.size)
            .map(|_| {
                let mut neuron = match prev {
                    None => Neuron::input(),
                    Some(_) => Neuron::new(settings.weight_init.generate(
                        self.fan_in,
                        self.fan_in,
                        self.size,
                        rng,
                    )),
                };
                if self.activation == Activation::Rrelu {
                    neuron.rrelu_slope = rng.gen_range_f64(low, high);
                }
                neuron
            })
            .collect();
        self.wired = true;
        Ok(())
    }

    /// Assign input values directly as activations (input layer only).
    pub fn set_input(&mut self, values: &[f64]) {
        for (neuron, &value) in self.neurons.iter_mut().zip(values) {
            neuron.sum = value;
            neuron.activation = value;
        }
    }

    pub fn forward(&mut self, input: &[f64], ctx: &ActivationContext, gate: &mut DropoutGate) {
        for neuron in &mut self.neurons {
            neuron.sum = neuron.weighted_sum(input);
            neuron.dropped = gate.drop_next();
            neuron.activation = if neuron.dropped {
                0.0
            } else {
                let unit_ctx = ctx.for_unit(neuron.rrelu_slope);
                gate.scale(self.activation.apply(neuron.sum, false, &unit_ctx))
            };
        }

        if self.softmax {
            let normalised = softmax(&self.activations());
            for (neuron, value) in self.neurons.iter_mut().zip(normalised) {
                neuron.activation = value;
            }
        }
    }

    /// Hidden-layer backward pass. `upstream[n]` is the error flowing into unit
    /// `n` from the successor, before this layer's activation derivative.
    pub fn backward(&mut self, upstream: &[f64], input: &[f64], settings: &LayerSettings) {
        for (n, neuron) in self.neurons.iter_mut().enumerate() {
            if neuron.dropped {
                neuron.error = 0.0;
                continue;
            }
            let unit_ctx = settings.activation.for_unit(neuron.rrelu_slope);
            neuron.derivative = self.activation.apply(neuron.sum, true, &unit_ctx);
            neuron.error = neuron.derivative * upstream.get(n).copied().unwrap_or(0.0);
            neuron.accumulate(input, |w| settings.decay(w));
        }
    }

    /// Output-layer backward pass: `error = target - activation`, no derivative.
    pub fn backward_output(&mut self, target: &[f64], input: &[f64], settings: &LayerSettings) {
        for (n, neuron) in self.neurons.iter_mut().enumerate() {
            neuron.error = target
                .get(n)
                .map_or(0.0, |&expected| expected - neuron.activation);
            neuron.accumulate(input, |w| settings.decay(w));
        }
    }

    /// Error with respect to each predecessor output:
    /// `Σ_n error[n] * weights[n][i]`.
    pub fn input_errors(&self) -> Vec<f64> {
        let mut errors = vec![0.0; self.fan_in];
        for neuron in &self.neurons {
            for (slot, &w) in errors.iter_mut().zip(&neuron.weights) {
                *slot += neuron.error * w;
            }
        }
        errors
    }

    pub fn activations(&self) -> Vec<f64> {
        self.neurons.iter().map(|n| n.activation).collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.neurons.iter().map(|n| n.error).collect()
    }

    pub fn reset_delta_weights(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::reset_deltas);
    }

    pub fn apply_delta_weights(&mut self, settings: &LayerSettings, penalties: &mut Penalties) {
        for neuron in &mut self.neurons {
            let (abs_sum, sq_sum) = neuron.apply_deltas(settings.update, &settings.update_ctx);
            penalties.add(settings, abs_sum, sq_sum);
        }
    }

    pub(crate) fn weights_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.neurons.iter_mut().flat_map(|n| n.weights.iter_mut())
    }

    pub(crate) fn weights(&self) -> impl Iterator<Item = &f64> {
        self.neurons.iter().flat_map(|n| n.weights.iter())
    }

    pub fn to_snapshot(&self) -> LayerSnapshot {
        if self.fan_in == 0 {
            return LayerSnapshot::default();
        }
        LayerSnapshot {
            weights: self
                .neurons
                .iter()
                .map(|n| UnitSnapshot {
                    bias: n.bias,
                    weights: UnitWeights::Flat(n.weights.clone()),
                })
                .collect(),
        }
    }

    pub(crate) fn check_snapshot(&self, index: usize, snapshot: &LayerSnapshot) -> Result<()> {
        if self.fan_in == 0 {
            return Ok(());
        }
        if snapshot.weights.len() != self.neurons.len() {
            return Err(NetError::ShapeMismatch {
                layer: index,
                unit: snapshot.weights.len().min(self.neurons.len()),
                expected: format!("{} units", self.neurons.len()),
                got: format!("{} units", snapshot.weights.len()),
            });
        }
        for (unit, data) in snapshot.weights.iter().enumerate() {
            match &data.weights {
                UnitWeights::Flat(values) if values.len() == self.fan_in => {}
                other => {
                    return Err(NetError::ShapeMismatch {
                        layer: index,
                        unit,
                        expected: format!("{} weights", self.fan_in),
                        got: other.describe(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Copy parameters in. Callers validate with `check_snapshot` first.
    pub(crate) fn load_snapshot(&mut self, snapshot: &LayerSnapshot) {
        if self.fan_in == 0 {
            return;
        }
        for (neuron, data) in self.neurons.iter_mut().zip(&snapshot.weights) {
            neuron.bias = data.bias;
            if let UnitWeights::Flat(values) = &data.weights {
                neuron.weights.copy_from_slice(values);
            }
        }
    }
}
