//! Network orchestrator
//!
//! A [`Network`] owns an ordered chain of [`Layer`]s (index 0 is the input
//! layer) and drives the forward, backward and update cycle over it.
//!
//! The layer chain goes through these states:
//!
//! - `NotDefined`: no layers given; a three-layer dense network is sized from
//!   the first training example.
//! - `Defined`: layer kinds given without dense sizes; sizes are interpolated
//!   between the input and output lengths.
//! - `Constructed`: every layer is fully specified.
//! - `Initialised`: every layer is wired to its predecessor and has its
//!   parameters allocated. Only now are `forward` and `backward` legal.

pub mod snapshot;
pub mod training;

pub use snapshot::{LayerSnapshot, Snapshot, UnitSnapshot, UnitWeights};
pub use training::{TestEvent, TrainingEvent, TrainingExample, TrainingOptions, TrainingReport};

use crate::architecture::{all_sized, validate_architecture, LayerSpec};
use crate::config::{validate_config, NetworkConfig};
use crate::error::{NetError, Result};
use crate::layers::{DropoutGate, Layer, LayerSettings, Penalties, Shape, WireSettings};
use crate::optimizers::UpdateContext;
use crate::utils::rng::NetRng;
use log::{debug, warn};

const MAX_NORM_EPSILON: f64 = 1e-18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    NotDefined,
    Defined,
    Constructed,
    Initialised,
}

#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    state: NetworkState,
    /// Layer descriptions waiting for sizes (`Defined` state only).
    specs: Vec<LayerSpec>,
    layers: Vec<Layer>,
    rng: NetRng,
    iterations: usize,
    epochs: usize,
    last_epoch_error: Option<f64>,
    penalties: Penalties,
    mini_batch_size: usize,
    training: bool,
}

impl Network {
    /// A network whose layers are sized from the first training example.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        validate_config(&config)?;
        Ok(Self {
            rng: NetRng::from_seed(config.seed),
            config,
            state: NetworkState::NotDefined,
            specs: Vec::new(),
            layers: Vec::new(),
            iterations: 0,
            epochs: 0,
            last_epoch_error: None,
            penalties: Penalties::default(),
            mini_batch_size: 1,
            training: false,
        })
    }

    /// A dense network with the given unit counts, input first.
    ///
    /// # Example
    ///
    /// ```
    /// use layered_networks::config::NetworkConfig;
    /// use layered_networks::network::Network;
    ///
    /// let mut net = Network::from_sizes(&[2, 3, 1], NetworkConfig::default()).unwrap();
    /// net.init_layers().unwrap();
    /// let output = net.forward(&[1.0, 0.0]).unwrap();
    /// assert_eq!(output.len(), 1);
    /// ```
    pub fn from_sizes(sizes: &[usize], config: NetworkConfig) -> Result<Self> {
        Self::from_specs(sizes.iter().map(|&size| LayerSpec::dense(size)).collect(), config)
    }

    /// A network built from layer descriptions. Dense entries must either all
    /// carry a size or all omit it.
    pub fn from_specs(specs: Vec<LayerSpec>, config: NetworkConfig) -> Result<Self> {
        let mut net = Self::new(config)?;
        if specs.is_empty() {
            return Ok(net);
        }
        validate_architecture(&specs)?;
        if all_sized(&specs)? {
            net.layers = specs
                .iter()
                .map(|spec| spec.build(None))
                .collect::<Result<_>>()?;
            net.state = NetworkState::Constructed;
        } else {
            net.specs = specs;
            net.state = NetworkState::Defined;
        }
        Ok(net)
    }

    /// A network over already constructed layers.
    pub fn from_layers(layers: Vec<Layer>, config: NetworkConfig) -> Result<Self> {
        if layers.len() < 2 {
            return Err(NetError::config(
                "a network needs at least an input and an output layer",
            ));
        }
        if !matches!(layers[0], Layer::Dense(_)) {
            return Err(NetError::config("the input layer must be a dense layer"));
        }
        let mut net = Self::new(config)?;
        net.layers = layers;
        net.state = NetworkState::Constructed;
        Ok(net)
    }

    /// Wire a `Constructed` network. A no-op once initialised.
    pub fn init_layers(&mut self) -> Result<()> {
        match self.state {
            NetworkState::Initialised => Ok(()),
            NetworkState::Constructed => self.wire_layers(),
            NetworkState::NotDefined | NetworkState::Defined => Err(NetError::config(
                "layer sizes are unknown, use init_layers_for with the data dimensions",
            )),
        }
    }

    /// Size (if needed) and wire the layers for data of the given dimensions.
    /// A no-op once initialised.
    pub fn init_layers_for(&mut self, input_len: usize, output_len: usize) -> Result<()> {
        if input_len == 0 || output_len == 0 {
            return Err(NetError::config("input and output lengths must be at least 1"));
        }
        match self.state {
            NetworkState::Initialised => return Ok(()),
            NetworkState::Constructed => {}
            NetworkState::NotDefined => {
                self.layers = [input_len, hidden_size(input_len, output_len), output_len]
                    .iter()
                    .map(|&size| LayerSpec::dense(size).build(None))
                    .collect::<Result<_>>()?;
            }
            NetworkState::Defined => {
                let count = self.specs.len();
                self.layers = self
                    .specs
                    .iter()
                    .enumerate()
                    .map(|(position, spec)| {
                        let size = if position == 0 {
                            input_len
                        } else if position == count - 1 {
                            output_len
                        } else {
                            interpolated_size(input_len, output_len, position, count)
                        };
                        spec.build(Some(size))
                    })
                    .collect::<Result<_>>()?;
            }
        }
        self.wire_layers()
    }

    fn wire_layers(&mut self) -> Result<()> {
        let last = self.layers.len().saturating_sub(1);
        if let Some(index) = self.layers[..last]
            .iter()
            .position(|layer| matches!(layer, Layer::Dense(dense) if dense.is_softmax()))
        {
            return Err(NetError::config(format!(
                "layer {index}: softmax is only supported on the output layer"
            )));
        }

        let settings = self.wire_settings();
        let mut prev: Option<Shape> = None;
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.wire(prev.as_ref(), &settings, &mut self.rng)?;
            let shape = layer.output_shape(settings.channels);
            debug!(
                "Wired layer {}: {:?}, {} outputs, {} parameters",
                index,
                layer.kind(),
                shape.len,
                layer.parameter_count()
            );
            prev = Some(shape);
        }
        self.specs.clear();
        self.state = NetworkState::Initialised;
        Ok(())
    }

    fn wire_settings(&self) -> WireSettings {
        WireSettings {
            activation: self.config.activation,
            channels: self.config.channels,
            conv: self.config.conv,
            pool: self.config.pool,
            weight_init: self.config.weights,
            rrelu_range: self.config.rrelu_range,
        }
    }

    pub(crate) fn layer_settings(&self) -> LayerSettings {
        LayerSettings {
            activation: self.config.activation_context(),
            l1: self.config.l1_coefficient(),
            l2: self.config.l2_coefficient(),
            mini_batch_size: self.mini_batch_size,
            update: self.config.update_fn,
            update_ctx: UpdateContext {
                learning_rate: self.config.resolved_learning_rate(),
                iterations: self.iterations,
                rms_decay: self.config.rms_decay,
                rho: self.config.rho,
                momentum: self.config.momentum,
            },
        }
    }

    pub(crate) fn ensure_initialised(&self) -> Result<()> {
        if self.state == NetworkState::Initialised {
            Ok(())
        } else {
            Err(NetError::NotInitialised)
        }
    }

    /// Run `input` through every layer and return the output activations.
    ///
    /// Input values beyond the input layer's size are ignored; missing ones
    /// keep their previous value.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.ensure_initialised()?;
        if input.is_empty() {
            return Err(NetError::MissingInput);
        }
        let expected = self.layers[0].output_len();
        if input.len() != expected {
            warn!(
                "Input has {} values but the input layer has {} units",
                input.len(),
                expected
            );
        }
        match &mut self.layers[0] {
            Layer::Dense(first) => first.set_input(input),
            _ => return Err(NetError::config("the input layer must be a dense layer")),
        }

        let ctx = self.config.activation_context();
        let last = self.layers.len() - 1;
        for index in 1..=last {
            let prev = self.layers[index - 1].activations();
            let mut gate = if self.training && index < last {
                DropoutGate::training(self.config.dropout, &mut self.rng)
            } else {
                DropoutGate::inactive()
            };
            self.layers[index].forward(&prev, &ctx, &mut gate);
        }
        Ok(self.layers[last].activations())
    }

    /// Propagate the error against `target` from the output layer back to the
    /// first hidden layer, accumulating parameter deltas.
    pub fn backward(&mut self, target: &[f64]) -> Result<()> {
        self.ensure_initialised()?;
        if target.is_empty() {
            return Err(NetError::MissingTarget);
        }
        let last = self.layers.len() - 1;
        let expected = self.layers[last].output_len();
        if target.len() != expected {
            warn!(
                "Target has {} values but the output layer has {} units",
                target.len(),
                expected
            );
        }

        let settings = self.layer_settings();
        let input = self.layers[last - 1].activations();
        self.layers[last].backward_output(target, &input, &settings);
        for index in (1..last).rev() {
            let upstream = self.layers[index + 1].input_errors();
            let input = self.layers[index - 1].activations();
            self.layers[index].backward(&upstream, &input, &settings);
        }
        Ok(())
    }

    /// Apply the accumulated deltas with the configured update strategy, then
    /// enforce the max-norm bound if one is set.
    pub fn apply_delta_weights(&mut self) -> Result<()> {
        self.ensure_initialised()?;
        let settings = self.layer_settings();
        for layer in self.layers.iter_mut().skip(1) {
            layer.apply_delta_weights(&settings, &mut self.penalties);
        }

        if let Some(bound) = self.config.max_norm_bound() {
            let total = self
                .layers
                .iter()
                .map(Layer::weight_square_sum)
                .sum::<f64>()
                .sqrt();
            if total > bound {
                let factor = bound / (MAX_NORM_EPSILON + total);
                debug!("Max norm {:.4} exceeds {}, rescaling weights by {:.6}", total, bound, factor);
                for layer in &mut self.layers {
                    layer.scale_weights(factor);
                }
            }
        }
        Ok(())
    }

    pub fn reset_delta_weights(&mut self) {
        for layer in &mut self.layers {
            layer.reset_delta_weights();
        }
    }

    /// Enable dropout for subsequent forward passes.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Mini-batch size used to scale weight decay.
    pub fn set_mini_batch_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(NetError::config("mini-batch size must be at least 1"));
        }
        self.mini_batch_size = size;
        Ok(())
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Average cost of the latest completed epoch.
    pub fn last_epoch_error(&self) -> Option<f64> {
        self.last_epoch_error
    }

    /// L1/L2 penalty totals accumulated by every update so far.
    pub fn penalties(&self) -> Penalties {
        self.penalties
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }
}

/// Single hidden layer size for a network sized from data alone.
fn hidden_size(input_len: usize, output_len: usize) -> usize {
    let (input, output) = (input_len as f64, output_len as f64);
    let size = if input / output > 5.0 {
        output + (input - output).abs() / 4.0
    } else {
        input + output
    };
    size.ceil().max(1.0) as usize
}

/// Hidden layer `position` (1-based) gets `hidden_size` scaled down by its
/// place in the chain: `ceil(hidden_size * (hidden - position + 1) / hidden)`.
fn interpolated_size(input_len: usize, output_len: usize, position: usize, count: usize) -> usize {
    let hidden = count.saturating_sub(2).max(1);
    let remaining = (hidden + 1).saturating_sub(position);
    (hidden_size(input_len, output_len) * remaining)
        .div_ceil(hidden)
        .max(1)
}
