//! 2D Convolutional layer implementation
//!
//! Each [`Filter`] slides over the zero-padded, multi-channel output of the
//! predecessor and produces one output map. The layer's flat output is the
//! filters' activation maps back to back, so the value of filter `f` at
//! `(row, col)` sits at `f * out_side² + row * out_side + col`.

use crate::error::{NetError, Result};
use crate::layers::dropout::DropoutGate;
use crate::layers::filter::Filter;
use crate::layers::{LayerSettings, Penalties, Shape, WireSettings};
use crate::network::snapshot::{LayerSnapshot, UnitSnapshot, UnitWeights};
use crate::utils::activations::{Activation, ActivationContext};
use crate::utils::geometry::{flat_index, output_side, strip_padding, Window};
use crate::utils::rng::NetRng;

/// Convolutional layer with learnable filters.
///
/// Filter size, stride and zero padding fall back to the network's conv
/// defaults when unset; the padding default is `filter_size / 2`, which keeps
/// the output side equal to the input side at stride 1.
///
/// # Example
///
/// ```
/// use layered_networks::layers::Conv2DLayer;
///
/// let layer = Conv2DLayer::new(8).with_filter_size(5).with_stride(1);
/// assert_eq!(layer.filter_count(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct Conv2DLayer {
    filter_count: usize,
    filter_size: Option<usize>,
    zero_padding: Option<usize>,
    stride: Option<usize>,
    requested_activation: Option<Activation>,
    activation: Activation,
    window: Option<Window>,
    filters: Vec<Filter>,
}

impl Conv2DLayer {
    pub fn new(filter_count: usize) -> Self {
        Self {
            filter_count,
            filter_size: None,
            zero_padding: None,
            stride: None,
            requested_activation: None,
            activation: Activation::default(),
            window: None,
            filters: Vec::new(),
        }
    }

    pub fn with_filter_size(mut self, size: usize) -> Self {
        self.filter_size = Some(size);
        self
    }

    pub fn with_zero_padding(mut self, padding: usize) -> Self {
        self.zero_padding = Some(padding);
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.requested_activation = Some(activation);
        self
    }

    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    pub fn activation(&self) -> Activation {
        self.requested_activation.unwrap_or(self.activation)
    }

    /// Resolved geometry, available once wired.
    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [Filter] {
        &mut self.filters
    }

    pub fn is_wired(&self) -> bool {
        self.window.is_some()
    }

    /// Side of each output map (0 until wired).
    pub fn out_side(&self) -> usize {
        self.window.map_or(0, |w| w.out_side)
    }

    pub fn output_len(&self) -> usize {
        self.filter_count * self.out_side() * self.out_side()
    }

    pub fn output_shape(&self) -> Shape {
        Shape {
            len: self.output_len(),
            channels: self.filter_count,
            side: Some(self.out_side()),
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.filters.iter().map(|f| f.weights.len() + 1).sum()
    }

    pub(crate) fn wire(
        &mut self,
        prev: Option<&Shape>,
        settings: &WireSettings,
        rng: &mut NetRng,
    ) -> Result<()> {
        let prev =
            prev.ok_or_else(|| NetError::config("a convolutional layer cannot be the input layer"))?;
        if self.filter_count == 0 {
            return Err(NetError::config("a convolutional layer needs at least one filter"));
        }
        let in_side = prev.side.ok_or_else(|| {
            NetError::config(format!(
                "{} values cannot be viewed as {} square channel maps",
                prev.len, prev.channels
            ))
        })?;

        let kernel = self.filter_size.unwrap_or(settings.conv.filter_size);
        let stride = self.stride.unwrap_or(settings.conv.stride);
        let padding = self
            .zero_padding
            .or(settings.conv.zero_padding)
            .unwrap_or(kernel / 2);
        let out_side = output_side(in_side, kernel, padding, stride)?;

        let window = Window {
            channels: prev.channels,
            in_side,
            kernel,
            padding,
            stride,
            out_side,
        };
        self.activation = self.requested_activation.unwrap_or(settings.activation);

        let volume = prev.channels * kernel * kernel;
        let fan_out = self.filter_count * kernel * kernel;
        let (low, high) = settings.rrelu_range;
        self.filters = (0..self.filter_count)
            .map(|_| {
                let weights = settings.weight_init.generate(volume, volume, fan_out, rng);
                let mut filter = Filter::new(prev.channels, kernel, weights, out_side * out_side);
                if self.activation == Activation::Rrelu {
                    filter.rrelu_slope = rng.gen_range_f64(low, high);
                }
                filter
            })
            .collect();
        self.window = Some(window);
        Ok(())
    }

    pub fn forward(&mut self, input: &[f64], ctx: &ActivationContext, gate: &mut DropoutGate) {
        let Some(window) = self.window else {
            return;
        };
        let padded = window.pad_volume(input);

        for filter in &mut self.filters {
            let sums = window.convolve(&padded, &filter.weights);
            let unit_ctx = ctx.for_unit(filter.rrelu_slope);
            for (cell, sum) in sums.into_iter().enumerate() {
                let sum = sum + filter.bias;
                let dropped = gate.drop_next();
                filter.sum_map[cell] = sum;
                filter.dropout_map[cell] = dropped;
                filter.activation_map[cell] = if dropped {
                    0.0
                } else {
                    gate.scale(self.activation.apply(sum, false, &unit_ctx))
                };
            }
        }
    }

    /// Hidden-layer backward pass. `upstream` is indexed like this layer's flat output.
    pub fn backward(&mut self, upstream: &[f64], input: &[f64], settings: &LayerSettings) {
        let Some(window) = self.window else {
            return;
        };
        let area = window.out_side * window.out_side;

        for (f, filter) in self.filters.iter_mut().enumerate() {
            let unit_ctx = settings.activation.for_unit(filter.rrelu_slope);
            for cell in 0..area {
                filter.error_map[cell] = if filter.dropout_map[cell] {
                    0.0
                } else {
                    let incoming = upstream.get(f * area + cell).copied().unwrap_or(0.0);
                    incoming * self.activation.apply(filter.sum_map[cell], true, &unit_ctx)
                };
            }
        }
        self.accumulate(input, settings);
    }

    /// Output-layer backward pass: `error = target - activation`.
    pub fn backward_output(&mut self, target: &[f64], input: &[f64], settings: &LayerSettings) {
        let area = self.out_side() * self.out_side();
        for (f, filter) in self.filters.iter_mut().enumerate() {
            for cell in 0..area {
                filter.error_map[cell] = target
                    .get(f * area + cell)
                    .map_or(0.0, |&expected| expected - filter.activation_map[cell]);
            }
        }
        self.accumulate(input, settings);
    }

    /// Slide each kernel over the padded input and add `input * error` into the
    /// delta weight at that kernel offset; the delta bias collects the error map.
    fn accumulate(&mut self, input: &[f64], settings: &LayerSettings) {
        let Some(window) = self.window else {
            return;
        };
        let padded = window.pad_volume(input);
        let ps = window.padded_side();
        let (k, s, out) = (window.kernel, window.stride, window.out_side);

        for filter in &mut self.filters {
            filter.delta_bias += filter.error_map.iter().sum::<f64>();

            for c in 0..window.channels {
                for ky in 0..k {
                    for kx in 0..k {
                        let mut gradient = 0.0;
                        for row in 0..out {
                            for col in 0..out {
                                let error = filter.error_map[row * out + col];
                                gradient += error * padded[flat_index(c, row * s + ky, col * s + kx, ps)];
                            }
                        }
                        let idx = filter.weight_index(c, ky, kx);
                        filter.delta_weights[idx] += gradient - settings.decay(filter.weights[idx]);
                    }
                }
            }
        }
    }

    /// Error with respect to each predecessor output ("unconvolution").
    ///
    /// Every filter scatters `weight * error` back onto the zero-padded input
    /// grid at each kernel offset it read from; the padding is then stripped.
    pub fn input_errors(&self) -> Vec<f64> {
        let Some(window) = self.window else {
            return Vec::new();
        };
        let ps = window.padded_side();
        let (k, s, out) = (window.kernel, window.stride, window.out_side);
        let mut padded_errors = vec![0.0; window.channels * ps * ps];

        for filter in &self.filters {
            for (cell, &error) in filter.error_map.iter().enumerate() {
                if error == 0.0 {
                    continue;
                }
                let (row, col) = (cell / out, cell % out);
                for c in 0..window.channels {
                    for ky in 0..k {
                        for kx in 0..k {
                            let target = flat_index(c, row * s + ky, col * s + kx, ps);
                            padded_errors[target] += filter.weights[filter.weight_index(c, ky, kx)] * error;
                        }
                    }
                }
            }
        }

        padded_errors
            .chunks(ps * ps)
            .flat_map(|map| strip_padding(map, ps, window.padding))
            .collect()
    }

    pub fn activations(&self) -> Vec<f64> {
        self.filters
            .iter()
            .flat_map(|f| f.activation_map.iter().copied())
            .collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.filters
            .iter()
            .flat_map(|f| f.error_map.iter().copied())
            .collect()
    }

    pub fn reset_delta_weights(&mut self) {
        self.filters.iter_mut().for_each(Filter::reset_deltas);
    }

    pub fn apply_delta_weights(&mut self, settings: &LayerSettings, penalties: &mut Penalties) {
        for filter in &mut self.filters {
            let (abs_sum, sq_sum) = filter.apply_deltas(settings.update, &settings.update_ctx);
            penalties.add(settings, abs_sum, sq_sum);
        }
    }

    pub(crate) fn weights_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.filters.iter_mut().flat_map(|f| f.weights.iter_mut())
    }

    pub(crate) fn weights(&self) -> impl Iterator<Item = &f64> {
        self.filters.iter().flat_map(|f| f.weights.iter())
    }

    pub fn to_snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            weights: self
                .filters
                .iter()
                .map(|f| UnitSnapshot {
                    bias: f.bias,
                    weights: UnitWeights::Volume(f.weight_volume()),
                })
                .collect(),
        }
    }

    pub(crate) fn check_snapshot(&self, index: usize, snapshot: &LayerSnapshot) -> Result<()> {
        if snapshot.weights.len() != self.filters.len() {
            return Err(NetError::ShapeMismatch {
                layer: index,
                unit: snapshot.weights.len().min(self.filters.len()),
                expected: format!("{} filters", self.filters.len()),
                got: format!("{} filters", snapshot.weights.len()),
            });
        }
        for (unit, (filter, data)) in self.filters.iter().zip(&snapshot.weights).enumerate() {
            let (c, k) = (filter.channels, filter.size);
            let matches = match &data.weights {
                UnitWeights::Volume(volume) => {
                    volume.len() == c
                        && volume
                            .iter()
                            .all(|map| map.len() == k && map.iter().all(|row| row.len() == k))
                }
                UnitWeights::Flat(_) => false,
            };
            if !matches {
                return Err(NetError::ShapeMismatch {
                    layer: index,
                    unit,
                    expected: format!("{c}x{k}x{k} volume"),
                    got: data.weights.describe(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn load_snapshot(&mut self, snapshot: &LayerSnapshot) {
        for (filter, data) in self.filters.iter_mut().zip(&snapshot.weights) {
            filter.bias = data.bias;
            if let UnitWeights::Volume(volume) = &data.weights {
                let flat: Vec<f64> = volume.iter().flatten().flatten().copied().collect();
                filter.weights.copy_from_slice(&flat);
            }
        }
    }
}
