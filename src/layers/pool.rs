//! Max pooling layer implementation
//!
//! Pooling has no learnable parameters. Forward keeps the maximum of every
//! `size`×`size` window per channel and remembers where in the window it
//! was; backward sends each cell's error to exactly that position.

use crate::error::{NetError, Result};
use crate::layers::{Shape, WireSettings};
use crate::network::snapshot::LayerSnapshot;
use crate::utils::activations::{Activation, ActivationContext};
use crate::utils::geometry::{flat_index, output_side, Window};

/// Max pooling layer.
///
/// Window size and stride fall back to the network's pool defaults; the
/// stride default equals the window size. No activation is applied unless one
/// is requested explicitly.
#[derive(Debug, Clone)]
pub struct MaxPoolLayer {
    size: Option<usize>,
    stride: Option<usize>,
    activation: Option<Activation>,
    window: Option<Window>,
    sums: Vec<f64>,
    activations: Vec<f64>,
    errors: Vec<f64>,
    /// `(row, col)` of each cell's maximum within its window.
    max_offsets: Vec<(usize, usize)>,
}

impl MaxPoolLayer {
    pub fn new() -> Self {
        Self {
            size: None,
            stride: None,
            activation: None,
            window: None,
            sums: Vec::new(),
            activations: Vec::new(),
            errors: Vec::new(),
            max_offsets: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = Some(stride);
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }

    pub fn activation(&self) -> Activation {
        self.activation.unwrap_or(Activation::Identity)
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn is_wired(&self) -> bool {
        self.window.is_some()
    }

    pub fn channels(&self) -> usize {
        self.window.map_or(0, |w| w.channels)
    }

    pub fn out_side(&self) -> usize {
        self.window.map_or(0, |w| w.out_side)
    }

    pub fn output_len(&self) -> usize {
        self.channels() * self.out_side() * self.out_side()
    }

    pub fn output_shape(&self) -> Shape {
        Shape {
            len: self.output_len(),
            channels: self.channels(),
            side: Some(self.out_side()),
        }
    }

    /// Window offsets of the maxima found by the latest forward pass.
    pub fn max_offsets(&self) -> &[(usize, usize)] {
        &self.max_offsets
    }

    pub(crate) fn wire(&mut self, prev: Option<&Shape>, settings: &WireSettings) -> Result<()> {
        let prev =
            prev.ok_or_else(|| NetError::config("a pooling layer cannot be the input layer"))?;
        let in_side = prev.side.ok_or_else(|| {
            NetError::config(format!(
                "{} values cannot be viewed as {} square channel maps",
                prev.len, prev.channels
            ))
        })?;
        let size = self.size.unwrap_or(settings.pool.size);
        let stride = self.stride.or(settings.pool.stride).unwrap_or(size);
        let out_side = output_side(in_side, size, 0, stride)?;

        let window = Window {
            channels: prev.channels,
            in_side,
            kernel: size,
            padding: 0,
            stride,
            out_side,
        };
        let cells = prev.channels * out_side * out_side;
        self.sums = vec![0.0; cells];
        self.activations = vec![0.0; cells];
        self.errors = vec![0.0; cells];
        self.max_offsets = vec![(0, 0); cells];
        self.window = Some(window);
        Ok(())
    }

    pub fn forward(&mut self, input: &[f64], ctx: &ActivationContext) {
        let Some(w) = self.window else {
            return;
        };
        let activation = self.activation();

        for c in 0..w.channels {
            for row in 0..w.out_side {
                for col in 0..w.out_side {
                    let (top, left) = (row * w.stride, col * w.stride);
                    let mut best = f64::NEG_INFINITY;
                    let mut offset = (0, 0);
                    for dy in 0..w.kernel {
                        for dx in 0..w.kernel {
                            let value = input
                                .get(flat_index(c, top + dy, left + dx, w.in_side))
                                .copied()
                                .unwrap_or(0.0);
                            if value > best {
                                best = value;
                                offset = (dy, dx);
                            }
                        }
                    }
                    let cell = flat_index(c, row, col, w.out_side);
                    self.sums[cell] = best;
                    self.max_offsets[cell] = offset;
                    self.activations[cell] = activation.apply(best, false, ctx);
                }
            }
        }
    }

    /// Hidden-layer backward pass: upstream error times the activation
    /// derivative at the pooled value.
    pub fn backward(&mut self, upstream: &[f64], ctx: &ActivationContext) {
        let activation = self.activation();
        for (cell, error) in self.errors.iter_mut().enumerate() {
            let incoming = upstream.get(cell).copied().unwrap_or(0.0);
            *error = incoming * activation.apply(self.sums[cell], true, ctx);
        }
    }

    pub fn backward_output(&mut self, target: &[f64]) {
        for (cell, error) in self.errors.iter_mut().enumerate() {
            *error = target
                .get(cell)
                .map_or(0.0, |&expected| expected - self.activations[cell]);
        }
    }

    /// Error with respect to each predecessor output. Only the position that
    /// held a window's maximum receives that window's error.
    pub fn input_errors(&self) -> Vec<f64> {
        let Some(w) = self.window else {
            return Vec::new();
        };
        let mut routed = vec![0.0; w.channels * w.in_side * w.in_side];
        for c in 0..w.channels {
            for row in 0..w.out_side {
                for col in 0..w.out_side {
                    let cell = flat_index(c, row, col, w.out_side);
                    let (dy, dx) = self.max_offsets[cell];
                    let target = flat_index(c, row * w.stride + dy, col * w.stride + dx, w.in_side);
                    routed[target] += self.errors[cell];
                }
            }
        }
        routed
    }

    pub fn activations(&self) -> Vec<f64> {
        self.activations.clone()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.errors.clone()
    }

    pub fn to_snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::default()
    }

    pub(crate) fn check_snapshot(&self, index: usize, snapshot: &LayerSnapshot) -> Result<()> {
        if snapshot.weights.is_empty() {
            Ok(())
        } else {
            Err(NetError::ShapeMismatch {
                layer: index,
                unit: 0,
                expected: "no parameters (pooling layer)".to_string(),
                got: format!("{} units", snapshot.weights.len()),
            })
        }
    }
}

impl Default for MaxPoolLayer {
    fn default() -> Self {
        Self::new()
    }
}
