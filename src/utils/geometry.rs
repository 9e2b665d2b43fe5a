//! Spatial helpers for convolution and pooling.
//!
//! Maps are stored flat and row-major. A multi-channel volume stores its
//! channels back to back, so the value at `(channel, row, col)` of a volume
//! with square side `side` lives at `channel * side² + row * side + col`.

use crate::error::{NetError, Result};

/// Flat index of `(channel, row, col)` in a channel-major volume.
#[inline]
pub fn flat_index(channel: usize, row: usize, col: usize, side: usize) -> usize {
    channel * side * side + row * side + col
}

/// Output side of a sliding window: `(input - kernel + 2 * padding) / stride + 1`.
///
/// Fails unless the division is exact and the window fits the padded input.
pub fn output_side(input: usize, kernel: usize, padding: usize, stride: usize) -> Result<usize> {
    if stride == 0 {
        return Err(NetError::config("stride must be at least 1"));
    }
    if kernel == 0 {
        return Err(NetError::config("kernel size must be at least 1"));
    }
    let padded = input + 2 * padding;
    if padded < kernel {
        return Err(NetError::config(format!(
            "kernel size {kernel} does not fit input width {input} with padding {padding}"
        )));
    }
    let span = padded - kernel;
    if span % stride != 0 {
        return Err(NetError::config(format!(
            "output size ({input} - {kernel} + 2*{padding}) / {stride} + 1 is not an integer"
        )));
    }
    Ok(span / stride + 1)
}

/// Side of the square maps a flat vector of `len` values splits into across `channels`.
pub fn square_side(len: usize, channels: usize) -> Option<usize> {
    if channels == 0 || len % channels != 0 {
        return None;
    }
    let area = len / channels;
    let side = (area as f64).sqrt().round() as usize;
    (side * side == area).then_some(side)
}

/// Surround a single `side`×`side` map with `padding` rings of zeros.
pub fn pad(map: &[f64], side: usize, padding: usize) -> Vec<f64> {
    if padding == 0 {
        return map.to_vec();
    }
    let padded_side = side + 2 * padding;
    let mut out = vec![0.0; padded_side * padded_side];
    for row in 0..side {
        let src = &map[row * side..(row + 1) * side];
        let start = (row + padding) * padded_side + padding;
        out[start..start + side].copy_from_slice(src);
    }
    out
}

/// Remove `padding` rings from a `padded_side`×`padded_side` map.
pub fn strip_padding(map: &[f64], padded_side: usize, padding: usize) -> Vec<f64> {
    if padding == 0 {
        return map.to_vec();
    }
    let side = padded_side - 2 * padding;
    let mut out = Vec::with_capacity(side * side);
    for row in 0..side {
        let start = (row + padding) * padded_side + padding;
        out.extend_from_slice(&map[start..start + side]);
    }
    out
}

/// Geometry of one sliding-window pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub channels: usize,
    pub in_side: usize,
    pub kernel: usize,
    pub padding: usize,
    pub stride: usize,
    pub out_side: usize,
}

impl Window {
    pub fn padded_side(&self) -> usize {
        self.in_side + 2 * self.padding
    }

    /// Zero-pad every channel of a `channels`×`in_side`² volume.
    pub fn pad_volume(&self, volume: &[f64]) -> Vec<f64> {
        let area = self.in_side * self.in_side;
        volume
            .chunks(area)
            .take(self.channels)
            .flat_map(|map| pad(map, self.in_side, self.padding))
            .collect()
    }

    /// Cross-correlate a padded input volume with one `channels`×`kernel`² weight
    /// volume, producing the `out_side`² map of sums (bias not included).
    pub fn convolve(&self, padded: &[f64], weights: &[f64]) -> Vec<f64> {
        let ps = self.padded_side();
        let k = self.kernel;
        let mut out = vec![0.0; self.out_side * self.out_side];

        for (cell, value) in out.iter_mut().enumerate() {
            let (row, col) = (cell / self.out_side, cell % self.out_side);
            let (top, left) = (row * self.stride, col * self.stride);
            let mut sum = 0.0;
            for c in 0..self.channels {
                for ky in 0..k {
                    let in_row = flat_index(c, top + ky, left, ps);
                    let w_row = flat_index(c, ky, 0, k);
                    for kx in 0..k {
                        sum += padded[in_row + kx] * weights[w_row + kx];
                    }
                }
            }
            *value = sum;
        }
        out
    }
}
