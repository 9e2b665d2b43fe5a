//! Weight initialisation strategies.
//!
//! Each strategy produces `count` fresh parameter values. The Xavier and LeCun
//! variants derive their spread from the fan-in/fan-out of the unit being
//! initialised; `uniform` and `gaussian` use the configured limit or deviation.

use crate::utils::rng::NetRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightDistribution {
    Uniform,
    Gaussian,
    XavierNormal,
    #[default]
    XavierUniform,
    LecunUniform,
    LecunNormal,
}

/// Distribution identifier plus its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeightInitConfig {
    pub distribution: WeightDistribution,
    /// Half-width of the `uniform` range.
    pub limit: f64,
    /// Mean of the `gaussian` distribution.
    pub mean: f64,
    /// Standard deviation of the `gaussian` distribution.
    #[serde(alias = "stdDeviation")]
    pub std_dev: f64,
}

impl Default for WeightInitConfig {
    fn default() -> Self {
        Self {
            distribution: WeightDistribution::XavierUniform,
            limit: 0.1,
            mean: 0.0,
            std_dev: 0.05,
        }
    }
}

impl WeightInitConfig {
    /// Sample `count` initial values for a unit with the given fan-in/fan-out.
    pub fn generate(&self, count: usize, fan_in: usize, fan_out: usize, rng: &mut NetRng) -> Vec<f64> {
        match self.distribution {
            WeightDistribution::Uniform => uniform(count, self.limit, rng),
            WeightDistribution::Gaussian => gaussian(count, self.mean, self.std_dev, rng),
            WeightDistribution::XavierNormal => xavier_normal(count, fan_in, fan_out, rng),
            WeightDistribution::XavierUniform => xavier_uniform(count, fan_in, fan_out, rng),
            WeightDistribution::LecunUniform => lecun_uniform(count, fan_in, rng),
            WeightDistribution::LecunNormal => lecun_normal(count, fan_in, rng),
        }
    }
}

/// Uniform values in `[-limit, limit)`.
pub fn uniform(count: usize, limit: f64, rng: &mut NetRng) -> Vec<f64> {
    (0..count).map(|_| rng.gen_range_f64(-limit, limit)).collect()
}

pub fn gaussian(count: usize, mean: f64, std_dev: f64, rng: &mut NetRng) -> Vec<f64> {
    (0..count).map(|_| rng.gaussian(mean, std_dev)).collect()
}

/// Gaussian with deviation `sqrt(2 / (fan_in + fan_out))`.
pub fn xavier_normal(count: usize, fan_in: usize, fan_out: usize, rng: &mut NetRng) -> Vec<f64> {
    let fans = (fan_in + fan_out).max(1) as f64;
    gaussian(count, 0.0, (2.0 / fans).sqrt(), rng)
}

/// Uniform with limit `sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform(count: usize, fan_in: usize, fan_out: usize, rng: &mut NetRng) -> Vec<f64> {
    let fans = (fan_in + fan_out).max(1) as f64;
    uniform(count, (6.0 / fans).sqrt(), rng)
}

/// Uniform with limit `sqrt(3 / fan_in)`.
pub fn lecun_uniform(count: usize, fan_in: usize, rng: &mut NetRng) -> Vec<f64> {
    uniform(count, (3.0 / fan_in.max(1) as f64).sqrt(), rng)
}

/// Gaussian with deviation `sqrt(1 / fan_in)`.
pub fn lecun_normal(count: usize, fan_in: usize, rng: &mut NetRng) -> Vec<f64> {
    gaussian(count, 0.0, (1.0 / fan_in.max(1) as f64).sqrt(), rng)
}
