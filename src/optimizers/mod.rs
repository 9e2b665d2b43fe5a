//! Weight-update strategies
//!
//! A strategy maps `(current value, accumulated delta, per-parameter cache)` to
//! the parameter's new value. Deltas are accumulated in the descent direction
//! (`error * input`, where the output error is `target - activation`), so every
//! rule *adds* its step to the value.
//!
//! Strategies are stateless with respect to the network: everything a rule
//! needs is either in the [`ParamCache`] owned by the parameter's container or
//! in the [`UpdateContext`] the network builds once per mini-batch boundary.
//!
//! # Available Strategies
//!
//! - `vanilla`: `w + lr * delta`
//! - `gain`: vanilla scaled by a per-parameter adaptive gain
//! - `momentum`: vanilla with a velocity term
//! - `adagrad`, `rmsprop`, `adadelta`: per-parameter adaptive step sizes
//! - `adam`: bias-corrected first and second moment estimates

pub mod adam;
pub mod adaptive;
pub mod sgd;

use crate::utils::activations::Activation;
use serde::{Deserialize, Serialize};

/// Update strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    #[default]
    Vanilla,
    Gain,
    Momentum,
    Adagrad,
    Rmsprop,
    Adam,
    Adadelta,
}

/// Auxiliary optimizer state for a single scalar parameter.
///
/// Every container keeps one cache per weight and one for its bias, so the
/// cache layout always mirrors the weight layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCache {
    /// Adaptive gain (`gain`).
    pub gain: f64,
    /// Running squared-delta accumulator (`adagrad`, `rmsprop`, `adadelta`).
    pub cache: f64,
    /// First moment estimate (`adam`).
    pub m: f64,
    /// Second moment estimate (`adam`).
    pub v: f64,
    /// Running squared-update accumulator (`adadelta`).
    pub adadelta: f64,
    /// Velocity (`momentum`).
    pub velocity: f64,
}

impl Default for ParamCache {
    fn default() -> Self {
        Self {
            gain: 1.0,
            cache: 0.0,
            m: 0.0,
            v: 0.0,
            adadelta: 0.0,
            velocity: 0.0,
        }
    }
}

/// Network-level values a strategy reads while updating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateContext {
    pub learning_rate: f64,
    /// Training iterations completed so far, used for adam's bias correction.
    pub iterations: usize,
    /// Decay of the rmsprop squared-delta average.
    pub rms_decay: f64,
    /// Decay of both adadelta accumulators.
    pub rho: f64,
    /// Velocity retention of the momentum rule.
    pub momentum: f64,
}

impl Default for UpdateContext {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            iterations: 0,
            rms_decay: 0.99,
            rho: 0.95,
            momentum: 0.9,
        }
    }
}

impl UpdateStrategy {
    /// Compute the new value of one parameter.
    pub fn apply(self, value: f64, delta: f64, cache: &mut ParamCache, ctx: &UpdateContext) -> f64 {
        let lr = ctx.learning_rate;
        match self {
            UpdateStrategy::Vanilla => sgd::vanilla(value, delta, lr),
            UpdateStrategy::Gain => sgd::gain(value, delta, cache, lr),
            UpdateStrategy::Momentum => sgd::momentum(value, delta, cache, lr, ctx.momentum),
            UpdateStrategy::Adagrad => adaptive::adagrad(value, delta, cache, lr),
            UpdateStrategy::Rmsprop => adaptive::rmsprop(value, delta, cache, lr, ctx.rms_decay),
            UpdateStrategy::Adadelta => adaptive::adadelta(value, delta, cache, ctx.rho),
            UpdateStrategy::Adam => adam::adam(value, delta, cache, lr, ctx.iterations.max(1)),
        }
    }

    /// Learning rate used when the configuration leaves it unset.
    pub fn default_learning_rate(self, activation: Activation) -> f64 {
        match self {
            UpdateStrategy::Vanilla | UpdateStrategy::Gain | UpdateStrategy::Momentum => {
                if activation.is_rectifier() {
                    0.01
                } else {
                    0.2
                }
            }
            UpdateStrategy::Adagrad => 0.5,
            UpdateStrategy::Rmsprop => 0.001,
            UpdateStrategy::Adam => 0.01,
            UpdateStrategy::Adadelta => 1.0,
        }
    }
}
