//! Adam (Adaptive Moment Estimation)
//!
//! ```text
//! m_t = β1 * m_{t-1} + (1 - β1) * delta
//! v_t = β2 * v_{t-1} + (1 - β2) * delta²
//! m_hat = m_t / (1 - β1^t)
//! v_hat = v_t / (1 - β2^t)
//! w = w + lr * m_hat / (√v_hat + ε)
//! ```
//!
//! Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
//! arXiv preprint arXiv:1412.6980.

use crate::optimizers::ParamCache;

pub const BETA1: f64 = 0.9;
pub const BETA2: f64 = 0.999;
pub const EPSILON: f64 = 1e-8;

/// One Adam step at time step `t` (1-based).
pub fn adam(value: f64, delta: f64, cache: &mut ParamCache, learning_rate: f64, t: usize) -> f64 {
    cache.m = BETA1 * cache.m + (1.0 - BETA1) * delta;
    cache.v = BETA2 * cache.v + (1.0 - BETA2) * delta * delta;

    let t = t as i32;
    let m_hat = cache.m / (1.0 - BETA1.powi(t));
    let v_hat = cache.v / (1.0 - BETA2.powi(t));

    value + learning_rate * m_hat / (v_hat.sqrt() + EPSILON)
}
