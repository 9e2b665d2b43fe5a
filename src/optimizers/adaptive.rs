//! Rules that adapt the step size per parameter from a running history of
//! squared deltas.

use crate::optimizers::ParamCache;

const STABILITY: f64 = 1e-6;

/// `cache += delta²; w + lr * delta / (ε + sqrt(cache))`
pub fn adagrad(value: f64, delta: f64, cache: &mut ParamCache, learning_rate: f64) -> f64 {
    cache.cache += delta * delta;
    value + learning_rate * delta / (STABILITY + cache.cache.sqrt())
}

/// Like adagrad with an exponentially decaying squared-delta average.
pub fn rmsprop(
    value: f64,
    delta: f64,
    cache: &mut ParamCache,
    learning_rate: f64,
    decay: f64,
) -> f64 {
    cache.cache = decay * cache.cache + (1.0 - decay) * delta * delta;
    value + learning_rate * delta / (STABILITY + cache.cache.sqrt())
}

/// Adadelta: the step is scaled by the ratio of the running RMS of past
/// updates to the running RMS of deltas, so no learning rate is involved.
pub fn adadelta(value: f64, delta: f64, cache: &mut ParamCache, rho: f64) -> f64 {
    cache.cache = rho * cache.cache + (1.0 - rho) * delta * delta;
    let new_value =
        value + ((cache.adadelta + STABILITY) / (cache.cache + STABILITY)).sqrt() * delta;
    let step = new_value - value;
    cache.adadelta = rho * cache.adadelta + (1.0 - rho) * step * step;
    new_value
}
