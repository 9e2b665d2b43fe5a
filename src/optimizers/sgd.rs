//! Gradient-descent rules without per-parameter step adaptation
//! (apart from the bounded gain of the `gain` rule).

use crate::optimizers::ParamCache;

/// `w + lr * delta`
pub fn vanilla(value: f64, delta: f64, learning_rate: f64) -> f64 {
    value + learning_rate * delta
}

/// Vanilla step scaled by the parameter's gain.
///
/// When the step flips the sign of the parameter the gain shrinks by 5%
/// (never below 0.5), otherwise it grows by 0.05 (never above 5).
pub fn gain(value: f64, delta: f64, cache: &mut ParamCache, learning_rate: f64) -> f64 {
    let new_value = value + learning_rate * delta * cache.gain;

    let flipped = (new_value <= 0.0 && value > 0.0) || (new_value >= 0.0 && value < 0.0);
    cache.gain = if flipped {
        (cache.gain * 0.95).max(0.5)
    } else {
        (cache.gain + 0.05).min(5.0)
    };

    new_value
}

/// `velocity = momentum * velocity + lr * delta; w + velocity`
pub fn momentum(
    value: f64,
    delta: f64,
    cache: &mut ParamCache,
    learning_rate: f64,
    momentum: f64,
) -> f64 {
    cache.velocity = momentum * cache.velocity + learning_rate * delta;
    value + cache.velocity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vanilla_update() {
        assert!((vanilla(1.0, 0.5, 0.1) - 1.05).abs() < 1e-12);
        assert!((vanilla(1.0, -0.5, 0.1) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_gain_grows_when_sign_kept() {
        let mut cache = ParamCache::default();
        let value = gain(1.0, 1.0, &mut cache, 0.1);
        assert!((value - 1.1).abs() < 1e-12);
        assert!((cache.gain - 1.05).abs() < 1e-12);
    }

    #[test]
    fn test_gain_shrinks_on_sign_flip() {
        let mut cache = ParamCache::default();
        let value = gain(0.05, -1.0, &mut cache, 0.1);
        assert!(value < 0.0);
        assert!((cache.gain - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_gain_is_bounded() {
        let mut cache = ParamCache {
            gain: 4.99,
            ..ParamCache::default()
        };
        gain(1.0, 1.0, &mut cache, 0.01);
        assert_eq!(cache.gain, 5.0);

        let mut cache = ParamCache {
            gain: 0.51,
            ..ParamCache::default()
        };
        gain(0.001, -1.0, &mut cache, 0.1);
        assert_eq!(cache.gain, 0.5);
    }

    #[test]
    fn test_momentum_accumulates_velocity() {
        let mut cache = ParamCache::default();
        let first = momentum(0.0, 1.0, &mut cache, 0.1, 0.9);
        assert!((first - 0.1).abs() < 1e-12);
        let second = momentum(first, 1.0, &mut cache, 0.1, 0.9);
        // velocity = 0.9 * 0.1 + 0.1 = 0.19
        assert!((second - 0.29).abs() < 1e-12);
    }
}
