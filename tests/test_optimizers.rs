//! Tests for weight-update strategies
//!
//! - Zero delta leaves every parameter unchanged
//! - Per-strategy step behaviour
//! - Default learning rates

use approx::assert_relative_eq;
use layered_networks::optimizers::{ParamCache, UpdateContext, UpdateStrategy};
use layered_networks::utils::activations::Activation;

const ALL: [UpdateStrategy; 7] = [
    UpdateStrategy::Vanilla,
    UpdateStrategy::Gain,
    UpdateStrategy::Momentum,
    UpdateStrategy::Adagrad,
    UpdateStrategy::Rmsprop,
    UpdateStrategy::Adam,
    UpdateStrategy::Adadelta,
];

mod invariant_tests {
    use super::*;

    #[test]
    fn test_zero_delta_leaves_value_unchanged() {
        let ctx = UpdateContext {
            iterations: 1,
            ..UpdateContext::default()
        };
        for strategy in ALL {
            for &value in &[-1.5, 0.0, 0.3, 12.0] {
                let mut cache = ParamCache::default();
                let updated = strategy.apply(value, 0.0, &mut cache, &ctx);
                assert_eq!(updated, value, "{strategy:?} moved {value}");
            }
        }
    }

    #[test]
    fn test_positive_delta_moves_value_up() {
        let ctx = UpdateContext {
            iterations: 1,
            ..UpdateContext::default()
        };
        for strategy in ALL {
            let mut cache = ParamCache::default();
            let updated = strategy.apply(0.5, 0.2, &mut cache, &ctx);
            assert!(updated > 0.5, "{strategy:?} did not step along the delta");
        }
    }
}

mod strategy_tests {
    use super::*;

    #[test]
    fn test_vanilla_learning_rate_one_adds_delta() {
        let ctx = UpdateContext {
            learning_rate: 1.0,
            ..UpdateContext::default()
        };
        let mut cache = ParamCache::default();
        assert_eq!(
            UpdateStrategy::Vanilla.apply(0.25, 0.5, &mut cache, &ctx),
            0.75
        );
    }

    #[test]
    fn test_momentum_accumulates_velocity() {
        let ctx = UpdateContext {
            learning_rate: 0.1,
            momentum: 0.5,
            ..UpdateContext::default()
        };
        let mut cache = ParamCache::default();
        let first = UpdateStrategy::Momentum.apply(0.0, 1.0, &mut cache, &ctx);
        let second = UpdateStrategy::Momentum.apply(first, 1.0, &mut cache, &ctx);
        assert_relative_eq!(first, 0.1, epsilon = 1e-12);
        // velocity = 0.5 * 0.1 + 0.1
        assert_relative_eq!(second - first, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_gain_is_bounded() {
        let ctx = UpdateContext {
            learning_rate: 0.01,
            ..UpdateContext::default()
        };
        let mut cache = ParamCache::default();
        let mut value = 1.0;
        for _ in 0..200 {
            value = UpdateStrategy::Gain.apply(value, 1.0, &mut cache, &ctx);
        }
        assert!(cache.gain <= 5.0);

        let mut cache = ParamCache::default();
        let mut value = 0.01;
        for i in 0..200 {
            let delta = if i % 2 == 0 { -10.0 } else { 10.0 };
            value = UpdateStrategy::Gain.apply(value, delta, &mut cache, &ctx);
        }
        assert!(cache.gain >= 0.5);
    }

    #[test]
    fn test_adam_first_step_size() {
        let ctx = UpdateContext {
            learning_rate: 0.01,
            iterations: 1,
            ..UpdateContext::default()
        };
        let mut cache = ParamCache::default();
        let updated = UpdateStrategy::Adam.apply(1.0, 3.0, &mut cache, &ctx);
        assert_relative_eq!(updated, 1.01, epsilon = 1e-6);
    }

    #[test]
    fn test_adam_treats_iteration_zero_as_one() {
        let mut a = ParamCache::default();
        let mut b = ParamCache::default();
        let zero = UpdateContext {
            iterations: 0,
            ..UpdateContext::default()
        };
        let one = UpdateContext {
            iterations: 1,
            ..UpdateContext::default()
        };
        assert_eq!(
            UpdateStrategy::Adam.apply(0.0, 1.0, &mut a, &zero),
            UpdateStrategy::Adam.apply(0.0, 1.0, &mut b, &one)
        );
    }

    #[test]
    fn test_adadelta_ignores_learning_rate() {
        let mut a = ParamCache::default();
        let mut b = ParamCache::default();
        let slow = UpdateContext {
            learning_rate: 0.001,
            ..UpdateContext::default()
        };
        let fast = UpdateContext {
            learning_rate: 10.0,
            ..UpdateContext::default()
        };
        assert_eq!(
            UpdateStrategy::Adadelta.apply(0.5, 0.3, &mut a, &slow),
            UpdateStrategy::Adadelta.apply(0.5, 0.3, &mut b, &fast)
        );
    }
}

mod default_tests {
    use super::*;

    #[test]
    fn test_default_learning_rates() {
        assert_eq!(
            UpdateStrategy::Vanilla.default_learning_rate(Activation::Sigmoid),
            0.2
        );
        assert_eq!(
            UpdateStrategy::Vanilla.default_learning_rate(Activation::Relu),
            0.01
        );
        assert_eq!(
            UpdateStrategy::Adagrad.default_learning_rate(Activation::Tanh),
            0.5
        );
        assert_eq!(
            UpdateStrategy::Rmsprop.default_learning_rate(Activation::Sigmoid),
            0.001
        );
        assert_eq!(
            UpdateStrategy::Adam.default_learning_rate(Activation::Elu),
            0.01
        );
    }

    #[test]
    fn test_strategy_names() {
        let parsed: Vec<UpdateStrategy> = serde_json::from_str(
            r#"["vanilla", "gain", "momentum", "adagrad", "rmsprop", "adam", "adadelta"]"#,
        )
        .unwrap();
        assert_eq!(parsed, ALL.to_vec());
    }
}
