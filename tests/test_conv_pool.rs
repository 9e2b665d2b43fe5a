//! Tests for convolutional and pooling layers inside a network
//!
//! - Output geometry and non-integer rejection at wiring time
//! - Defaults from the network configuration
//! - Max-pool error routing
//! - Multi-channel inputs

use approx::assert_relative_eq;
use layered_networks::config::{ConvDefaults, NetworkConfig, PoolDefaults};
use layered_networks::layers::{Conv2DLayer, DenseLayer, Layer, MaxPoolLayer};
use layered_networks::network::{Network, NetworkState, TrainingExample, TrainingOptions};
use layered_networks::utils::activations::Activation;
use layered_networks::{LayerSpec, NetError};

fn seeded() -> NetworkConfig {
    NetworkConfig {
        seed: Some(21),
        ..NetworkConfig::default()
    }
}

// ============================================================================
// Geometry
// ============================================================================

mod geometry_tests {
    use super::*;

    #[test]
    fn test_non_integer_conv_output_is_a_configuration_error() {
        // (5 - 2 + 0) / 2 + 1 = 2.5
        let layers = vec![
            Layer::from(DenseLayer::new(25)),
            Layer::from(
                Conv2DLayer::new(2)
                    .with_filter_size(2)
                    .with_zero_padding(0)
                    .with_stride(2),
            ),
            Layer::from(DenseLayer::new(1)),
        ];
        let mut net = Network::from_layers(layers, seeded()).unwrap();
        let err = net.init_layers().unwrap_err();
        assert!(matches!(err, NetError::Configuration { .. }));
        assert_eq!(net.state(), NetworkState::Constructed);
        assert!(matches!(net.forward(&[0.0; 25]), Err(NetError::NotInitialised)));
    }

    #[test]
    fn test_non_integer_pool_output_is_a_configuration_error() {
        let layers = vec![
            Layer::from(DenseLayer::new(9)),
            Layer::from(MaxPoolLayer::new().with_size(2)),
            Layer::from(DenseLayer::new(1)),
        ];
        let mut net = Network::from_layers(layers, seeded()).unwrap();
        assert!(matches!(
            net.init_layers(),
            Err(NetError::Configuration { .. })
        ));
    }

    #[test]
    fn test_non_square_input_cannot_feed_conv() {
        let layers = vec![
            Layer::from(DenseLayer::new(10)),
            Layer::from(Conv2DLayer::new(1)),
            Layer::from(DenseLayer::new(1)),
        ];
        let mut net = Network::from_layers(layers, seeded()).unwrap();
        assert!(net.init_layers().is_err());
    }

    #[test]
    fn test_conv_pool_dense_shapes() {
        let specs = vec![
            LayerSpec::dense(64),
            LayerSpec::conv(4),
            LayerSpec::pool(),
            LayerSpec::dense(3),
        ];
        let mut net = Network::from_specs(specs, seeded()).unwrap();
        net.init_layers().unwrap();

        let lens: Vec<usize> = net.layers().iter().map(Layer::output_len).collect();
        assert_eq!(lens, vec![64, 4 * 8 * 8, 4 * 4 * 4, 3]);
        // 4 filters of 1x3x3 + bias, then 3 units over 64 inputs
        assert_eq!(net.parameter_count(), 4 * 10 + 3 * 65);

        let out = net.forward(&[0.5; 64]).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_network_defaults_apply_to_conv_and_pool() {
        let config = NetworkConfig {
            conv: ConvDefaults {
                filter_size: 5,
                stride: 1,
                zero_padding: Some(0),
            },
            pool: PoolDefaults {
                size: 5,
                stride: None,
            },
            ..seeded()
        };
        let specs = vec![
            LayerSpec::dense(81),
            LayerSpec::conv(2),
            LayerSpec::pool(),
            LayerSpec::dense(1),
        ];
        let mut net = Network::from_specs(specs, config).unwrap();
        net.init_layers().unwrap();
        // (9 - 5 + 0) / 1 + 1 = 5, then a single 5x5 window
        match &net.layers()[1] {
            Layer::Conv2D(conv) => {
                assert_eq!(conv.out_side(), 5);
                assert_eq!(conv.window().unwrap().kernel, 5);
            }
            _ => unreachable!(),
        }
        match &net.layers()[2] {
            Layer::MaxPool(pool) => {
                assert_eq!(pool.out_side(), 1);
                assert_eq!(pool.window().unwrap().stride, 5);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_multi_channel_input() {
        let config = NetworkConfig {
            channels: 3,
            ..seeded()
        };
        let layers = vec![
            Layer::from(DenseLayer::new(3 * 16)),
            Layer::from(Conv2DLayer::new(2).with_filter_size(3)),
            Layer::from(DenseLayer::new(2)),
        ];
        let mut net = Network::from_layers(layers, config).unwrap();
        net.init_layers().unwrap();
        match &net.layers()[1] {
            Layer::Conv2D(conv) => {
                assert_eq!(conv.filters()[0].channels, 3);
                assert_eq!(conv.filters()[0].weights.len(), 27);
                assert_eq!(conv.out_side(), 4);
            }
            _ => unreachable!(),
        }
    }
}

// ============================================================================
// Pooling
// ============================================================================

mod pooling_tests {
    use super::*;

    #[test]
    fn test_pool_routes_error_to_maxima_only() {
        let layers = vec![
            Layer::from(DenseLayer::new(16)),
            Layer::from(MaxPoolLayer::new().with_size(2)),
            Layer::from(DenseLayer::new(1).with_activation(Activation::Identity)),
        ];
        let mut net = Network::from_layers(layers, seeded()).unwrap();
        net.init_layers().unwrap();

        #[rustfmt::skip]
        let input = [
            1.0, 3.0, 0.0, 0.0,
            2.0, 0.5, 0.0, 9.0,
            0.0, 0.0, 4.0, 1.0,
            7.0, 0.0, 1.0, 1.0,
        ];
        net.forward(&input).unwrap();
        assert_eq!(net.layers()[1].activations(), vec![3.0, 9.0, 7.0, 4.0]);

        net.backward(&[0.0]).unwrap();
        let routed = net.layers()[2].input_errors();
        let pool_errors = net.layers()[1].errors();
        for (cell, error) in pool_errors.iter().enumerate() {
            assert_relative_eq!(*error, routed[cell], epsilon = 1e-12);
        }

        let to_input = net.layers()[1].input_errors();
        let maxima = [1, 7, 12, 10];
        for (position, error) in to_input.iter().enumerate() {
            match maxima.iter().position(|&m| m == position) {
                Some(cell) => assert_eq!(*error, pool_errors[cell]),
                None => assert_eq!(*error, 0.0),
            }
        }
    }

    #[test]
    fn test_pool_snapshot_is_empty() {
        let pool = Layer::from(MaxPoolLayer::new());
        assert!(pool.to_snapshot().weights.is_empty());
        assert_eq!(pool.parameter_count(), 0);
    }
}

#[test]
fn test_conv_network_learns_single_pattern() {
    let config = NetworkConfig {
        learning_rate: Some(0.1),
        ..seeded()
    };
    let specs = vec![
        LayerSpec::dense(16),
        LayerSpec::conv(2),
        LayerSpec::pool(),
        LayerSpec::dense(1),
    ];
    let mut net = Network::from_specs(specs, config).unwrap();
    let data = vec![
        TrainingExample::new((0..16).map(|i| (i % 2) as f64).collect(), vec![1.0]),
        TrainingExample::new((0..16).map(|i| ((i + 1) % 2) as f64 * 0.2).collect(), vec![0.0]),
    ];
    let report = net
        .train(&data, TrainingOptions::new().with_epochs(200))
        .unwrap();
    let first = report.epoch_errors[0];
    let last = report.last_epoch_error.unwrap();
    assert!(last < first, "error went from {first} to {last}");
}
