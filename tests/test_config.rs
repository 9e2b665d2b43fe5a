//! Tests for configuration and architecture loading
//!
//! - Loading network configs from JSON files
//! - Defaults for missing fields
//! - Validation failures
//! - Architecture files and building networks from them

use layered_networks::architecture::{load_architecture, parse_architecture, LayerSpec};
use layered_networks::config::{load_config, parse_config, NetworkConfig, Regularizer};
use layered_networks::network::Network;
use layered_networks::utils::activations::Activation;
use layered_networks::utils::cost::Cost;
use layered_networks::utils::init::WeightDistribution;
use layered_networks::{NetError, UpdateStrategy};
use std::fs;
use std::path::PathBuf;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ============================================================================
// Network configuration
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_load_full_config() {
        let path = write_temp(
            "layered_networks_full_config.json",
            r#"{
                "learningRate": 0.05,
                "activation": "lrelu",
                "cost": "crossentropy",
                "updateFn": "rmsprop",
                "dropout": 0.75,
                "l1": 0.01,
                "l2": true,
                "maxNorm": 3,
                "weightsConfig": { "distribution": "gaussian", "mean": 0.1, "stdDeviation": 0.2 },
                "channels": 2,
                "conv": { "filterSize": 5, "zeroPadding": 2, "stride": 1 },
                "pool": { "size": 3, "stride": 3 },
                "lreluSlope": 0.2,
                "seed": 99
            }"#,
        );
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.learning_rate, Some(0.05));
        assert_eq!(config.activation, Activation::Lrelu);
        assert_eq!(config.cost, Cost::CrossEntropy);
        assert_eq!(config.update_fn, UpdateStrategy::Rmsprop);
        assert_eq!(config.dropout, 0.75);
        assert_eq!(config.l1, Regularizer::Value(0.01));
        assert_eq!(config.l2_coefficient(), 0.001);
        assert_eq!(config.max_norm_bound(), Some(3.0));
        assert_eq!(config.weights.distribution, WeightDistribution::Gaussian);
        assert_eq!(config.weights.std_dev, 0.2);
        assert_eq!(config.channels, 2);
        assert_eq!(config.conv.filter_size, 5);
        assert_eq!(config.conv.zero_padding, Some(2));
        assert_eq!(config.pool.stride, Some(3));
        assert_eq!(config.activation_context().lrelu_slope, 0.2);
        assert_eq!(config.seed, Some(99));
    }

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.activation, Activation::Sigmoid);
        assert_eq!(config.update_fn, UpdateStrategy::Vanilla);
        assert_eq!(config.dropout, 1.0);
        assert_eq!(config.resolved_learning_rate(), 0.2);
        assert_eq!(config.l1_coefficient(), 0.0);
        assert_eq!(config.max_norm_bound(), None);
        assert_eq!(config.conv.filter_size, 3);
        assert_eq!(config.pool.size, 2);
    }

    #[test]
    fn test_rectifier_default_learning_rate() {
        let config = parse_config(r#"{"activation": "relu"}"#).unwrap();
        assert_eq!(config.resolved_learning_rate(), 0.01);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/nonexistent/layered_networks.json").unwrap_err();
        assert!(matches!(err, NetError::Io(_)));
    }

    #[test]
    fn test_invalid_json_is_json_error() {
        let path = write_temp("layered_networks_bad_config.json", "{ not json");
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, NetError::Json(_)));
    }

    #[test]
    fn test_validation_errors() {
        for json in [
            r#"{"dropout": 0}"#,
            r#"{"learningRate": -1}"#,
            r#"{"l2": -0.5}"#,
            r#"{"channels": 0}"#,
            r#"{"conv": {"stride": 0}}"#,
            r#"{"pool": {"stride": 0}}"#,
            r#"{"rho": 1.5}"#,
        ] {
            assert!(
                matches!(parse_config(json), Err(NetError::Configuration { .. })),
                "{json} was accepted"
            );
        }
    }

    #[test]
    fn test_network_rejects_invalid_config() {
        let config = NetworkConfig {
            dropout: 2.0,
            ..NetworkConfig::default()
        };
        assert!(Network::new(config).is_err());
    }
}

// ============================================================================
// Architecture files
// ============================================================================

mod architecture_tests {
    use super::*;

    #[test]
    fn test_load_architecture_and_build_network() {
        let path = write_temp(
            "layered_networks_architecture.json",
            r#"{
                "layers": [
                    { "layer_type": "dense", "size": 36 },
                    { "layer_type": "conv", "filters": 2, "filter_size": 3, "activation": "relu" },
                    { "layer_type": "pool", "size": 2 },
                    { "layer_type": "dense", "size": 4, "softmax": true }
                ]
            }"#,
        );
        let arch = load_architecture(&path).unwrap();
        fs::remove_file(&path).ok();

        let mut net = Network::from_specs(arch.layers, NetworkConfig::default()).unwrap();
        net.init_layers().unwrap();
        let lens: Vec<usize> = net.layers().iter().map(|l| l.output_len()).collect();
        assert_eq!(lens, vec![36, 2 * 6 * 6, 2 * 3 * 3, 4]);
    }

    #[test]
    fn test_unsized_architecture() {
        let arch = parse_architecture(
            r#"{"layers": [{"layer_type": "dense"}, {"layer_type": "dense"}, {"layer_type": "dense"}]}"#,
        )
        .unwrap();
        assert!(arch.layers.iter().all(|spec| !spec.is_sized()));
    }

    #[test]
    fn test_architecture_validation() {
        assert!(parse_architecture(r#"{"layers": []}"#).is_err());
        assert!(parse_architecture(
            r#"{"layers": [{"layer_type": "dense", "size": 4}, {"layer_type": "conv", "filters": 0}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_spec_round_trip_serialization() {
        let specs = vec![LayerSpec::dense(4), LayerSpec::conv(1), LayerSpec::pool()];
        let json = serde_json::to_string(&specs).unwrap();
        let parsed: Vec<LayerSpec> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, specs);
    }
}
