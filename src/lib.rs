//! Layered Networks Library
//!
//! A from-scratch feedforward and convolutional neural network library:
//! forward propagation, backpropagation, weight updates and parameter
//! snapshots over plain `Vec<f64>` storage.
//!
//! # Modules
//!
//! - `layers`: the `Layer` enum and its dense, convolutional and max-pooling variants
//! - `network`: the `Network` orchestrator, training loop and snapshots
//! - `optimizers`: weight-update strategies (vanilla, gain, momentum, adagrad, rmsprop, adam, adadelta)
//! - `utils`: activations, costs, weight initialisers, RNG and geometry helpers
//! - `config`: network hyper-parameters loaded from JSON
//! - `architecture`: layer lists loaded from JSON
//!
//! # Example
//!
//! ```
//! use layered_networks::{Network, NetworkConfig, TrainingExample, TrainingOptions};
//!
//! let data = vec![
//!     TrainingExample::new(vec![0.0, 0.0], vec![0.0]),
//!     TrainingExample::new(vec![0.0, 1.0], vec![1.0]),
//!     TrainingExample::new(vec![1.0, 0.0], vec![1.0]),
//!     TrainingExample::new(vec![1.0, 1.0], vec![0.0]),
//! ];
//! let config = NetworkConfig { seed: Some(7), ..NetworkConfig::default() };
//! let mut net = Network::from_sizes(&[2, 3, 1], config).unwrap();
//! net.train(&data, TrainingOptions::new().with_epochs(10)).unwrap();
//! let output = net.forward(&[1.0, 0.0]).unwrap();
//! assert_eq!(output.len(), 1);
//! ```

pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod utils;

pub use architecture::{load_architecture, ArchitectureConfig, LayerSpec};
pub use config::{load_config, NetworkConfig};
pub use error::{NetError, Result};
pub use layers::{Conv2DLayer, DenseLayer, Layer, MaxPoolLayer};
pub use network::{Network, NetworkState, Snapshot, TrainingExample, TrainingOptions, TrainingReport};
pub use optimizers::UpdateStrategy;
pub use utils::activations::Activation;
pub use utils::cost::Cost;
