//! Network configuration
//!
//! [`NetworkConfig`] holds every network-wide hyper-parameter. It deserializes
//! from JSON with every field optional, so a file only names what it changes:
//!
//! ```json
//! {
//!   "learningRate": 0.5,
//!   "activation": "tanh",
//!   "updateFn": "adam",
//!   "dropout": 0.8,
//!   "l2": true,
//!   "maxNorm": 3,
//!   "weightsConfig": { "distribution": "gaussian", "mean": 0, "stdDeviation": 0.1 },
//!   "conv": { "filterSize": 5, "stride": 1 },
//!   "pool": { "size": 2 }
//! }
//! ```

use crate::error::{NetError, Result};
use crate::optimizers::UpdateStrategy;
use crate::utils::activations::{Activation, ActivationContext};
use crate::utils::cost::Cost;
use crate::utils::init::WeightInitConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_L1: f64 = 0.005;
pub const DEFAULT_L2: f64 = 0.001;
pub const DEFAULT_MAX_NORM: f64 = 1000.0;

/// A coefficient given either as a number or as an on/off switch.
///
/// `true` selects the library default for that coefficient, `false` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Regularizer {
    Toggle(bool),
    Value(f64),
}

impl Default for Regularizer {
    fn default() -> Self {
        Regularizer::Toggle(false)
    }
}

impl Regularizer {
    pub fn resolve(self, default: f64) -> f64 {
        match self {
            Regularizer::Toggle(true) => default,
            Regularizer::Toggle(false) => 0.0,
            Regularizer::Value(value) => value,
        }
    }
}

/// Defaults for convolutional layers that leave a setting unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvDefaults {
    pub filter_size: usize,
    pub stride: usize,
    /// `None` means `filter_size / 2`.
    pub zero_padding: Option<usize>,
}

impl Default for ConvDefaults {
    fn default() -> Self {
        Self {
            filter_size: 3,
            stride: 1,
            zero_padding: None,
        }
    }
}

/// Defaults for pooling layers that leave a setting unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolDefaults {
    pub size: usize,
    /// `None` means the window size.
    pub stride: Option<usize>,
}

impl Default for PoolDefaults {
    fn default() -> Self {
        Self {
            size: 2,
            stride: None,
        }
    }
}

/// Network-wide hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkConfig {
    /// `None` picks a default from the update strategy and activation.
    pub learning_rate: Option<f64>,
    pub activation: Activation,
    pub cost: Cost,
    #[serde(alias = "optimizer", alias = "updateStrategy")]
    pub update_fn: UpdateStrategy,
    /// Keep probability of hidden units during training (1 disables dropout).
    pub dropout: f64,
    pub l1: Regularizer,
    pub l2: Regularizer,
    pub max_norm: Regularizer,
    #[serde(alias = "weightInit", alias = "weightsConfig")]
    pub weights: WeightInitConfig,
    pub channels: usize,
    pub conv: ConvDefaults,
    pub pool: PoolDefaults,
    pub lrelu_slope: f64,
    /// Range the per-unit rrelu slope is drawn from.
    pub rrelu_range: (f64, f64),
    pub elu_alpha: f64,
    pub rms_decay: f64,
    pub rho: f64,
    pub momentum: f64,
    /// Seed for initialisation, dropout and shuffling; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            learning_rate: None,
            activation: Activation::Sigmoid,
            cost: Cost::MeanSquaredError,
            update_fn: UpdateStrategy::Vanilla,
            dropout: 1.0,
            l1: Regularizer::default(),
            l2: Regularizer::default(),
            max_norm: Regularizer::default(),
            weights: WeightInitConfig::default(),
            channels: 1,
            conv: ConvDefaults::default(),
            pool: PoolDefaults::default(),
            lrelu_slope: 0.01,
            rrelu_range: (0.0, 0.001),
            elu_alpha: 1.0,
            rms_decay: 0.99,
            rho: 0.95,
            momentum: 0.9,
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Learning rate in effect.
    pub fn resolved_learning_rate(&self) -> f64 {
        self.learning_rate
            .unwrap_or_else(|| self.update_fn.default_learning_rate(self.activation))
    }

    pub fn l1_coefficient(&self) -> f64 {
        self.l1.resolve(DEFAULT_L1)
    }

    pub fn l2_coefficient(&self) -> f64 {
        self.l2.resolve(DEFAULT_L2)
    }

    /// Max-norm bound, `None` when disabled.
    pub fn max_norm_bound(&self) -> Option<f64> {
        let bound = self.max_norm.resolve(DEFAULT_MAX_NORM);
        (bound > 0.0).then_some(bound)
    }

    pub fn activation_context(&self) -> ActivationContext {
        ActivationContext {
            lrelu_slope: self.lrelu_slope,
            elu_alpha: self.elu_alpha,
            rrelu_slope: 0.0,
        }
    }
}

/// Loads a network configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use layered_networks::config::load_config;
///
/// let cfg = load_config("config/xor.json").unwrap();
/// assert!(cfg.dropout <= 1.0);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<NetworkConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate a configuration from a JSON string.
pub fn parse_config(json: &str) -> Result<NetworkConfig> {
    let config: NetworkConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &NetworkConfig) -> Result<()> {
    if !(config.dropout > 0.0 && config.dropout <= 1.0) {
        return Err(NetError::config(format!(
            "dropout keep probability must be in (0, 1], got {}",
            config.dropout
        )));
    }

    if let Some(lr) = config.learning_rate {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(NetError::config(format!(
                "learning rate must be positive, got {lr}"
            )));
        }
    }

    for (name, value) in [
        ("l1", config.l1_coefficient()),
        ("l2", config.l2_coefficient()),
        ("maxNorm", config.max_norm.resolve(DEFAULT_MAX_NORM)),
    ] {
        if value < 0.0 {
            return Err(NetError::config(format!("{name} must be non-negative")));
        }
    }

    if config.channels == 0 {
        return Err(NetError::config("channels must be at least 1"));
    }
    if config.conv.filter_size == 0 || config.conv.stride == 0 {
        return Err(NetError::config("conv filterSize and stride must be at least 1"));
    }
    if config.pool.size == 0 || config.pool.stride == Some(0) {
        return Err(NetError::config("pool size and stride must be at least 1"));
    }

    let (low, high) = config.rrelu_range;
    if low > high {
        return Err(NetError::config("rreluRange lower bound exceeds upper bound"));
    }

    for (name, value) in [("rmsDecay", config.rms_decay), ("rho", config.rho), ("momentum", config.momentum)] {
        if !(0.0..1.0).contains(&value) {
            return Err(NetError::config(format!("{name} must be in [0, 1), got {value}")));
        }
    }

    Ok(())
}
