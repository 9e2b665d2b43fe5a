//! Architecture configuration structures
//!
//! Layer lists can be described in JSON and turned into [`Layer`]s, so network
//! shapes can be changed without touching code. Each entry names its
//! `layer_type` and only the fields that differ from the network defaults:
//!
//! ```json
//! {
//!   "layers": [
//!     { "layer_type": "dense", "size": 784 },
//!     { "layer_type": "conv", "filters": 8, "filter_size": 3, "activation": "relu" },
//!     { "layer_type": "pool", "size": 2 },
//!     { "layer_type": "dense", "size": 10, "softmax": true }
//!   ]
//! }
//! ```
//!
//! Dense entries may omit `size`. If every dense entry omits it, sizes are
//! derived from the first training example; giving some sizes but not others
//! is rejected.

use crate::error::{NetError, Result};
use crate::layers::{Conv2DLayer, DenseLayer, Layer, MaxPoolLayer};
use crate::utils::activations::Activation;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Description of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer_type", rename_all = "lowercase")]
pub enum LayerSpec {
    #[serde(alias = "fc")]
    Dense {
        size: Option<usize>,
        activation: Option<Activation>,
        #[serde(default)]
        softmax: bool,
    },
    #[serde(alias = "conv2d")]
    Conv {
        filters: usize,
        filter_size: Option<usize>,
        zero_padding: Option<usize>,
        stride: Option<usize>,
        activation: Option<Activation>,
    },
    #[serde(alias = "maxpool")]
    Pool {
        size: Option<usize>,
        stride: Option<usize>,
        activation: Option<Activation>,
    },
}

impl LayerSpec {
    /// A dense layer of `size` units using the network activation.
    pub fn dense(size: usize) -> Self {
        LayerSpec::Dense {
            size: Some(size),
            activation: None,
            softmax: false,
        }
    }

    /// A dense layer whose size is derived when the network is initialised.
    pub fn unsized_dense() -> Self {
        LayerSpec::Dense {
            size: None,
            activation: None,
            softmax: false,
        }
    }

    pub fn conv(filters: usize) -> Self {
        LayerSpec::Conv {
            filters,
            filter_size: None,
            zero_padding: None,
            stride: None,
            activation: None,
        }
    }

    pub fn pool() -> Self {
        LayerSpec::Pool {
            size: None,
            stride: None,
            activation: None,
        }
    }

    /// `false` only for a dense entry without a size.
    pub fn is_sized(&self) -> bool {
        !matches!(self, LayerSpec::Dense { size: None, .. })
    }

    /// Build the layer. `size` replaces a dense entry's own size.
    pub fn build(&self, size: Option<usize>) -> Result<Layer> {
        let layer = match self {
            LayerSpec::Dense {
                size: own,
                activation,
                softmax,
            } => {
                let size = size.or(*own).ok_or_else(|| {
                    NetError::config("a dense layer has no size and none could be derived")
                })?;
                let mut layer = DenseLayer::new(size).with_softmax(*softmax);
                if let Some(activation) = activation {
                    layer = layer.with_activation(*activation);
                }
                Layer::Dense(layer)
            }
            LayerSpec::Conv {
                filters,
                filter_size,
                zero_padding,
                stride,
                activation,
            } => {
                let mut layer = Conv2DLayer::new(*filters);
                if let Some(k) = filter_size {
                    layer = layer.with_filter_size(*k);
                }
                if let Some(p) = zero_padding {
                    layer = layer.with_zero_padding(*p);
                }
                if let Some(s) = stride {
                    layer = layer.with_stride(*s);
                }
                if let Some(activation) = activation {
                    layer = layer.with_activation(*activation);
                }
                Layer::Conv2D(layer)
            }
            LayerSpec::Pool {
                size,
                stride,
                activation,
            } => {
                let mut layer = MaxPoolLayer::new();
                if let Some(size) = size {
                    layer = layer.with_size(*size);
                }
                if let Some(s) = stride {
                    layer = layer.with_stride(*s);
                }
                if let Some(activation) = activation {
                    layer = layer.with_activation(*activation);
                }
                Layer::MaxPool(layer)
            }
        };
        Ok(layer)
    }
}

/// The full list of layers, input first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerSpec>,
}

/// Loads an architecture configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use layered_networks::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/cnn.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: impl AsRef<Path>) -> Result<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    parse_architecture(&contents)
}

pub fn parse_architecture(json: &str) -> Result<ArchitectureConfig> {
    let config: ArchitectureConfig = serde_json::from_str(json)?;
    validate_architecture(&config.layers)?;
    Ok(config)
}

/// Whether the dense entries carry sizes: `Ok(true)` when all do, `Ok(false)`
/// when none do.
pub(crate) fn all_sized(specs: &[LayerSpec]) -> Result<bool> {
    let dense: Vec<bool> = specs
        .iter()
        .filter(|spec| matches!(spec, LayerSpec::Dense { .. }))
        .map(LayerSpec::is_sized)
        .collect();
    if dense.iter().all(|&sized| sized) {
        Ok(true)
    } else if dense.iter().all(|&sized| !sized) {
        Ok(false)
    } else {
        Err(NetError::config(
            "either every dense layer must be given a size or none of them",
        ))
    }
}

/// Checks that:
/// - there are at least two layers and the first one is dense
/// - dense sizes are either all given or all omitted
/// - no size, filter count or stride is zero
/// - only the output layer is normalised with softmax
pub fn validate_architecture(specs: &[LayerSpec]) -> Result<()> {
    if specs.len() < 2 {
        return Err(NetError::config(
            "an architecture needs at least an input and an output layer",
        ));
    }
    if !matches!(specs[0], LayerSpec::Dense { .. }) {
        return Err(NetError::config("the input layer must be a dense layer"));
    }
    all_sized(specs)?;

    for (index, spec) in specs.iter().enumerate() {
        let zero = match spec {
            LayerSpec::Dense { size, .. } => *size == Some(0),
            LayerSpec::Conv {
                filters,
                filter_size,
                stride,
                ..
            } => *filters == 0 || *filter_size == Some(0) || *stride == Some(0),
            LayerSpec::Pool { size, stride, .. } => *size == Some(0) || *stride == Some(0),
        };
        if zero {
            return Err(NetError::config(format!(
                "layer {index}: sizes, filter counts and strides must be at least 1"
            )));
        }
    }

    let last = specs.len() - 1;
    if let Some(index) = specs[..last]
        .iter()
        .position(|spec| matches!(spec, LayerSpec::Dense { softmax: true, .. }))
    {
        return Err(NetError::config(format!(
            "layer {index}: softmax is only supported on the output layer"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_layer_types() {
        let arch = parse_architecture(
            r#"{"layers": [
                {"layer_type": "dense", "size": 16},
                {"layer_type": "conv", "filters": 2, "filter_size": 3, "activation": "relu"},
                {"layer_type": "pool"},
                {"layer_type": "fc", "size": 3, "softmax": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(arch.layers.len(), 4);
        assert_eq!(arch.layers[2], LayerSpec::pool());
        assert!(matches!(
            arch.layers[3],
            LayerSpec::Dense { size: Some(3), softmax: true, .. }
        ));
    }

    #[test]
    fn test_mixed_sizing_rejected() {
        let specs = vec![LayerSpec::dense(2), LayerSpec::unsized_dense(), LayerSpec::dense(1)];
        assert!(matches!(
            validate_architecture(&specs),
            Err(NetError::Configuration { .. })
        ));
    }

    #[test]
    fn test_input_must_be_dense() {
        let specs = vec![LayerSpec::conv(2), LayerSpec::dense(1)];
        assert!(validate_architecture(&specs).is_err());
    }

    #[test]
    fn test_softmax_only_on_output() {
        let hidden = LayerSpec::Dense {
            size: Some(4),
            activation: None,
            softmax: true,
        };
        let specs = vec![LayerSpec::dense(3), hidden.clone(), LayerSpec::dense(2)];
        assert!(matches!(
            validate_architecture(&specs),
            Err(NetError::Configuration { .. })
        ));
        let specs = vec![LayerSpec::dense(3), LayerSpec::dense(4), hidden];
        assert!(validate_architecture(&specs).is_ok());
    }

    #[test]
    fn test_unknown_layer_type() {
        let err = parse_architecture(r#"{"layers": [{"layer_type": "lstm"}]}"#).unwrap_err();
        assert!(matches!(err, NetError::Json(_)));
    }

    #[test]
    fn test_build_uses_override_size() {
        let layer = LayerSpec::unsized_dense().build(Some(5)).unwrap();
        assert_eq!(layer.output_len(), 5);
        assert!(LayerSpec::unsized_dense().build(None).is_err());
    }
}
