//! Parameter snapshots
//!
//! A snapshot is the persisted form of every learnable parameter:
//!
//! ```json
//! { "layers": [ { "weights": [] }, { "weights": [ { "bias": 0.1, "weights": [0.2, -0.3] } ] } ] }
//! ```
//!
//! There is one entry per layer, the input layer included (always empty).
//! Dense units store a flat weight list and filters store a
//! `channels × size × size` volume.

use crate::error::{NetError, Result};
use crate::network::Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Weights of one unit: flat for a neuron, a 3D volume for a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitWeights {
    Flat(Vec<f64>),
    Volume(Vec<Vec<Vec<f64>>>),
}

impl UnitWeights {
    /// Human-readable shape, used in mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            UnitWeights::Flat(values) => format!("{} weights", values.len()),
            UnitWeights::Volume(volume) => {
                let rows = volume.first().map_or(0, Vec::len);
                let cols = volume
                    .first()
                    .and_then(|channel| channel.first())
                    .map_or(0, Vec::len);
                format!("{}x{}x{} volume", volume.len(), rows, cols)
            }
        }
    }
}

impl Default for UnitWeights {
    fn default() -> Self {
        UnitWeights::Flat(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub bias: f64,
    #[serde(default)]
    pub weights: UnitWeights,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerSnapshot {
    #[serde(default)]
    pub weights: Vec<UnitSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub layers: Vec<LayerSnapshot>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

impl Network {
    /// Export every layer's parameters.
    pub fn to_snapshot(&self) -> Result<Snapshot> {
        self.ensure_initialised()?;
        Ok(Snapshot {
            layers: self.layers.iter().map(|layer| layer.to_snapshot()).collect(),
        })
    }

    /// Replace every layer's parameters with the snapshot's.
    ///
    /// The whole snapshot is validated before anything is written, so a
    /// failed import leaves the network untouched. Pending deltas are cleared;
    /// optimizer caches are kept.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.ensure_initialised()?;
        if snapshot.layers.len() != self.layers.len() {
            return Err(NetError::LayerCountMismatch {
                expected: self.layers.len(),
                got: snapshot.layers.len(),
            });
        }
        for (index, (layer, data)) in self.layers.iter().zip(&snapshot.layers).enumerate() {
            layer.check_snapshot(index, data)?;
        }
        for (layer, data) in self.layers.iter_mut().zip(&snapshot.layers) {
            layer.load_snapshot(data);
        }
        self.reset_delta_weights();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_weights_shapes() {
        let json = r#"{"layers":[{"weights":[]},{"weights":[{"bias":1.0,"weights":[0.5,0.25]}]},
            {"weights":[{"bias":0.0,"weights":[[[1.0,2.0],[3.0,4.0]]]}]}]}"#;
        let snapshot = Snapshot::from_json(json).unwrap();
        assert_eq!(snapshot.layers.len(), 3);
        assert!(snapshot.layers[0].weights.is_empty());
        assert_eq!(
            snapshot.layers[1].weights[0].weights,
            UnitWeights::Flat(vec![0.5, 0.25])
        );
        assert_eq!(
            snapshot.layers[2].weights[0].weights.describe(),
            "1x2x2 volume"
        );
    }

    #[test]
    fn test_missing_weights_key_defaults_to_empty() {
        let snapshot = Snapshot::from_json(r#"{"layers":[{}]}"#).unwrap();
        assert_eq!(snapshot.layers[0], LayerSnapshot::default());
    }
}
