//! Inverted dropout.
//!
//! During training each unit survives with probability `keep`; survivors are
//! scaled by `1 / keep` so the expected activation matches inference, where
//! nothing is dropped and nothing is scaled.

use crate::utils::rng::NetRng;

/// Per-layer dropout decision source for one forward pass.
pub struct DropoutGate<'a> {
    keep: f64,
    rng: Option<&'a mut NetRng>,
}

impl<'a> DropoutGate<'a> {
    /// A gate that drops nothing and scales by 1.
    pub fn inactive() -> Self {
        Self {
            keep: 1.0,
            rng: None,
        }
    }

    /// A training-mode gate. Keep probability 1 never draws from `rng`.
    pub fn training(keep: f64, rng: &'a mut NetRng) -> Self {
        if keep >= 1.0 {
            return Self::inactive();
        }
        Self {
            keep,
            rng: Some(rng),
        }
    }

    /// Draw the drop decision for the next unit.
    pub fn drop_next(&mut self) -> bool {
        match self.rng.as_mut() {
            Some(rng) => !rng.chance(self.keep),
            None => false,
        }
    }

    /// Activation of a unit that survived.
    pub fn scale(&self, activation: f64) -> f64 {
        activation / self.keep
    }

    pub fn keep_probability(&self) -> f64 {
        self.keep
    }
}
