//! Cost functions used to report per-iteration error.
//!
//! Costs are diagnostic only: the backward pass always starts from
//! `target - activation` at the output layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cost {
    CrossEntropy,
    #[default]
    MeanSquaredError,
    RootMeanSquaredError,
}

impl Cost {
    /// Evaluate the cost of `output` against `target`, pairing values by index.
    pub fn evaluate(self, target: &[f64], output: &[f64]) -> f64 {
        match self {
            Cost::CrossEntropy => cross_entropy(target, output),
            Cost::MeanSquaredError => mean_squared_error(target, output),
            Cost::RootMeanSquaredError => mean_squared_error(target, output).sqrt(),
        }
    }
}

pub fn cross_entropy(target: &[f64], output: &[f64]) -> f64 {
    target
        .iter()
        .zip(output)
        .map(|(&t, &o)| t * (o + 1e-15).ln() + (1.0 - t) * ((1.0 + 1e-15) - o).ln())
        .fold(0.0, |acc, v| acc - v)
}

pub fn mean_squared_error(target: &[f64], output: &[f64]) -> f64 {
    let n = target.len().min(output.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = target
        .iter()
        .zip(output)
        .map(|(&t, &o)| (t - o) * (t - o))
        .sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_perfect_prediction() {
        assert_eq!(mean_squared_error(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_mse_value() {
        // ((1 - 0.5)^2 + (0 - 0.5)^2) / 2
        assert!((mean_squared_error(&[1.0, 0.0], &[0.5, 0.5]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rmse_is_root_of_mse() {
        let cost = Cost::RootMeanSquaredError.evaluate(&[1.0, 0.0], &[0.5, 0.5]);
        assert!((cost - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cross_entropy_small_for_good_prediction() {
        let good = cross_entropy(&[1.0, 0.0], &[0.99, 0.01]);
        let bad = cross_entropy(&[1.0, 0.0], &[0.01, 0.99]);
        assert!(good < bad);
        assert!(good > 0.0);
    }
}
