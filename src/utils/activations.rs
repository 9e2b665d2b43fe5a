//! Activation functions for neural networks
//!
//! Every function maps a pre-activation sum to either the activated value or,
//! when `derivative` is set, the derivative of the activation evaluated at that
//! same sum. Layers always call them with the stored pre-activation sum.

use serde::{Deserialize, Serialize};

/// Activation selected by identifier in a network or layer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Sigmoid,
    Tanh,
    Relu,
    /// Leaky ReLU with a network-wide negative slope.
    Lrelu,
    /// Randomised leaky ReLU, the negative slope is drawn once per unit.
    Rrelu,
    Elu,
    /// LeCun's scaled tanh: `1.7159 * tanh(2x/3)`.
    LecunTanh,
    /// Pass-through.
    #[serde(rename = "none", alias = "identity")]
    Identity,
}

/// Parameters an activation may need beyond the pre-activation sum.
///
/// `lrelu_slope` and `elu_alpha` come from the network configuration,
/// `rrelu_slope` belongs to the individual unit being activated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationContext {
    pub lrelu_slope: f64,
    pub elu_alpha: f64,
    pub rrelu_slope: f64,
}

impl Default for ActivationContext {
    fn default() -> Self {
        Self {
            lrelu_slope: 0.01,
            elu_alpha: 1.0,
            rrelu_slope: 0.0,
        }
    }
}

impl ActivationContext {
    /// The same context with a unit's own rrelu slope.
    pub fn for_unit(self, rrelu_slope: f64) -> Self {
        Self {
            rrelu_slope,
            ..self
        }
    }
}

impl Activation {
    /// Evaluate the activation (or its derivative) at `x`.
    pub fn apply(self, x: f64, derivative: bool, ctx: &ActivationContext) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x, derivative),
            Activation::Tanh => tanh(x, derivative),
            Activation::Relu => relu(x, derivative),
            Activation::Lrelu => leaky_relu(x, derivative, ctx.lrelu_slope),
            Activation::Rrelu => leaky_relu(x, derivative, ctx.rrelu_slope),
            Activation::Elu => elu(x, derivative, ctx.elu_alpha),
            Activation::LecunTanh => lecun_tanh(x, derivative),
            Activation::Identity => {
                if derivative {
                    1.0
                } else {
                    x
                }
            }
        }
    }

    /// Whether the activation is one of the rectifier family.
    pub fn is_rectifier(self) -> bool {
        matches!(
            self,
            Activation::Relu | Activation::Lrelu | Activation::Rrelu | Activation::Elu
        )
    }
}

/// Sigmoid: `1 / (1 + exp(-x))`, derivative `s(x) * (1 - s(x))`.
pub fn sigmoid(x: f64, derivative: bool) -> f64 {
    let s = 1.0 / (1.0 + (-x).exp());
    if derivative {
        s * (1.0 - s)
    } else {
        s
    }
}

/// Hyperbolic tangent, derivative `1 - tanh(x)^2`.
pub fn tanh(x: f64, derivative: bool) -> f64 {
    let t = x.tanh();
    if derivative {
        1.0 - t * t
    } else {
        t
    }
}

pub fn relu(x: f64, derivative: bool) -> f64 {
    match (derivative, x > 0.0) {
        (true, true) => 1.0,
        (true, false) => 0.0,
        (false, true) => x,
        (false, false) => 0.0,
    }
}

/// Leaky ReLU with negative-side `slope`. Shared by lrelu and rrelu.
pub fn leaky_relu(x: f64, derivative: bool, slope: f64) -> f64 {
    match (derivative, x > 0.0) {
        (true, true) => 1.0,
        (true, false) => slope,
        (false, true) => x,
        (false, false) => slope * x,
    }
}

/// ELU: `alpha * (exp(x) - 1)` below zero, identity above.
pub fn elu(x: f64, derivative: bool, alpha: f64) -> f64 {
    if x >= 0.0 {
        if derivative {
            1.0
        } else {
            x
        }
    } else if derivative {
        alpha * x.exp()
    } else {
        alpha * (x.exp() - 1.0)
    }
}

pub fn lecun_tanh(x: f64, derivative: bool) -> f64 {
    let t = (2.0 * x / 3.0).tanh();
    if derivative {
        1.7159 * (2.0 / 3.0) * (1.0 - t * t)
    } else {
        1.7159 * t
    }
}

/// Normalise `values` into a distribution summing to 1.
///
/// Values are divided by their total. A zero or non-finite total falls back to
/// the exponential form with max subtraction, which always sums to 1.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let total: f64 = values.iter().sum();
    if total != 0.0 && total.is_finite() {
        return values.iter().map(|v| v / total).collect();
    }

    let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max_value).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0, false) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_sigmoid_derivative_at_zero() {
        assert!((sigmoid(0.0, true) - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_relu_mixed() {
        let out: Vec<f64> = [-2.0, -1.0, 0.0, 1.0, 2.0]
            .iter()
            .map(|&x| relu(x, false))
            .collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_identity_passes_through() {
        let ctx = ActivationContext::default();
        assert_eq!(Activation::Identity.apply(-3.5, false, &ctx), -3.5);
        assert_eq!(Activation::Identity.apply(-3.5, true, &ctx), 1.0);
    }

    #[test]
    fn test_rrelu_uses_unit_slope() {
        let ctx = ActivationContext::default().for_unit(0.25);
        assert_eq!(Activation::Rrelu.apply(-4.0, false, &ctx), -1.0);
        assert_eq!(Activation::Rrelu.apply(-4.0, true, &ctx), 0.25);
    }

    #[test]
    fn test_softmax_zero_total_falls_back() {
        let out = softmax(&[1.0, -1.0]);
        let sum: f64 = out.iter().sum();
        assert!((sum - 1.0).abs() < EPSILON);
        assert!(out[0] > out[1]);
    }

    #[test]
    fn test_activation_serde_identifiers() {
        let parsed: Activation = serde_json::from_str("\"lecuntanh\"").unwrap();
        assert_eq!(parsed, Activation::LecunTanh);
        let parsed: Activation = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, Activation::Identity);
    }
}
