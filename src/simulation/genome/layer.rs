//! Single feed-forward layer with a configurable activation.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};

use crate::error::EvolutionError;

/// Activation applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Logistic function, range (0, 1).
    Sigmoid,
    /// Rectified linear unit, range [0, inf).
    Relu,
    /// Normalised exponential over the whole layer, components sum to 1.
    Softmax,
    /// Identity.
    Linear,
}

impl Activation {
    /// Applies the activation to `values` in place.
    #[inline]
    pub fn apply(self, values: &mut Array1<f32>) {
        match self {
            Activation::Sigmoid => values.mapv_inplace(|x| 1.0 / (1.0 + (-x).exp())),
            Activation::Relu => values.mapv_inplace(|x| x.max(0.0)),
            Activation::Softmax => {
                let max = values.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
                values.mapv_inplace(|x| (x - max).exp());
                let sum = values.sum();
                *values /= sum;
            }
            Activation::Linear => {}
        }
    }

    /// Lowercase name used in settings files and records.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Relu => "relu",
            Activation::Softmax => "softmax",
            Activation::Linear => "linear",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = EvolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::Relu),
            "softmax" => Ok(Activation::Softmax),
            "linear" => Ok(Activation::Linear),
            other => Err(EvolutionError::configuration(format!(
                "unsupported activation '{other}', expected one of sigmoid, relu, softmax, linear"
            ))),
        }
    }
}

/// A single layer of a genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Weight matrix (`output_size` × `input_size`).
    pub weights: Array2<f32>,
    /// Bias vector (`output_size`).
    pub biases: Array1<f32>,
    /// Activation applied to the affine output.
    pub activation: Activation,
}

impl Layer {
    /// Creates a layer from explicit parameters.
    pub fn new(weights: Array2<f32>, biases: Array1<f32>, activation: Activation) -> Self {
        Self {
            weights,
            biases,
            activation,
        }
    }

    /// Creates a new layer with weights and biases drawn from `[-scale, scale)`.
    pub fn new_random(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        scale: f32,
    ) -> Self {
        Self {
            weights: Array2::random((output_size, input_size), Uniform::new(-scale, scale)),
            biases: Array1::random(output_size, Uniform::new(-scale, scale)),
            activation,
        }
    }

    /// Number of inputs the layer expects.
    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of outputs the layer produces.
    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of weights plus biases.
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Performs the affine transform followed by the activation.
    #[inline]
    pub fn forward(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut output = self.weights.dot(inputs);
        output += &self.biases;
        self.activation.apply(&mut output);
        output
    }

    /// Weights in row-major order, then biases.
    pub fn parameters(&self) -> impl Iterator<Item = &f32> {
        self.weights.iter().chain(self.biases.iter())
    }

    /// Mutable view of [`Layer::parameters`], same order.
    pub fn parameters_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.weights.iter_mut().chain(self.biases.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let mut values = array![1.0, 2.0, 3.0];
        Activation::Softmax.apply(&mut values);
        assert!((values.sum() - 1.0).abs() < 1e-6);
        assert!(values[2] > values[1] && values[1] > values[0]);
    }

    #[test]
    fn test_forward_linear() {
        let layer = Layer::new(
            array![[1.0, 2.0], [0.0, -1.0]],
            array![0.5, 0.0],
            Activation::Linear,
        );
        let output = layer.forward(&array![1.0, 1.0]);
        assert_eq!(output, array![3.5f32, -1.0]);
    }

    #[test]
    fn test_parse_activation() {
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
        assert!("tanh".parse::<Activation>().is_err());
    }
}
