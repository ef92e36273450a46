//! Feed-forward genome that maps an observation to an action vector.
//!
//! A genome is a fixed stack of [`Layer`]s. Its parameters can be recombined
//! with another genome of identical [`Structure`] and mutated in place, which
//! is all the genetic algorithm needs.

use ndarray::Array1;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

use super::params::OBSERVATION_WIDTH;

pub mod layer;

pub use layer::{Activation, Layer};

/// Range fresh parameters are drawn from, `[-INIT_SCALE, INIT_SCALE)`.
pub const INIT_SCALE: f32 = 1.0;
/// Standard deviation of gaussian mutation.
pub const MUTATION_STD: f32 = 0.2;
/// Uniform mutation replaces a parameter with a value in `[-MUTATION_BOUND, MUTATION_BOUND)`.
pub const MUTATION_BOUND: f32 = 1.0;

/// Output width and activation of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Number of outputs.
    pub width: usize,
    /// Activation applied to those outputs.
    pub activation: Activation,
}

impl LayerSpec {
    /// Shorthand constructor.
    pub fn new(width: usize, activation: Activation) -> Self {
        Self { width, activation }
    }
}

/// Shape of a genome: its input width and the ordered layer specs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Length of the input vector.
    pub input_width: usize,
    /// Layers from input to output.
    pub layers: Vec<LayerSpec>,
}

impl Structure {
    /// Structure over the game's observation vector.
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self {
            input_width: OBSERVATION_WIDTH,
            layers,
        }
    }

    /// Checks that the structure describes a usable network.
    pub fn validate(&self) -> Result<()> {
        if self.input_width == 0 {
            return Err(EvolutionError::configuration("input width must be positive"));
        }
        if self.layers.is_empty() {
            return Err(EvolutionError::configuration(
                "network structure needs at least one layer",
            ));
        }
        if let Some(i) = self.layers.iter().position(|spec| spec.width == 0) {
            return Err(EvolutionError::configuration(format!(
                "layer {i} has zero width"
            )));
        }
        Ok(())
    }

    /// Width of the last layer.
    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(self.input_width, |spec| spec.width)
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        let mut inputs = self.input_width;
        let mut count = 0;
        for spec in &self.layers {
            count += (inputs + 1) * spec.width;
            inputs = spec.width;
        }
        count
    }
}

/// How two parents are recombined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossoverKind {
    /// Prefix from one parent, suffix from the other.
    OnePoint,
    /// Each parameter from either parent with probability 0.5.
    Uniform,
}

/// How a child's parameters are perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    /// Add zero-mean normal noise.
    Gaussian,
    /// Replace with a bounded uniform draw.
    Uniform,
}

/// A feed-forward network whose parameters are evolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Expected observation length.
    input_width: usize,
    /// Ordered layers from input to output.
    layers: Vec<Layer>,
}

impl Genome {
    /// Creates a genome with random parameters for `structure`.
    pub fn new(structure: &Structure) -> Self {
        let mut inputs = structure.input_width;
        let layers = structure
            .layers
            .iter()
            .map(|spec| {
                let layer = Layer::new_random(inputs, spec.width, spec.activation, INIT_SCALE);
                inputs = spec.width;
                layer
            })
            .collect();

        Self {
            input_width: structure.input_width,
            layers,
        }
    }

    /// Builds a genome from explicit layers, checking that dimensions chain.
    pub fn from_layers(input_width: usize, layers: Vec<Layer>) -> Result<Self> {
        let genome = Self {
            input_width,
            layers,
        };
        genome.validate()?;
        Ok(genome)
    }

    /// Verifies that every matrix matches the declared structure.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(EvolutionError::structure_mismatch("genome has no layers"));
        }

        let mut inputs = self.input_width;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.input_size() != inputs {
                return Err(EvolutionError::structure_mismatch(format!(
                    "layer {i} expects {} inputs but receives {inputs}",
                    layer.input_size()
                )));
            }
            if layer.biases.len() != layer.output_size() {
                return Err(EvolutionError::structure_mismatch(format!(
                    "layer {i} has {} biases for {} outputs",
                    layer.biases.len(),
                    layer.output_size()
                )));
            }
            if layer.output_size() == 0 {
                return Err(EvolutionError::structure_mismatch(format!(
                    "layer {i} has zero width"
                )));
            }
            inputs = layer.output_size();
        }
        Ok(())
    }

    /// Expected observation length.
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// Ordered layers.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Descriptor of this genome's shape.
    pub fn structure(&self) -> Structure {
        Structure {
            input_width: self.input_width,
            layers: self
                .layers
                .iter()
                .map(|layer| LayerSpec::new(layer.output_size(), layer.activation))
                .collect(),
        }
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Runs the observation through every layer.
    pub fn propagate(&self, observation: &Array1<f32>) -> Result<Array1<f32>> {
        if observation.len() != self.input_width {
            return Err(EvolutionError::Shape {
                expected: self.input_width,
                actual: observation.len(),
            });
        }

        let mut output = observation.clone();
        for layer in &self.layers {
            output = layer.forward(&output);
        }
        Ok(output)
    }

    /// Flattens all weights and biases into a single vector.
    pub fn to_flat_vector(&self) -> Vec<f32> {
        self.parameters().copied().collect()
    }

    fn parameters(&self) -> impl Iterator<Item = &f32> {
        self.layers.iter().flat_map(|layer| layer.parameters())
    }

    fn parameters_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.layers.iter_mut().flat_map(|layer| layer.parameters_mut())
    }

    /// Creates a child of identical structure from `self` and `other`.
    ///
    /// Every child parameter is copied from one of the two parents; neither
    /// parent is modified. Fails if the structures differ or are empty.
    pub fn crossover(&self, other: &Genome, kind: CrossoverKind) -> Result<Genome> {
        let ours = self.structure();
        let theirs = other.structure();
        if ours != theirs {
            return Err(EvolutionError::structure_mismatch(format!(
                "cannot cross {ours:?} with {theirs:?}"
            )));
        }

        let donor = other.to_flat_vector();
        if donor.is_empty() {
            return Err(EvolutionError::structure_mismatch(
                "cannot cross genomes without parameters",
            ));
        }

        let mut rng = rand::rng();
        let mut child = self.clone();

        match kind {
            CrossoverKind::OnePoint => {
                let split = rng.random_range(0..donor.len());
                for (param, &value) in child.parameters_mut().zip(&donor).skip(split) {
                    *param = value;
                }
            }
            CrossoverKind::Uniform => {
                for (param, &value) in child.parameters_mut().zip(&donor) {
                    if rng.random_bool(0.5) {
                        *param = value;
                    }
                }
            }
        }

        Ok(child)
    }

    /// Perturbs each parameter with probability `rate`.
    pub fn mutate(&mut self, kind: MutationKind, rate: f32) {
        let n = self.parameter_count();
        let rolls = Array1::random(n, Uniform::new(0.0f32, 1.0));
        let draws: Array1<f32> = match kind {
            MutationKind::Gaussian => Array1::<f32>::random(n, StandardNormal) * MUTATION_STD,
            MutationKind::Uniform => {
                Array1::random(n, Uniform::new(-MUTATION_BOUND, MUTATION_BOUND))
            }
        };

        for ((param, &roll), &draw) in self.parameters_mut().zip(&rolls).zip(&draws) {
            if roll < rate {
                match kind {
                    MutationKind::Gaussian => *param += draw,
                    MutationKind::Uniform => *param = draw,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_count_matches_structure() {
        let structure = Structure::new(vec![
            LayerSpec::new(3, Activation::Relu),
            LayerSpec::new(1, Activation::Sigmoid),
        ]);
        let genome = Genome::new(&structure);
        assert_eq!(genome.parameter_count(), structure.parameter_count());
        assert_eq!(genome.parameter_count(), (4 + 1) * 3 + (3 + 1));
        assert_eq!(genome.structure(), structure);
    }

    #[test]
    fn test_empty_structure_is_rejected() {
        assert!(Structure::new(Vec::new()).validate().is_err());
    }
}
