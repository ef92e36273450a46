//! Run settings loaded once at startup from a TOML file.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};
use crate::simulation::genome::{Activation, CrossoverKind, LayerSpec, MutationKind, Structure};
use crate::simulation::params::SimulationParams;
use crate::simulation::population::{HistoryKind, HistoryMode};

/// How the first generation is created.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CreationMode {
    /// Random genomes.
    New,
    /// Genomes read from `load_folder`, then repopulated.
    Load,
}

/// Population bookkeeping.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of candidates per generation.
    pub size: usize,
    /// How generation 1 is created.
    pub creation: CreationMode,
    /// Folder to load from when `creation = "load"`.
    pub load_folder: PathBuf,
    /// Folder overwritten with each generation's parents.
    pub parents_folder: PathBuf,
    /// Number of generations to run.
    pub total_generations: u32,
    /// Evaluation threads.
    pub workers: usize,
}

/// What is kept across generations for replay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Which genomes are kept.
    pub mode: HistoryKind,
    /// Count for `absolute`, fraction for `percentage`, ignored otherwise.
    pub value: f64,
    /// Root of the history layout.
    pub folder: PathBuf,
}

/// Network shape, after the fixed observation input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenomeConfig {
    /// Layers from input to output.
    pub layers: Vec<LayerSpec>,
}

/// Selection and variation operators.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Fraction of each generation kept as parents, in (0, 1].
    pub parent_percentage: f64,
    /// Recombination operator.
    pub crossover: CrossoverKind,
    /// Mutation operator.
    pub mutation: MutationKind,
    /// Per-parameter mutation probability, in [0, 1].
    pub mutation_rate: f32,
}

/// Complete run configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Population bookkeeping.
    pub population: PopulationConfig,
    /// History layout.
    pub history: HistoryConfig,
    /// Network shape.
    pub genome: GenomeConfig,
    /// Genetic operators.
    pub evolution: EvolutionConfig,
    /// Game settings.
    pub simulation: SimulationParams,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            creation: CreationMode::New,
            load_folder: PathBuf::new(),
            parents_folder: PathBuf::from("latest_genomes"),
            total_generations: 25,
            workers: 2,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            mode: HistoryKind::Absolute,
            value: 50.0,
            folder: PathBuf::from("history"),
        }
    }
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            layers: vec![LayerSpec::new(1, Activation::Sigmoid)],
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            parent_percentage: 0.2,
            crossover: CrossoverKind::OnePoint,
            mutation: MutationKind::Gaussian,
            mutation_rate: 0.05,
        }
    }
}

impl Config {
    /// Reads and validates a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EvolutionError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| EvolutionError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let population = &self.population;
        if population.size == 0 {
            return Err(EvolutionError::configuration(
                "population size must be positive",
            ));
        }
        if population.total_generations == 0 {
            return Err(EvolutionError::configuration(
                "total generations must be positive",
            ));
        }
        if population.workers == 0 {
            return Err(EvolutionError::configuration(
                "worker count must be positive",
            ));
        }
        if population.creation == CreationMode::Load && population.load_folder.as_os_str().is_empty()
        {
            return Err(EvolutionError::configuration(
                "creation mode 'load' needs a load folder",
            ));
        }

        // both folders are wiped before they are rewritten
        let parents = without_cur_dir(&population.parents_folder);
        if parents.as_os_str().is_empty() {
            return Err(EvolutionError::configuration(format!(
                "parents folder must be a dedicated folder, got '{}'",
                population.parents_folder.display()
            )));
        }
        if self.history.mode != HistoryKind::None {
            let history = without_cur_dir(&self.history.folder);
            if history.as_os_str().is_empty() {
                return Err(EvolutionError::configuration(format!(
                    "history folder must be a dedicated folder, got '{}'",
                    self.history.folder.display()
                )));
            }
            if history.starts_with(&parents) {
                return Err(EvolutionError::configuration(format!(
                    "parents folder '{}' would overwrite history folder '{}'",
                    population.parents_folder.display(),
                    self.history.folder.display()
                )));
            }
        }

        let evolution = &self.evolution;
        if !(evolution.parent_percentage > 0.0 && evolution.parent_percentage <= 1.0) {
            return Err(EvolutionError::configuration(format!(
                "parent percentage must be in (0, 1], got {}",
                evolution.parent_percentage
            )));
        }
        if !(0.0..=1.0).contains(&evolution.mutation_rate) {
            return Err(EvolutionError::configuration(format!(
                "mutation rate must be in [0, 1], got {}",
                evolution.mutation_rate
            )));
        }

        if self.simulation.goal_score == 0 {
            return Err(EvolutionError::configuration("goal score must be positive"));
        }

        self.structure().validate()?;
        self.history_mode()?;
        Ok(())
    }

    /// Network structure over the observation vector.
    pub fn structure(&self) -> Structure {
        Structure::new(self.genome.layers.clone())
    }

    /// Typed history mode.
    pub fn history_mode(&self) -> Result<HistoryMode> {
        HistoryMode::from_config(self.history.mode, self.history.value)
    }
}

/// Drops `.` components so `./history` and `history` compare equal.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
