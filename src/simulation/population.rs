//! Generational population: evaluation, statistics, culling, persistence and
//! repopulation.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

use super::genome::{CrossoverKind, Genome, MutationKind, Structure};
use super::params::SimulationParams;
use super::persistence;
use super::simulator::{self, Evaluation};

/// Absorbs products like `10.0 * 0.7 == 7.000000000000001` before rounding.
const ROUNDING_SLACK: f64 = 1e-9;

/// One genome together with the results of its latest evaluation.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Shared, read-only parameters.
    pub genome: Arc<Genome>,
    /// Ticks survived in the latest evaluation.
    pub fitness: u32,
    /// Obstacles passed in the latest evaluation.
    pub score: u32,
    /// Best score of the latest evaluation.
    pub best_score: u32,
}

impl Candidate {
    /// Creates an unevaluated candidate around `genome`.
    pub fn new(genome: Arc<Genome>) -> Self {
        Self {
            genome,
            fitness: 0,
            score: 0,
            best_score: 0,
        }
    }

    /// Stores the outcome of a simulation run.
    pub fn record(&mut self, evaluation: Evaluation) {
        self.fitness = evaluation.fitness;
        self.score = evaluation.score;
        self.best_score = evaluation.best_score;
    }
}

/// Which genomes are kept in the history folder each generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HistoryMode {
    /// Keep nothing.
    None,
    /// Keep the champion of every generation in one flat folder.
    Champ,
    /// Keep the best `n` of every generation.
    Absolute(usize),
    /// Keep the best fraction of every generation.
    Percentage(f64),
    /// Keep the whole generation, unsorted.
    Entire,
}

/// Names accepted for the history mode in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    /// See [`HistoryMode::None`].
    None,
    /// See [`HistoryMode::Champ`].
    Champ,
    /// See [`HistoryMode::Absolute`].
    Absolute,
    /// See [`HistoryMode::Percentage`].
    Percentage,
    /// See [`HistoryMode::Entire`].
    Entire,
}

impl HistoryMode {
    /// Combines a mode name with its value from settings.
    pub fn from_config(kind: HistoryKind, value: f64) -> Result<Self> {
        match kind {
            HistoryKind::None => Ok(HistoryMode::None),
            HistoryKind::Champ => Ok(HistoryMode::Champ),
            HistoryKind::Entire => Ok(HistoryMode::Entire),
            HistoryKind::Absolute => {
                if value < 1.0 || value.fract() > 0.0 {
                    return Err(EvolutionError::configuration(format!(
                        "absolute history value must be a positive integer, got {value}"
                    )));
                }
                Ok(HistoryMode::Absolute(value as usize))
            }
            HistoryKind::Percentage => {
                if !(value > 0.0 && value <= 1.0) {
                    return Err(EvolutionError::configuration(format!(
                        "percentage history value must be in (0, 1], got {value}"
                    )));
                }
                Ok(HistoryMode::Percentage(value))
            }
        }
    }

    /// How many genomes of a generation of `population_size` are kept.
    pub fn kept_count(self, population_size: usize) -> usize {
        match self {
            HistoryMode::None => 0,
            HistoryMode::Champ => population_size.min(1),
            HistoryMode::Absolute(n) => n.min(population_size),
            HistoryMode::Percentage(fraction) => {
                let count = (population_size as f64 * fraction + ROUNDING_SLACK) as usize;
                count.clamp(1, population_size.max(1))
            }
            HistoryMode::Entire => population_size,
        }
    }
}

/// All candidates of the current generation.
#[derive(Debug, Clone)]
pub struct Population {
    /// Target number of candidates after repopulation.
    pub size: usize,
    /// Candidates in submission order.
    pub candidates: Vec<Candidate>,
    /// 1-based generation counter.
    pub current_generation: u32,
    average_fitness: f64,
}

impl Population {
    /// Creates an empty population that will hold `size` candidates.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            candidates: Vec::with_capacity(size),
            current_generation: 1,
            average_fitness: 0.0,
        }
    }

    /// Fills every slot with a freshly randomised genome.
    pub fn new_genomes(&mut self, structure: &Structure) {
        self.candidates = (0..self.size)
            .map(|_| Candidate::new(Arc::new(Genome::new(structure))))
            .collect();
        self.average_fitness = 0.0;
    }

    /// Replaces the candidates with the records in `folder`.
    ///
    /// The population size becomes the number of records found.
    pub fn load(&mut self, folder: impl AsRef<Path>) -> Result<()> {
        let genomes = persistence::read_folder(folder)?;
        self.size = genomes.len();
        self.candidates = genomes
            .into_iter()
            .map(|genome| Candidate::new(Arc::new(genome)))
            .collect();
        self.average_fitness = 0.0;
        Ok(())
    }

    /// Simulates every candidate on `pool`, one task per candidate.
    ///
    /// Results are written back in submission order.
    pub fn evaluate(&mut self, pool: &ThreadPool, params: &SimulationParams) -> Result<()> {
        let evaluations = pool.install(|| {
            self.candidates
                .par_iter()
                .map(|candidate| simulator::evaluate(Arc::clone(&candidate.genome), params))
                .collect::<Result<Vec<_>>>()
        })?;

        for (candidate, evaluation) in self.candidates.iter_mut().zip(evaluations) {
            candidate.record(evaluation);
        }
        self.average_fitness = mean_fitness(&self.candidates);

        tracing::debug!(
            "evaluated {} candidates of generation {}",
            self.candidates.len(),
            self.current_generation
        );
        Ok(())
    }

    /// Candidate with the highest fitness, the earliest one on ties.
    pub fn champion(&self) -> Option<&Candidate> {
        self.candidates.iter().fold(None, |best, candidate| match best {
            Some(b) if b.fitness >= candidate.fitness => Some(b),
            _ => Some(candidate),
        })
    }

    /// Mean fitness of the current candidates.
    ///
    /// After [`Population::cull`] this covers the retained parents only.
    pub fn average_fitness(&self) -> f64 {
        self.average_fitness
    }

    /// Highest score among the current candidates.
    pub fn max_score(&self) -> u32 {
        self.candidates.iter().map(|c| c.score).max().unwrap_or(0)
    }

    /// Number of parents kept by [`Population::cull`].
    pub fn parent_count(&self, parent_percentage: f64) -> usize {
        let count = (self.size as f64 * parent_percentage - ROUNDING_SLACK).ceil() as usize;
        count.clamp(1, self.candidates.len().max(1))
    }

    /// Keeps only the fittest `ceil(size * parent_percentage)` candidates.
    ///
    /// Sorting is stable, so equal fitness keeps submission order.
    pub fn cull(&mut self, parent_percentage: f64) {
        let keep = self.parent_count(parent_percentage);
        self.candidates.sort_by(|a, b| b.fitness.cmp(&a.fitness));
        self.candidates.truncate(keep);
        self.average_fitness = mean_fitness(&self.candidates);
    }

    /// Overwrites `folder` with the current candidates' genomes.
    pub fn save_parents(&self, folder: impl AsRef<Path>) -> Result<()> {
        persistence::write_folder(folder, self.candidates.iter().map(|c| c.genome.as_ref()))?;
        Ok(())
    }

    /// Records this generation in the history folder according to `mode`.
    ///
    /// Call before [`Population::cull`] so the whole generation is visible.
    pub fn save_history(&self, folder: impl AsRef<Path>, mode: HistoryMode) -> Result<()> {
        let folder = folder.as_ref();
        let generation_folder = persistence::generation_folder(folder, self.current_generation);

        match mode {
            HistoryMode::None => Ok(()),
            HistoryMode::Champ => match self.champion() {
                Some(champ) => {
                    persistence::write_champion(folder, self.current_generation, &champ.genome)
                }
                None => Err(EvolutionError::EmptyPopulation),
            },
            HistoryMode::Absolute(_) | HistoryMode::Percentage(_) => {
                let keep = mode.kept_count(self.candidates.len());
                let ranked = self.ranked();
                persistence::write_folder(
                    generation_folder,
                    ranked.iter().take(keep).map(|c| c.genome.as_ref()),
                )?;
                Ok(())
            }
            HistoryMode::Entire => {
                persistence::write_folder(
                    generation_folder,
                    self.candidates.iter().map(|c| c.genome.as_ref()),
                )?;
                Ok(())
            }
        }
    }

    /// Refills the population to `size` with children of the current
    /// candidates and advances the generation counter.
    ///
    /// Parents are drawn uniformly with replacement. The current candidates
    /// stay in the population unchanged, ahead of their offspring.
    pub fn repopulate(
        &mut self,
        crossover: CrossoverKind,
        mutation: MutationKind,
        mutation_rate: f32,
    ) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }

        let mut rng = rand::rng();
        let parent_count = self.candidates.len();
        let missing = self.size.saturating_sub(parent_count);

        let mut children = Vec::with_capacity(missing);
        for _ in 0..missing {
            let mother = &self.candidates[rng.random_range(0..parent_count)].genome;
            let father = &self.candidates[rng.random_range(0..parent_count)].genome;
            let mut child = mother.crossover(father, crossover)?;
            child.mutate(mutation, mutation_rate);
            children.push(Candidate::new(Arc::new(child)));
        }

        for parent in &mut self.candidates {
            *parent = Candidate::new(Arc::clone(&parent.genome));
        }
        self.candidates.extend(children);
        self.current_generation += 1;
        self.average_fitness = 0.0;
        Ok(())
    }

    /// Candidates sorted by fitness, best first, ties in submission order.
    fn ranked(&self) -> Vec<&Candidate> {
        let mut ranked: Vec<&Candidate> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| b.fitness.cmp(&a.fitness));
        ranked
    }
}

fn mean_fitness(candidates: &[Candidate]) -> f64 {
    if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|c| c.fitness as f64).sum::<f64>() / candidates.len() as f64
    }
}
