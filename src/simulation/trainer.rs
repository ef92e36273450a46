//! Drives a population through generations until the generation limit or
//! the goal score is reached.
//!
//! Each generation runs Evaluate, Report, History, Cull, Parents and then
//! either stops or repopulates. Failed saves are logged and counted but do
//! not stop evolution.

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::config::{Config, CreationMode};
use crate::error::{EvolutionError, Result};

use super::persistence;
use super::population::{HistoryMode, Population};

/// Statistics of one finished generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation number, starting at 1.
    pub generation: u32,
    /// Best score of the champion.
    pub champion_score: u32,
    /// Fitness of the champion.
    pub champion_fitness: u32,
    /// Mean fitness of the whole generation.
    pub average_fitness: f64,
    /// Mean fitness of the retained parents.
    pub parent_average_fitness: f64,
    /// Whether any candidate reached the goal score.
    pub goal_reached: bool,
}

/// Outcome of [`Trainer::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// One report per completed generation.
    pub reports: Vec<GenerationReport>,
    /// Whether the run stopped because the goal score was reached.
    pub goal_reached: bool,
    /// Saves that failed and were skipped; history is incomplete if non-zero.
    pub persistence_failures: usize,
}

/// Owns the population, the configuration and the evaluation pool.
pub struct Trainer {
    config: Config,
    history: HistoryMode,
    population: Population,
    pool: ThreadPool,
    persistence_failures: usize,
}

impl Trainer {
    /// Validates `config`, builds the worker pool, creates the first
    /// generation and clears any history an earlier run left behind.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let history = config.history_mode()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.population.workers)
            .build()
            .map_err(|e| EvolutionError::configuration(format!("cannot build worker pool: {e}")))?;

        let mut population = Population::new(config.population.size);
        match config.population.creation {
            CreationMode::New => population.new_genomes(&config.structure()),
            CreationMode::Load => {
                population.load(&config.population.load_folder)?;
                tracing::info!(
                    "loaded {} genomes from {}",
                    population.candidates.len(),
                    config.population.load_folder.display()
                );
                population.size = config.population.size.max(population.candidates.len());
                population.repopulate(
                    config.evolution.crossover,
                    config.evolution.mutation,
                    config.evolution.mutation_rate,
                )?;
            }
        }

        let mut trainer = Self {
            config,
            history,
            population,
            pool,
            persistence_failures: 0,
        };

        // must follow the load: the load folder may sit inside the old history
        let cleared = match trainer.history {
            HistoryMode::None => Ok(()),
            _ => persistence::clear_history(&trainer.config.history.folder),
        };
        if let Err(e) = cleared {
            trainer.skip_failed_save(e)?;
        }
        Ok(trainer)
    }

    /// Current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Settings the trainer was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one generation up to, but not including, repopulation.
    pub fn step(&mut self) -> Result<GenerationReport> {
        let generation = self.population.current_generation;

        self.population
            .evaluate(&self.pool, &self.config.simulation)?;

        let (champion_score, champion_fitness) = self
            .population
            .champion()
            .map(|c| (c.best_score, c.fitness))
            .ok_or(EvolutionError::EmptyPopulation)?;
        let average_fitness = self.population.average_fitness();
        let goal_reached = self.population.max_score() >= self.config.simulation.goal_score;

        if let Err(e) = self
            .population
            .save_history(&self.config.history.folder, self.history)
        {
            self.skip_failed_save(e)?;
        }

        self.population.cull(self.config.evolution.parent_percentage);
        let parent_average_fitness = self.population.average_fitness();

        if let Err(e) = self
            .population
            .save_parents(&self.config.population.parents_folder)
        {
            self.skip_failed_save(e)?;
        }

        tracing::info!(
            "generation: {}, champ's best score: {}, best fitness: {}, average fitness: {:.0}, average parent fitness: {:.0}",
            generation,
            champion_score,
            champion_fitness,
            average_fitness,
            parent_average_fitness
        );

        Ok(GenerationReport {
            generation,
            champion_score,
            champion_fitness,
            average_fitness,
            parent_average_fitness,
            goal_reached,
        })
    }

    /// Evolves until the generation limit or the goal score.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while self.population.current_generation <= self.config.population.total_generations {
            let report = self.step()?;
            summary.reports.push(report);

            if report.goal_reached {
                tracing::info!(
                    "goal score {} reached in generation {}",
                    self.config.simulation.goal_score,
                    report.generation
                );
                summary.goal_reached = true;
                break;
            }

            self.population.repopulate(
                self.config.evolution.crossover,
                self.config.evolution.mutation,
                self.config.evolution.mutation_rate,
            )?;
        }

        summary.persistence_failures = self.persistence_failures;
        if summary.persistence_failures > 0 {
            tracing::warn!(
                "{} saves failed, history is incomplete",
                summary.persistence_failures
            );
        }
        Ok(summary)
    }

    /// Save errors are tolerated; anything else is fatal.
    fn skip_failed_save(&mut self, error: EvolutionError) -> Result<()> {
        if error.is_persistence() {
            tracing::warn!("skipping save: {}", error);
            self.persistence_failures += 1;
            Ok(())
        } else {
            Err(error)
        }
    }
}
