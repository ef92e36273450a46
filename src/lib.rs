//! # Flappy Evo - Neuroevolution for a side-scrolling obstacle game
//!
//! Evolves small feed-forward networks that steer a falling agent through
//! gaps in scrolling obstacles. Each generation is simulated in parallel,
//! ranked by survival time, culled and refilled by crossover and mutation.
//!
//! ## Features
//!
//! - Feed-forward genomes with sigmoid, relu, softmax or linear layers
//! - One-point and uniform crossover, gaussian and uniform mutation
//! - Seedable procedural obstacle course, one per agent
//! - Parallel evaluation on a fixed-size rayon pool
//! - JSON genome records for resuming training and replaying history
//!
//! ## Core Modules
//!
//! - [`simulation::genome`] - Network parameters and genetic operators
//! - [`simulation::agent`] - Agent physics and decisions
//! - [`simulation::obstacles`] - Obstacle generation
//! - [`simulation::simulator`] - Fitness evaluation
//! - [`simulation::population`] - Generational bookkeeping
//! - [`simulation::trainer`] - Run orchestration
//! - [`simulation::replay`] - Headless replay for renderers

/// Run settings.
pub mod config;
/// Error types.
pub mod error;

/// Core simulation logic and data structures.
pub mod simulation {
    /// Agent physics, observation and action selection.
    pub mod agent;
    /// Feed-forward genome with crossover and mutation.
    pub mod genome;
    /// Scrolling obstacles and their generator.
    pub mod obstacles;
    /// Game constants and per-run parameters.
    pub mod params;
    /// Genome records and history layout on disk.
    pub mod persistence;
    /// Candidates, selection and repopulation.
    pub mod population;
    /// Replay of saved generations for external renderers.
    pub mod replay;
    /// Single-candidate simulation loop.
    pub mod simulator;
    /// Generation loop and termination.
    pub mod trainer;
}

pub use config::Config;
pub use error::{EvolutionError, Result};
