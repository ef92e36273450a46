//! Turns a genome into a fitness value by playing one game.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::agent::Agent;
use super::genome::Genome;
use super::params::SimulationParams;

/// Outcome of one simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Ticks survived. The tick that killed the agent is not counted.
    pub fitness: u32,
    /// Obstacles passed.
    pub score: u32,
    /// Best score of the run, equal to the final score.
    pub best_score: u32,
}

/// Plays `agent` from its start state until it dies or reaches `goal_score`.
///
/// The agent's genome is only read.
pub fn simulate(agent: &mut Agent, goal_score: u32) -> Result<Evaluation> {
    agent.start_state();

    let mut fitness = 0;
    while agent.alive && agent.score < goal_score {
        agent.tick()?;
        if agent.alive {
            fitness += 1;
        }
    }

    Ok(Evaluation {
        fitness,
        score: agent.score,
        best_score: agent.score,
    })
}

/// Builds a fresh agent around `genome` and simulates it.
///
/// This is the unit of work handed to evaluation workers: only the genome
/// handle and the seed go in, only the [`Evaluation`] comes out.
pub fn evaluate(genome: Arc<Genome>, params: &SimulationParams) -> Result<Evaluation> {
    let mut agent = Agent::new(genome, params.seed);
    simulate(&mut agent, params.goal_score)
}
