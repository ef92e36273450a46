//! Headless replay of saved history for an external renderer.
//!
//! A [`Replay`] selects the genomes of one generation; a [`ReplayRun`] plays
//! them side by side on a shared obstacle seed and exposes per-tick
//! [`Frame`]s. Drawing and input handling live with the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

use super::agent::Agent;
use super::genome::Genome;
use super::obstacles::Obstacle;
use super::persistence;
use super::population::HistoryMode;

/// Genomes of the currently selected generation.
#[derive(Debug, Clone)]
pub struct Replay {
    folder: PathBuf,
    is_champs: bool,
    generations: Vec<u32>,
    current_generation: u32,
    genomes: Vec<Arc<Genome>>,
}

impl Replay {
    /// Opens a history folder written with `mode` and selects the earliest
    /// saved generation.
    ///
    /// Only generations found on disk can be selected.
    pub fn open(folder: impl AsRef<Path>, mode: HistoryMode) -> Result<Self> {
        if mode == HistoryMode::None {
            return Err(EvolutionError::configuration(
                "no history was saved during evolution; adjust the history settings and train again",
            ));
        }

        let folder = folder.as_ref().to_path_buf();
        let is_champs = mode == HistoryMode::Champ;
        let generations = persistence::saved_generations(&folder, is_champs)?;
        let first = generations
            .first()
            .copied()
            .ok_or_else(|| EvolutionError::persistence(&folder, "no saved generations found"))?;

        let mut replay = Self {
            folder,
            is_champs,
            generations,
            current_generation: first,
            genomes: Vec::new(),
        };
        replay.set_generation(first)?;
        Ok(replay)
    }

    /// Generation being replayed.
    pub fn current_generation(&self) -> u32 {
        self.current_generation
    }

    /// Saved generation numbers, ascending.
    pub fn generations(&self) -> &[u32] {
        &self.generations
    }

    /// Genomes of the current generation; a single champion in champ mode.
    pub fn current_genomes(&self) -> &[Arc<Genome>] {
        &self.genomes
    }

    /// Loads `generation`, which must be one of [`Replay::generations`].
    pub fn set_generation(&mut self, generation: u32) -> Result<()> {
        if !self.generations.contains(&generation) {
            return Err(EvolutionError::configuration(format!(
                "generation {generation} was not saved in {}, saved generations are {:?}",
                self.folder.display(),
                self.generations
            )));
        }

        self.genomes = if self.is_champs {
            let path = persistence::record_path(&self.folder, generation as usize);
            vec![Arc::new(persistence::load_genome(path)?)]
        } else {
            persistence::read_folder(persistence::generation_folder(&self.folder, generation))?
                .into_iter()
                .map(Arc::new)
                .collect()
        };
        self.current_generation = generation;
        Ok(())
    }

    /// Moves to the next saved generation if there is one.
    pub fn next_generation(&mut self) -> Result<bool> {
        let current = self.current_generation;
        match self.generations.iter().copied().find(|&g| g > current) {
            Some(next) => {
                self.set_generation(next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves to the previous saved generation if there is one.
    pub fn previous_generation(&mut self) -> Result<bool> {
        let current = self.current_generation;
        match self.generations.iter().rev().copied().find(|&g| g < current) {
            Some(previous) => {
                self.set_generation(previous)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Starts the current genomes on one shared obstacle course.
    pub fn start_run(&self, seed: u64) -> ReplayRun {
        ReplayRun::new(&self.genomes, seed)
    }
}

/// Observable state of one living agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    /// Index of the agent's genome in [`Replay::current_genomes`].
    pub index: usize,
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub position: f32,
    /// Vertical velocity.
    pub velocity: f32,
    /// Obstacles passed.
    pub score: u32,
    /// Always true for agents in a frame.
    pub alive: bool,
}

/// Everything a renderer needs for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Ticks played so far.
    pub tick: u64,
    /// Agents still alive.
    pub agents: Vec<AgentView>,
    /// Obstacle queue, identical for every agent on a shared seed.
    pub obstacles: Vec<Obstacle>,
}

/// Agents playing the same seeded course in lockstep.
#[derive(Debug, Clone)]
pub struct ReplayRun {
    agents: Vec<Agent>,
    tick: u64,
}

impl ReplayRun {
    /// Creates one agent per genome, all seeded with `seed`.
    pub fn new(genomes: &[Arc<Genome>], seed: u64) -> Self {
        Self {
            agents: genomes
                .iter()
                .map(|genome| Agent::new(Arc::clone(genome), Some(seed)))
                .collect(),
            tick: 0,
        }
    }

    /// Restarts every agent on the same course.
    pub fn restart(&mut self) {
        for agent in &mut self.agents {
            agent.start_state();
        }
        self.tick = 0;
    }

    /// Advances every living agent one tick.
    pub fn step(&mut self) -> Result<()> {
        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            agent.tick()?;
        }
        self.tick += 1;
        Ok(())
    }

    /// Whether every agent has died.
    pub fn is_finished(&self) -> bool {
        self.agents.iter().all(|a| !a.alive)
    }

    /// Ticks played since the start.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// All agents, dead ones included.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Snapshot of the living agents and their shared obstacles.
    pub fn frame(&self) -> Frame {
        let agents: Vec<AgentView> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive)
            .map(|(index, a)| AgentView {
                index,
                x: a.x,
                position: a.position,
                velocity: a.velocity,
                score: a.score,
                alive: a.alive,
            })
            .collect();

        let obstacles = agents
            .first()
            .map(|view| self.agents[view.index].obstacles.items().iter().cloned().collect())
            .unwrap_or_default();

        Frame {
            tick: self.tick,
            agents,
            obstacles,
        }
    }
}
