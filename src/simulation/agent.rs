//! Agent physics, observation and decision making.
//!
//! An agent is a falling disc at a fixed horizontal position. Each tick it
//! looks at the nearest obstacle it has not yet passed, asks its genome for an
//! action and moves.

use std::sync::Arc;

use ndarray::{Array1, array};

use crate::error::{EvolutionError, Result};

use super::genome::Genome;
use super::obstacles::Obstacles;
use super::params::{
    AGENT_RADIUS, AGENT_X, CEILING, FLOOR, GRAVITY, IMPULSE_VELOCITY, MAX_VELOCITY,
    OBSERVATION_WIDTH, START_HEIGHT,
};

/// Discrete action chosen each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Let gravity act.
    Idle,
    /// Set velocity to the upward impulse.
    Flap,
}

impl Action {
    /// Rounds a network output to the nearer of the two actions.
    pub fn from_output(value: f32) -> Self {
        if value >= 0.5 {
            Action::Flap
        } else {
            Action::Idle
        }
    }
}

/// A player controlled by a shared, read-only genome.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position of the centre.
    pub position: f32,
    /// Vertical velocity, positive downward.
    pub velocity: f32,
    /// Obstacles passed this run.
    pub score: u32,
    /// Cleared on collision or leaving the playable band.
    pub alive: bool,
    /// This agent's private obstacle queue.
    pub obstacles: Obstacles,
    genome: Arc<Genome>,
    vision: Array1<f32>,
}

impl Agent {
    /// Creates an agent in its start state.
    pub fn new(genome: Arc<Genome>, seed: Option<u64>) -> Self {
        let mut agent = Self {
            x: AGENT_X,
            position: START_HEIGHT,
            velocity: 0.0,
            score: 0,
            alive: true,
            obstacles: Obstacles::new(seed),
            genome,
            vision: Array1::zeros(OBSERVATION_WIDTH),
        };
        agent.start_state();
        agent
    }

    /// Genome driving this agent.
    pub fn genome(&self) -> &Arc<Genome> {
        &self.genome
    }

    /// Last observation computed by [`Agent::look`].
    pub fn vision(&self) -> &Array1<f32> {
        &self.vision
    }

    /// Resets physics and score and restarts the obstacle queue.
    pub fn start_state(&mut self) {
        self.x = AGENT_X;
        self.position = START_HEIGHT;
        self.velocity = 0.0;
        self.score = 0;
        self.alive = true;
        self.obstacles.start_state();
        self.look();
    }

    /// Updates the observation.
    ///
    /// Sees: horizontal distance to the next obstacle, own velocity scaled by
    /// [`MAX_VELOCITY`], clearance below the gap's top edge and clearance
    /// above the gap's bottom edge (both clamped at zero).
    pub fn look(&mut self) -> &Array1<f32> {
        let velocity = self.velocity / MAX_VELOCITY;
        self.vision = match self.obstacles.next_unpassed() {
            Some(next) => array![
                next.position - self.x,
                velocity,
                (self.position - next.gap_top).max(0.0),
                (next.gap_bottom() - self.position).max(0.0),
            ],
            None => array![1.0, velocity, 0.0, 0.0],
        };
        &self.vision
    }

    /// Feeds the current observation to the genome.
    pub fn think(&self) -> Result<Action> {
        let output = self.genome.propagate(&self.vision)?;
        let first = output.first().copied().ok_or(EvolutionError::Shape {
            expected: 1,
            actual: 0,
        })?;
        Ok(Action::from_output(first))
    }

    /// Advances physics and the obstacle queue by one tick.
    ///
    /// Dead agents do not move.
    pub fn act(&mut self, action: Action) {
        if !self.alive {
            return;
        }

        self.velocity = match action {
            Action::Flap => IMPULSE_VELOCITY,
            Action::Idle => (self.velocity + GRAVITY).min(MAX_VELOCITY),
        };
        self.position += self.velocity;

        self.obstacles.update();

        let back_edge = self.x - AGENT_RADIUS;
        for obstacle in self.obstacles.items_mut() {
            if !obstacle.passed && obstacle.trailing_edge() < back_edge {
                obstacle.passed = true;
                self.score += 1;
            }
        }

        if self.out_of_bounds() || self.hits_obstacle() {
            self.alive = false;
        }
    }

    /// One look, think, act cycle.
    pub fn tick(&mut self) -> Result<()> {
        self.look();
        let action = self.think()?;
        self.act(action);
        Ok(())
    }

    fn out_of_bounds(&self) -> bool {
        self.position - AGENT_RADIUS <= CEILING || self.position + AGENT_RADIUS >= FLOOR
    }

    fn hits_obstacle(&self) -> bool {
        self.obstacles
            .items()
            .iter()
            .any(|o| o.collides(self.x, self.position, AGENT_RADIUS))
    }
}
