//! Game constants and simulation parameters.
//!
//! All lengths are fractions of the screen: x runs left to right, y runs top to
//! bottom, so gravity is positive and an upward impulse is negative.

use serde::{Deserialize, Serialize};

/// Fixed horizontal position of every agent.
pub const AGENT_X: f32 = 0.25;
/// Agent collision radius.
pub const AGENT_RADIUS: f32 = 0.02;
/// Height an agent starts each run at.
pub const START_HEIGHT: f32 = 0.5;
/// Downward acceleration applied every tick without an impulse.
pub const GRAVITY: f32 = 0.0005;
/// Velocity an impulse sets, replacing gravity for that tick.
pub const IMPULSE_VELOCITY: f32 = -0.01;
/// Velocity magnitude cap, also used to normalise the observed velocity.
pub const MAX_VELOCITY: f32 = 0.02;
/// Top of the playable band.
pub const CEILING: f32 = 0.0;
/// Bottom of the playable band.
pub const FLOOR: f32 = 1.0;

/// Obstacle width.
pub const OBSTACLE_WIDTH: f32 = 0.15;
/// Vertical size of the gap in each obstacle.
pub const GAP: f32 = 0.25;
/// Minimum solid height above and below the gap.
pub const MIN_EDGE: f32 = 0.1;
/// Largest gap top that still keeps the whole gap on screen.
pub const MAX_GAP_TOP: f32 = FLOOR - MIN_EDGE - GAP;
/// Distance every obstacle scrolls left per tick.
pub const SCROLL_SPEED: f32 = 0.005;
/// Spacing between consecutive obstacles.
pub const INTERVAL: f32 = 0.6;
/// Position of the first obstacle after a reset.
pub const START_POSITION: f32 = 1.0;
/// A new obstacle is appended once the trailing one scrolls below this.
pub const SPAWN_THRESHOLD: f32 = 1.0;

/// Length of the observation vector every genome consumes.
pub const OBSERVATION_WIDTH: usize = 4;

/// Per-run simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Score at which a simulation stops early, and the run ends.
    pub goal_score: u32,
    /// Seed for obstacle generation. `None` draws a fresh stream per run.
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            goal_score: 2000,
            seed: None,
        }
    }
}
