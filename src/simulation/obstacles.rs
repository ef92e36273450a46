//! Scrolling gapped obstacles and the per-agent queue that generates them.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::params::{
    GAP, INTERVAL, MAX_GAP_TOP, MIN_EDGE, OBSTACLE_WIDTH, SCROLL_SPEED, SPAWN_THRESHOLD,
    START_POSITION,
};

/// A vertical barrier with a single gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Horizontal centre.
    pub position: f32,
    /// Height where the gap starts (bottom of the upper solid part).
    pub gap_top: f32,
    /// Whether the owning agent has already scored this obstacle.
    pub passed: bool,
}

impl Obstacle {
    /// Creates an obstacle at `position` whose gap starts at `gap_top`.
    pub fn new(position: f32, gap_top: f32) -> Self {
        Self {
            position,
            gap_top,
            passed: false,
        }
    }

    /// Height where the gap ends (top of the lower solid part).
    pub fn gap_bottom(&self) -> f32 {
        self.gap_top + GAP
    }

    /// Right edge, the last part of the obstacle to reach an agent.
    pub fn trailing_edge(&self) -> f32 {
        self.position + OBSTACLE_WIDTH / 2.0
    }

    /// Whether the obstacle has fully left the screen.
    pub fn is_off_screen(&self) -> bool {
        self.position < -OBSTACLE_WIDTH / 2.0
    }

    /// Whether a circle at horizontal `x` with `radius` overlaps the obstacle's columns.
    pub fn overlaps(&self, x: f32, radius: f32) -> bool {
        (x - self.position).abs() < radius + OBSTACLE_WIDTH / 2.0
    }

    /// Whether a circle at (`x`, `y`) hits the solid part.
    pub fn collides(&self, x: f32, y: f32, radius: f32) -> bool {
        self.overlaps(x, radius) && !(self.gap_top < y && y < self.gap_bottom())
    }

    fn scroll(&mut self) {
        self.position -= SCROLL_SPEED;
    }
}

/// Ordered queue of obstacles owned by a single agent.
///
/// Positions are strictly increasing front to back. A seeded queue replays the
/// same gap heights after every [`Obstacles::start_state`].
#[derive(Debug, Clone)]
pub struct Obstacles {
    items: VecDeque<Obstacle>,
    seed: Option<u64>,
    rng: StdRng,
}

impl Obstacles {
    /// Creates an empty queue; call [`Obstacles::start_state`] before use.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            items: VecDeque::new(),
            seed,
            rng: make_rng(seed),
        }
    }

    /// Seed the queue was created with, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Current obstacles, leading one first.
    pub fn items(&self) -> &VecDeque<Obstacle> {
        &self.items
    }

    /// Mutable access for scoring.
    pub fn items_mut(&mut self) -> &mut VecDeque<Obstacle> {
        &mut self.items
    }

    /// Clears the queue and places the first obstacle.
    pub fn start_state(&mut self) {
        self.rng = make_rng(self.seed);
        self.items.clear();
        let gap_top = self.random_gap_top();
        self.items.push_back(Obstacle::new(START_POSITION, gap_top));
    }

    /// Scrolls every obstacle one tick, spawning and dropping at the ends.
    pub fn update(&mut self) {
        for obstacle in &mut self.items {
            obstacle.scroll();
        }

        let trailing = self.items.back().map(|o| o.position);
        if let Some(last) = trailing.filter(|&p| p < SPAWN_THRESHOLD) {
            let gap_top = self.random_gap_top();
            self.items.push_back(Obstacle::new(last + INTERVAL, gap_top));
        }

        if self.items.front().is_some_and(Obstacle::is_off_screen) {
            self.items.pop_front();
        }
    }

    /// First obstacle the agent has not yet passed.
    pub fn next_unpassed(&self) -> Option<&Obstacle> {
        self.items.iter().find(|o| !o.passed)
    }

    /// Gap heights are rounded to two decimals.
    fn random_gap_top(&mut self) -> f32 {
        let raw = self.rng.random_range(MIN_EDGE..=MAX_GAP_TOP);
        (raw * 100.0).round() / 100.0
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
