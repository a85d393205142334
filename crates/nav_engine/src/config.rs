use serde::{Deserialize, Serialize};

use crate::pathfinding::DiagonalPolicy;
use crate::region::{DEFAULT_RING_SAMPLES, DEFAULT_RING_STEP};

pub const DEFAULT_CELL_SIZE: f32 = 32.0;
pub const DEFAULT_NEAREST_WALKABLE_SEARCH_RADIUS: f32 = 128.0;

pub const DEFAULT_MOVE_SPEED: f32 = 150.0;
pub const DEFAULT_ARRIVAL_THRESHOLD: f32 = 2.0;
/// Smallest step taken per tick while moving, so tiny `dt` or very low speeds
/// still make visible progress.
pub const DEFAULT_MIN_STEP: f32 = 2.0;
/// Rejections closer than this to the recorded position count as "the same spot".
pub const DEFAULT_STUCK_RADIUS: f32 = 1.0;
/// Consecutive same-spot rejections tolerated before movement is aborted.
pub const DEFAULT_STUCK_MAX_REJECTIONS: u32 = 3;

/// Scene-level navigation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub cell_size: f32,
    pub nearest_walkable_search_radius: f32,
    pub nearest_walkable_ring_samples: u32,
    pub nearest_walkable_ring_step: f32,
    pub diagonal_policy: DiagonalPolicy,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            nearest_walkable_search_radius: DEFAULT_NEAREST_WALKABLE_SEARCH_RADIUS,
            nearest_walkable_ring_samples: DEFAULT_RING_SAMPLES,
            nearest_walkable_ring_step: DEFAULT_RING_STEP,
            diagonal_policy: DiagonalPolicy::default(),
        }
    }
}

/// Per-agent movement tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub speed: f32,
    pub arrival_threshold: f32,
    pub min_step: f32,
    pub stuck_radius: f32,
    pub stuck_max_rejections: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_MOVE_SPEED,
            arrival_threshold: DEFAULT_ARRIVAL_THRESHOLD,
            min_step: DEFAULT_MIN_STEP,
            stuck_radius: DEFAULT_STUCK_RADIUS,
            stuck_max_rejections: DEFAULT_STUCK_MAX_REJECTIONS,
        }
    }
}
