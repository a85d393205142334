//! Navigation and movement core for 2D scenes: walkable polygon regions, an
//! agent-inflated navigation grid, A* path search, and a per-tick movement
//! controller.

pub mod config;
pub mod content;
mod geometry;
mod grid;
mod movement;
mod pathfinding;
mod region;
mod world;

pub use config::{MovementConfig, NavConfig};
pub use content::{
    load_scene_file, parse_scene_json, AgentDef, MoveCommandDef, RegionDef, SceneDefinition,
    SceneLoadError,
};
pub use geometry::{distance_to_line, step_toward, Aabb, Vec2};
pub use grid::{
    grid_cell_count, GridCoord, NavigationGrid, INFLATION_MIN_WALKABLE_SAMPLES,
    INFLATION_SAMPLE_FACTOR, MAX_GRID_CELLS,
};
pub use movement::{CompletionCallback, MovementController, MovementEvent, MovementState};
pub use pathfinding::{
    find_cell_path, find_path, find_path_with_policy, simplify_path, DiagonalPolicy,
    COLLINEAR_TOLERANCE, MIN_WAYPOINT_SPACING, SAME_CELL_EPSILON,
};
pub use region::{PolygonRegion, WalkableAreaModel, DEFAULT_RING_SAMPLES, DEFAULT_RING_STEP};
pub use world::{AgentFootprint, NavWorld, NavigationQuery, SEGMENT_SAMPLE_SPACING};
