use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{MovementConfig, NavConfig};
use crate::geometry::Vec2;
use crate::grid::{grid_cell_count, MAX_GRID_CELLS};
use crate::movement::MovementController;
use crate::region::{PolygonRegion, WalkableAreaModel};
use crate::world::{AgentFootprint, NavWorld};

#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("failed to read scene file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scene json at {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid scene at {field}: {message}")]
    Invalid { field: String, message: String },
}

impl SceneLoadError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn default_walkable() -> bool {
    true
}

fn default_use_pathfinding() -> bool {
    true
}

fn default_scene_name() -> String {
    "untitled".to_string()
}

fn to_vec2(point: [f32; 2]) -> Vec2 {
    Vec2 {
        x: point[0],
        y: point[1],
    }
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDef {
    pub id: String,
    #[serde(default = "default_walkable")]
    pub walkable: bool,
    pub vertices: Vec<[f32; 2]>,
}

impl RegionDef {
    pub fn to_region(&self) -> PolygonRegion {
        PolygonRegion::new(
            self.id.clone(),
            self.walkable,
            self.vertices.iter().copied().map(to_vec2).collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDef {
    pub position: [f32; 2],
    #[serde(default)]
    pub footprint: Option<AgentFootprint>,
    #[serde(default)]
    pub movement: MovementConfig,
}

/// One scripted order for the scene agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveCommandDef {
    MoveTo {
        target: [f32; 2],
        #[serde(default = "default_use_pathfinding")]
        pathfinding: bool,
    },
    FollowPath {
        path: Vec<[f32; 2]>,
    },
}

impl MoveCommandDef {
    pub fn waypoints(&self) -> Vec<Vec2> {
        match self {
            Self::MoveTo { target, .. } => vec![to_vec2(*target)],
            Self::FollowPath { path } => path.iter().copied().map(to_vec2).collect(),
        }
    }
}

/// Authored scene as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDefinition {
    #[serde(default = "default_scene_name")]
    pub name: String,
    pub world_width: f32,
    pub world_height: f32,
    #[serde(default)]
    pub navigation: NavConfig,
    #[serde(default)]
    pub regions: Vec<RegionDef>,
    #[serde(default)]
    pub agent: Option<AgentDef>,
    #[serde(default)]
    pub commands: Vec<MoveCommandDef>,
}

impl SceneDefinition {
    pub fn validate(&self) -> Result<(), SceneLoadError> {
        if !(self.world_width.is_finite() && self.world_width > 0.0) {
            return Err(SceneLoadError::invalid("world_width", "must be a positive number"));
        }
        if !(self.world_height.is_finite() && self.world_height > 0.0) {
            return Err(SceneLoadError::invalid("world_height", "must be a positive number"));
        }
        let cell_size = self.navigation.cell_size;
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SceneLoadError::invalid(
                "navigation.cell_size",
                "must be a positive number",
            ));
        }
        let cell_count = grid_cell_count(self.world_width, self.world_height, cell_size);
        if cell_count > MAX_GRID_CELLS as f64 {
            return Err(SceneLoadError::invalid(
                "navigation.cell_size",
                format!(
                    "grid would hold {cell_count} cells; the maximum is {MAX_GRID_CELLS}"
                ),
            ));
        }

        let mut seen_ids = HashSet::new();
        for (index, region) in self.regions.iter().enumerate() {
            if region.id.trim().is_empty() {
                return Err(SceneLoadError::invalid(
                    format!("regions[{index}].id"),
                    "must not be empty",
                ));
            }
            if !seen_ids.insert(region.id.as_str()) {
                return Err(SceneLoadError::invalid(
                    format!("regions[{index}].id"),
                    format!("duplicate region id '{}'", region.id),
                ));
            }
            if !region.vertices.iter().all(|vertex| all_finite(vertex)) {
                return Err(SceneLoadError::invalid(
                    format!("regions[{index}].vertices"),
                    "vertex coordinates must be finite",
                ));
            }
        }

        if let Some(agent) = &self.agent {
            if !all_finite(&agent.position) {
                return Err(SceneLoadError::invalid(
                    "agent.position",
                    "coordinates must be finite",
                ));
            }
            if !(agent.movement.speed.is_finite() && agent.movement.speed >= 0.0) {
                return Err(SceneLoadError::invalid(
                    "agent.movement.speed",
                    "must be a non-negative number",
                ));
            }
        }

        for (index, command) in self.commands.iter().enumerate() {
            if !command.waypoints().iter().all(|point| point.is_finite()) {
                return Err(SceneLoadError::invalid(
                    format!("commands[{index}]"),
                    "coordinates must be finite",
                ));
            }
        }
        Ok(())
    }

    pub fn build_area(&self) -> WalkableAreaModel {
        WalkableAreaModel::new(self.regions.iter().map(RegionDef::to_region).collect())
    }

    /// Navigation world for this scene, sized for the scene agent's footprint.
    pub fn build_world(&self) -> NavWorld {
        let mut world = NavWorld::new(
            self.build_area(),
            self.world_width,
            self.world_height,
            self.navigation,
        );
        if let Some(footprint) = self.agent.as_ref().and_then(|agent| agent.footprint) {
            world.set_agent_footprint(&footprint);
        }
        world
    }

    pub fn spawn_agent(&self) -> Option<MovementController> {
        self.agent
            .as_ref()
            .map(|agent| MovementController::new(to_vec2(agent.position), agent.movement))
    }
}
