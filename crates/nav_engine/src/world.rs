use std::cell::OnceCell;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::NavConfig;
use crate::geometry::Vec2;
use crate::grid::NavigationGrid;
use crate::pathfinding;
use crate::region::{PolygonRegion, WalkableAreaModel};

/// Spacing of the samples taken by [`NavigationQuery::is_segment_walkable`].
pub const SEGMENT_SAMPLE_SPACING: f32 = 4.0;

/// Scene-level queries the movement layer depends on.
///
/// Controllers receive the world explicitly on every call, which keeps them
/// testable against stub worlds.
pub trait NavigationQuery {
    fn find_path(&self, from: Vec2, to: Vec2) -> Option<Vec<Vec2>>;

    fn is_walkable(&self, point: Vec2) -> bool;

    fn find_nearest_walkable_point(&self, point: Vec2) -> Vec2;

    /// Changes whenever geometry used for path search changes. Paths computed
    /// under an older revision should be recomputed.
    fn revision(&self) -> u64 {
        0
    }

    /// Samples the segment at [`SEGMENT_SAMPLE_SPACING`] and checks every sample.
    fn is_segment_walkable(&self, from: Vec2, to: Vec2) -> bool {
        let length = from.distance(to);
        let steps = (length / SEGMENT_SAMPLE_SPACING).ceil().max(1.0) as u32;
        (0..=steps).all(|step| {
            let t = step as f32 / steps as f32;
            self.is_walkable(from.lerp(to, t))
        })
    }
}

/// Physical size of an agent as authored by the scene layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentFootprint {
    pub width: f32,
    pub height: f32,
    #[serde(default = "default_footprint_scale")]
    pub scale: f32,
}

fn default_footprint_scale() -> f32 {
    1.0
}

impl AgentFootprint {
    /// Half of the smaller scaled dimension.
    pub fn clearance_radius(&self) -> f32 {
        (self.width.min(self.height) * self.scale / 2.0).max(0.0)
    }
}

/// Walkable geometry of one scene plus its lazily built navigation grid.
///
/// The grid is built on the first path request and discarded whenever the
/// regions, the agent radius, or the navigation config change.
#[derive(Debug)]
pub struct NavWorld {
    area: WalkableAreaModel,
    world_width: f32,
    world_height: f32,
    config: NavConfig,
    agent_radius: f32,
    grid: OnceCell<NavigationGrid>,
    revision: u64,
}

impl NavWorld {
    pub fn new(
        area: WalkableAreaModel,
        world_width: f32,
        world_height: f32,
        config: NavConfig,
    ) -> Self {
        Self {
            area,
            world_width,
            world_height,
            config,
            agent_radius: 0.0,
            grid: OnceCell::new(),
            revision: 0,
        }
    }

    pub fn area(&self) -> &WalkableAreaModel {
        &self.area
    }

    pub fn world_size(&self) -> (f32, f32) {
        (self.world_width, self.world_height)
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn agent_radius(&self) -> f32 {
        self.agent_radius
    }

    pub fn set_config(&mut self, config: NavConfig) {
        if self.config != config {
            self.config = config;
            self.invalidate_grid("config_changed");
        }
    }

    pub fn set_agent_radius(&mut self, radius: f32) {
        let radius = radius.max(0.0);
        if self.agent_radius != radius {
            self.agent_radius = radius;
            self.invalidate_grid("agent_radius_changed");
        }
    }

    pub fn set_agent_footprint(&mut self, footprint: &AgentFootprint) {
        self.set_agent_radius(footprint.clearance_radius());
    }

    pub fn add_region(&mut self, region: PolygonRegion) {
        self.area.add_region(region);
        self.invalidate_grid("region_added");
    }

    pub fn remove_region(&mut self, id: &str) -> bool {
        let removed = self.area.remove_region(id);
        if removed {
            self.invalidate_grid("region_removed");
        }
        removed
    }

    pub fn set_regions(&mut self, regions: Vec<PolygonRegion>) {
        self.area.set_regions(regions);
        self.invalidate_grid("regions_replaced");
    }

    /// Grid for the current geometry and radius, built on first use.
    pub fn grid(&self) -> &NavigationGrid {
        self.grid.get_or_init(|| {
            let grid = NavigationGrid::build(
                &self.area,
                self.world_width,
                self.world_height,
                self.config.cell_size,
                self.agent_radius,
            );
            info!(
                width = grid.width(),
                height = grid.height(),
                walkable_cells = grid.walkable_cell_count(),
                agent_radius = self.agent_radius,
                revision = self.revision,
                "nav_grid_built"
            );
            grid
        })
    }

    pub fn is_grid_built(&self) -> bool {
        self.grid.get().is_some()
    }

    fn invalidate_grid(&mut self, reason: &'static str) {
        self.grid = OnceCell::new();
        self.revision = self.revision.wrapping_add(1);
        debug!(reason, revision = self.revision, "nav_grid_invalidated");
    }
}

impl NavigationQuery for NavWorld {
    /// Unwalkable goals are first moved to the nearest walkable point.
    fn find_path(&self, from: Vec2, to: Vec2) -> Option<Vec<Vec2>> {
        let goal = self.find_nearest_walkable_point(to);
        let policy = self.config.diagonal_policy;
        let path = pathfinding::find_path_with_policy(self.grid(), from, goal, policy);
        match &path {
            Some(waypoints) => debug!(
                ?from,
                ?goal,
                waypoint_count = waypoints.len(),
                "path_found"
            ),
            None => debug!(?from, ?goal, "path_not_found"),
        }
        path
    }

    fn is_walkable(&self, point: Vec2) -> bool {
        self.area.is_point_walkable(point)
    }

    fn find_nearest_walkable_point(&self, point: Vec2) -> Vec2 {
        self.area.find_nearest_walkable_point_with(
            point,
            self.config.nearest_walkable_search_radius,
            self.config.nearest_walkable_ring_step,
            self.config.nearest_walkable_ring_samples,
        )
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: &str, walkable: bool, min: (f32, f32), max: (f32, f32)) -> PolygonRegion {
        PolygonRegion::new(
            id,
            walkable,
            vec![
                Vec2::new(min.0, min.1),
                Vec2::new(max.0, min.1),
                Vec2::new(max.0, max.1),
                Vec2::new(min.0, max.1),
            ],
        )
    }

    fn room_world() -> NavWorld {
        let area = WalkableAreaModel::new(vec![rect("floor", true, (0.0, 0.0), (320.0, 320.0))]);
        NavWorld::new(area, 320.0, 320.0, NavConfig::default())
    }

    #[test]
    fn footprint_radius_is_half_the_smaller_scaled_side() {
        let footprint = AgentFootprint {
            width: 40.0,
            height: 90.0,
            scale: 0.5,
        };
        assert_eq!(footprint.clearance_radius(), 10.0);
    }

    #[test]
    fn grid_is_built_lazily_and_rebuilt_on_geometry_change() {
        let mut world = room_world();
        assert!(!world.is_grid_built());
        assert!(world.find_path(Vec2::new(16.0, 16.0), Vec2::new(304.0, 16.0)).is_some());
        assert!(world.is_grid_built());
        let revision = world.revision();

        world.add_region(rect("wall", false, (128.0, 0.0), (160.0, 320.0)));
        assert!(!world.is_grid_built());
        assert_ne!(world.revision(), revision);
        assert!(!world.grid().is_walkable(4, 5));
        assert_eq!(
            world.find_path(Vec2::new(16.0, 16.0), Vec2::new(304.0, 16.0)),
            None
        );
    }

    #[test]
    fn unchanged_radius_keeps_the_grid() {
        let mut world = room_world();
        world.set_agent_radius(8.0);
        let _ = world.grid();
        let revision = world.revision();
        world.set_agent_footprint(&AgentFootprint {
            width: 16.0,
            height: 32.0,
            scale: 1.0,
        });
        assert!(world.is_grid_built());
        assert_eq!(world.revision(), revision);
    }

    #[test]
    fn unwalkable_goal_is_snapped_before_search() {
        let mut world = room_world();
        world.add_region(rect("crate", false, (150.0, 150.0), (170.0, 170.0)));
        let goal = Vec2::new(160.0, 160.0);
        let path = world
            .find_path(Vec2::new(16.0, 16.0), goal)
            .expect("path to snapped goal");
        let end = *path.last().expect("end");
        assert_ne!(end, goal);
        assert!(world.is_walkable(end));
    }

    #[test]
    fn segment_walkability_detects_walls() {
        let mut world = room_world();
        world.add_region(rect("wall", false, (100.0, 0.0), (110.0, 320.0)));
        assert!(world.is_segment_walkable(Vec2::new(10.0, 10.0), Vec2::new(90.0, 200.0)));
        assert!(!world.is_segment_walkable(Vec2::new(10.0, 10.0), Vec2::new(200.0, 10.0)));
    }
}
