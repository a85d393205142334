use std::f32::consts::TAU;

use crate::geometry::{Aabb, Vec2};

/// Angular samples per ring when searching for the nearest walkable point.
pub const DEFAULT_RING_SAMPLES: u32 = 16;
/// Radial spacing between search rings, in world units.
pub const DEFAULT_RING_STEP: f32 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRegion {
    id: String,
    walkable: bool,
    vertices: Vec<Vec2>,
    bounds: Option<Aabb>,
}

impl PolygonRegion {
    pub fn new(id: impl Into<String>, walkable: bool, vertices: Vec<Vec2>) -> Self {
        let bounds = Aabb::from_points(vertices.iter());
        Self {
            id: id.into(),
            walkable,
            vertices,
            bounds,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Even-odd containment test. Polygons with fewer than three vertices
    /// contain nothing.
    pub fn contains(&self, point: Vec2) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        match self.bounds {
            Some(bounds) if bounds.contains(point) => {}
            _ => return false,
        }

        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            let crosses = (vi.y > point.y) != (vj.y > point.y)
                && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
            if crosses {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Ordered set of authored regions plus the union of their bounds.
///
/// All mutation goes through methods that recompute the cached bounds, so the
/// cache always matches the region list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkableAreaModel {
    regions: Vec<PolygonRegion>,
    bounds: Option<Aabb>,
}

impl WalkableAreaModel {
    pub fn new(regions: Vec<PolygonRegion>) -> Self {
        let mut model = Self {
            regions,
            bounds: None,
        };
        model.recompute_bounds();
        model
    }

    pub fn regions(&self) -> &[PolygonRegion] {
        &self.regions
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn add_region(&mut self, region: PolygonRegion) {
        self.regions.push(region);
        self.recompute_bounds();
    }

    /// Removes every region with `id`. Returns whether anything was removed.
    pub fn remove_region(&mut self, id: &str) -> bool {
        let before = self.regions.len();
        self.regions.retain(|region| region.id() != id);
        let removed = self.regions.len() != before;
        if removed {
            self.recompute_bounds();
        }
        removed
    }

    pub fn set_regions(&mut self, regions: Vec<PolygonRegion>) {
        self.regions = regions;
        self.recompute_bounds();
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.bounds = None;
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self
            .regions
            .iter()
            .filter_map(PolygonRegion::bounds)
            .reduce(Aabb::union);
    }

    /// Blocking regions win over any overlapping walkable region. With no
    /// regions at all every point is walkable.
    pub fn is_point_walkable(&self, point: Vec2) -> bool {
        if self.regions.is_empty() {
            return true;
        }
        match self.bounds {
            Some(bounds) if bounds.contains(point) => {}
            _ => return false,
        }

        let mut inside_walkable = false;
        for region in &self.regions {
            if !region.contains(point) {
                continue;
            }
            if !region.is_walkable() {
                return false;
            }
            inside_walkable = true;
        }
        inside_walkable
    }

    pub fn find_nearest_walkable_point(&self, target: Vec2, max_radius: f32) -> Vec2 {
        self.find_nearest_walkable_point_with(
            target,
            max_radius,
            DEFAULT_RING_STEP,
            DEFAULT_RING_SAMPLES,
        )
    }

    /// Searches concentric rings around `target` and returns the first walkable
    /// sample in increasing radius order. Falls back to `target` itself when
    /// nothing walkable lies within `max_radius`.
    pub fn find_nearest_walkable_point_with(
        &self,
        target: Vec2,
        max_radius: f32,
        ring_step: f32,
        ring_samples: u32,
    ) -> Vec2 {
        if self.is_point_walkable(target) {
            return target;
        }
        if ring_step <= 0.0 || ring_samples == 0 || max_radius <= 0.0 {
            return target;
        }

        let mut radius = ring_step.min(max_radius);
        loop {
            for sample in 0..ring_samples {
                let angle = TAU * sample as f32 / ring_samples as f32;
                let candidate = Vec2 {
                    x: target.x + radius * angle.cos(),
                    y: target.y + radius * angle.sin(),
                };
                if self.is_point_walkable(candidate) {
                    return candidate;
                }
            }
            if radius >= max_radius {
                break;
            }
            radius = (radius + ring_step).min(max_radius);
        }
        target
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

    #[test]
    fn empty_model_is_permissive() {
        let model = WalkableAreaModel::default();
        assert!(model.is_point_walkable(Vec2::new(-500.0, 1.0e6)));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = PolygonRegion::new(
            "line",
            true,
            vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)],
        );
        assert!(!line.contains(Vec2::new(5.0, 5.0)));
        let empty = PolygonRegion::new("empty", true, Vec::new());
        assert!(!empty.contains(Vec2::ZERO));
        assert!(empty.bounds().is_none());
    }

    #[test]
    fn blocking_region_overrides_walkable_overlap() {
        let model = WalkableAreaModel::new(vec![
            rect("floor", true, (0.0, 0.0), (100.0, 100.0)),
            rect("table", false, (40.0, 40.0), (60.0, 60.0)),
        ]);
        assert!(model.is_point_walkable(Vec2::new(10.0, 10.0)));
        assert!(!model.is_point_walkable(Vec2::new(50.0, 50.0)));
        assert!(!model.is_point_walkable(Vec2::new(150.0, 50.0)));
    }

    #[test]
    fn blocking_region_wins_regardless_of_order() {
        let model = WalkableAreaModel::new(vec![
            rect("table", false, (40.0, 40.0), (60.0, 60.0)),
            rect("floor", true, (0.0, 0.0), (100.0, 100.0)),
            rect("rug", true, (30.0, 30.0), (70.0, 70.0)),
        ]);
        assert!(!model.is_point_walkable(Vec2::new(50.0, 50.0)));
        assert!(model.is_point_walkable(Vec2::new(35.0, 35.0)));
    }

    #[test]
    fn only_blocking_regions_means_nothing_walkable() {
        let model = WalkableAreaModel::new(vec![rect("pit", false, (0.0, 0.0), (10.0, 10.0))]);
        assert!(!model.is_point_walkable(Vec2::new(5.0, 5.0)));
        assert!(!model.is_point_walkable(Vec2::new(50.0, 50.0)));
    }

    #[test]
    fn bounds_cache_tracks_every_mutation() {
        let mut model = WalkableAreaModel::default();
        assert!(model.bounds().is_none());

        model.add_region(rect("a", true, (0.0, 0.0), (10.0, 10.0)));
        assert_eq!(model.bounds().expect("bounds").max, Vec2::new(10.0, 10.0));

        model.add_region(rect("b", true, (20.0, -5.0), (30.0, 5.0)));
        let bounds = model.bounds().expect("bounds");
        assert_eq!(bounds.min, Vec2::new(0.0, -5.0));
        assert_eq!(bounds.max, Vec2::new(30.0, 10.0));

        assert!(model.remove_region("b"));
        assert_eq!(model.bounds().expect("bounds").max, Vec2::new(10.0, 10.0));
        assert!(!model.remove_region("missing"));

        model.clear();
        assert!(model.bounds().is_none());
    }

    #[test]
    fn nearest_walkable_point_returns_walkable_target_unchanged() {
        let model = WalkableAreaModel::new(vec![rect("floor", true, (0.0, 0.0), (100.0, 100.0))]);
        let target = Vec2::new(20.0, 30.0);
        assert_eq!(model.find_nearest_walkable_point(target, 64.0), target);
    }

    #[test]
    fn nearest_walkable_point_moves_out_of_obstacle() {
        let model = WalkableAreaModel::new(vec![
            rect("floor", true, (0.0, 0.0), (100.0, 100.0)),
            rect("crate", false, (40.0, 40.0), (60.0, 60.0)),
        ]);
        let target = Vec2::new(50.0, 50.0);
        let snapped = model.find_nearest_walkable_point(target, 64.0);
        assert_ne!(snapped, target);
        assert!(model.is_point_walkable(snapped));
        assert!(snapped.distance(target) <= 16.0 + 1.0e-3);
    }

    #[test]
    fn nearest_walkable_point_gives_up_beyond_radius() {
        let model = WalkableAreaModel::new(vec![rect("floor", true, (0.0, 0.0), (100.0, 100.0))]);
        let target = Vec2::new(500.0, 500.0);
        assert_eq!(model.find_nearest_walkable_point(target, 64.0), target);
    }
}
