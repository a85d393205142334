use tracing::{debug, warn};

use crate::geometry::Vec2;
use crate::region::WalkableAreaModel;

/// Offset of the inflation samples from the cell center, as a fraction of the
/// agent radius along each axis. The four samples sit on the diagonals, so
/// `0.7` places them close to the clearance circle.
pub const INFLATION_SAMPLE_FACTOR: f32 = 0.7;
/// Walkable samples (out of five, center included) a cell needs. The center
/// sample must always be one of them. A sample outside the model's bounding
/// box counts as blocked in this vote, so an edge cell with one or two samples
/// past the boundary can stay walkable; a cell whose center is outside is
/// always blocked.
pub const INFLATION_MIN_WALKABLE_SAMPLES: usize = 3;
/// Largest grid `build` will allocate. Larger requests yield an empty grid.
pub const MAX_GRID_CELLS: u64 = 4_000_000;

const INFLATION_OFFSETS: [(f32, f32); 4] = [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)];

/// Integer cell coordinate. Signed so that neighbor arithmetic can step off
/// the grid edge and be rejected by bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Uniform walkable/blocked raster of a [`WalkableAreaModel`], inflated by an
/// agent radius.
///
/// Cell convention:
/// - cell `(0, 0)` starts at world origin;
/// - the center of cell `(gx, gy)` is `(gx * cell_size + cell_size / 2, ...)`.
///
/// A grid is immutable once built. Geometry or radius changes produce a new grid.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationGrid {
    width: u32,
    height: u32,
    cell_size: f32,
    agent_radius: f32,
    walkable: Vec<bool>,
}

impl NavigationGrid {
    pub fn build(
        model: &WalkableAreaModel,
        world_width: f32,
        world_height: f32,
        cell_size: f32,
        agent_radius: f32,
    ) -> Self {
        let agent_radius = if agent_radius.is_finite() {
            agent_radius.max(0.0)
        } else {
            0.0
        };
        let valid_dimensions = cell_size.is_finite()
            && cell_size > 0.0
            && world_width.is_finite()
            && world_height.is_finite()
            && world_width > 0.0
            && world_height > 0.0;
        if !valid_dimensions {
            warn!(world_width, world_height, cell_size, "grid_build_degenerate_dimensions");
            return Self::empty(cell_size, agent_radius);
        }

        let cell_count = grid_cell_count(world_width, world_height, cell_size);
        if cell_count > MAX_GRID_CELLS as f64 {
            warn!(cell_count, max_cells = MAX_GRID_CELLS, "grid_build_too_many_cells");
            return Self::empty(cell_size, agent_radius);
        }

        let width = (world_width / cell_size).ceil() as u32;
        let height = (world_height / cell_size).ceil() as u32;
        let mut grid = Self {
            width,
            height,
            cell_size,
            agent_radius,
            walkable: Vec::with_capacity(width as usize * height as usize),
        };

        for gy in 0..height as i32 {
            for gx in 0..width as i32 {
                let center = grid.grid_to_world(gx, gy);
                let walkable = cell_is_walkable(model, center, agent_radius);
                grid.walkable.push(walkable);
            }
        }

        debug!(
            width,
            height,
            cell_size,
            agent_radius,
            walkable_cells = grid.walkable_cell_count(),
            "grid_built"
        );
        grid
    }

    fn empty(cell_size: f32, agent_radius: f32) -> Self {
        Self {
            width: 0,
            height: 0,
            cell_size: if cell_size.is_finite() && cell_size > 0.0 {
                cell_size
            } else {
                0.0
            },
            agent_radius,
            walkable: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn agent_radius(&self) -> f32 {
        self.agent_radius
    }

    pub fn is_empty(&self) -> bool {
        self.walkable.is_empty()
    }

    pub fn walkable_cell_count(&self) -> usize {
        self.walkable.iter().filter(|walkable| **walkable).count()
    }

    pub fn in_bounds(&self, gx: i32, gy: i32) -> bool {
        gx >= 0 && gy >= 0 && (gx as u32) < self.width && (gy as u32) < self.height
    }

    pub(crate) fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if !self.in_bounds(coord.x, coord.y) {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub(crate) fn coord_of(&self, index: usize) -> GridCoord {
        let width = self.width as usize;
        GridCoord {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
    }

    /// Out-of-range coordinates are blocked.
    pub fn is_walkable(&self, gx: i32, gy: i32) -> bool {
        self.index_of(GridCoord::new(gx, gy))
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Truncating division by the cell size. The result may lie outside the
    /// grid; check with [`NavigationGrid::in_bounds`].
    pub fn world_to_grid(&self, x: f32, y: f32) -> GridCoord {
        if self.cell_size <= 0.0 {
            return GridCoord::new(-1, -1);
        }
        GridCoord {
            x: (x / self.cell_size) as i32,
            y: (y / self.cell_size) as i32,
        }
    }

    /// World position of the center of cell `(gx, gy)`.
    pub fn grid_to_world(&self, gx: i32, gy: i32) -> Vec2 {
        let half = self.cell_size / 2.0;
        Vec2 {
            x: gx as f32 * self.cell_size + half,
            y: gy as f32 * self.cell_size + half,
        }
    }

    /// Whether `point` lies within the world rectangle the grid covers.
    pub fn contains_world(&self, point: Vec2) -> bool {
        let max_x = self.width as f32 * self.cell_size;
        let max_y = self.height as f32 * self.cell_size;
        point.x >= 0.0 && point.y >= 0.0 && point.x < max_x && point.y < max_y
    }
}

/// Cells a grid over the given world would hold, before any allocation.
pub fn grid_cell_count(world_width: f32, world_height: f32, cell_size: f32) -> f64 {
    let columns = (f64::from(world_width) / f64::from(cell_size)).ceil();
    let rows = (f64::from(world_height) / f64::from(cell_size)).ceil();
    columns * rows
}

fn cell_is_walkable(model: &WalkableAreaModel, center: Vec2, agent_radius: f32) -> bool {
    if !model.is_point_walkable(center) {
        return false;
    }
    if agent_radius <= 0.0 {
        return true;
    }

    let reach = agent_radius * INFLATION_SAMPLE_FACTOR;
    let walkable_offsets = INFLATION_OFFSETS
        .iter()
        .filter(|(dx, dy)| {
            model.is_point_walkable(Vec2 {
                x: center.x + dx * reach,
                y: center.y + dy * reach,
            })
        })
        .count();
    1 + walkable_offsets >= INFLATION_MIN_WALKABLE_SAMPLES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PolygonRegion;

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
    fn full_walkable_region_with_zero_radius_marks_every_cell() {
        let model = WalkableAreaModel::new(vec![rect("floor", true, (0.0, 0.0), (320.0, 320.0))]);
        let grid = NavigationGrid::build(&model, 320.0, 320.0, 32.0, 0.0);
        assert_eq!((grid.width(), grid.height()), (10, 10));
        assert_eq!(grid.walkable_cell_count(), 100);
    }

    #[test]
    fn cell_center_round_trip_is_exact() {
        let grid = NavigationGrid::build(&WalkableAreaModel::default(), 200.0, 96.0, 16.0, 0.0);
        for gy in 0..grid.height() as i32 {
            for gx in 0..grid.width() as i32 {
                let center = grid.grid_to_world(gx, gy);
                assert_eq!(grid.world_to_grid(center.x, center.y), GridCoord::new(gx, gy));
            }
        }
    }

    #[test]
    fn world_to_grid_truncates() {
        let grid = NavigationGrid::build(&WalkableAreaModel::default(), 320.0, 320.0, 32.0, 0.0);
        assert_eq!(grid.world_to_grid(31.99, 32.0), GridCoord::new(0, 1));
        assert_eq!(grid.grid_to_world(2, 3), Vec2::new(80.0, 112.0));
    }

    #[test]
    fn out_of_range_cells_are_blocked() {
        let grid = NavigationGrid::build(&WalkableAreaModel::default(), 64.0, 64.0, 32.0, 0.0);
        assert!(grid.is_walkable(1, 1));
        assert!(!grid.is_walkable(-1, 0));
        assert!(!grid.is_walkable(2, 0));
    }

    #[test]
    fn degenerate_dimensions_yield_empty_grid() {
        let model = WalkableAreaModel::default();
        for (w, h, cell) in [(0.0, 100.0, 32.0), (100.0, 100.0, 0.0), (100.0, -5.0, 8.0)] {
            let grid = NavigationGrid::build(&model, w, h, cell, 0.0);
            assert!(grid.is_empty());
            assert_eq!((grid.width(), grid.height()), (0, 0));
            assert!(!grid.is_walkable(0, 0));
        }
    }

    #[test]
    fn oversized_grid_is_refused_without_allocating() {
        let model = WalkableAreaModel::default();
        assert_eq!(grid_cell_count(320.0, 96.0, 32.0), 30.0);

        let grid = NavigationGrid::build(&model, 1.0e6, 1.0e6, 0.5, 0.0);
        assert!(grid.is_empty());
        assert_eq!((grid.width(), grid.height()), (0, 0));

        let at_limit = NavigationGrid::build(&model, 2000.0, 2000.0, 1.0, 0.0);
        assert_eq!(at_limit.walkable_cell_count() as u64, MAX_GRID_CELLS);
    }

    #[test]
    fn radius_inflation_blocks_corner_cells() {
        let model = WalkableAreaModel::new(vec![rect("strip", true, (0.0, 0.0), (320.0, 96.0))]);
        let lean = NavigationGrid::build(&model, 320.0, 96.0, 32.0, 0.0);
        let inflated = NavigationGrid::build(&model, 320.0, 96.0, 32.0, 40.0);

        assert!(lean.is_walkable(0, 0));
        assert!(lean.is_walkable(0, 2));
        // Corner cells keep only the center and one diagonal sample.
        assert!(!inflated.is_walkable(0, 0));
        assert!(!inflated.is_walkable(0, 2));
        assert!(!inflated.is_walkable(9, 0));
        // Edge cells keep three of five samples and stay walkable.
        assert!(inflated.is_walkable(5, 0));
        assert!(inflated.is_walkable(5, 1));
    }

    #[test]
    fn inflation_is_lenient_with_one_blocked_sample() {
        let model = WalkableAreaModel::new(vec![
            rect("floor", true, (0.0, 0.0), (320.0, 320.0)),
            rect("post", false, (60.0, 60.0), (70.0, 70.0)),
        ]);
        // Cell (1,1) center is (48,48); with radius 20 the (+,+) sample lands
        // at (62,62) inside the post while the other three stay clear.
        let grid = NavigationGrid::build(&model, 320.0, 320.0, 32.0, 20.0);
        assert!(grid.is_walkable(1, 1));
    }

    #[test]
    fn cells_outside_region_bounds_are_blocked() {
        let model = WalkableAreaModel::new(vec![rect("room", true, (0.0, 0.0), (160.0, 160.0))]);
        let grid = NavigationGrid::build(&model, 320.0, 320.0, 32.0, 0.0);
        assert!(grid.is_walkable(4, 4));
        assert!(!grid.is_walkable(5, 5));
        assert!(!grid.is_walkable(9, 0));
    }
}
