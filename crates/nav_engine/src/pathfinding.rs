use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f32::consts::SQRT_2;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{distance_to_line, Vec2};
use crate::grid::{GridCoord, NavigationGrid};

/// Start and goal in the same cell closer than this produce a single-point path.
pub const SAME_CELL_EPSILON: f32 = 1.0;
/// Interior waypoints within this distance of the line through their
/// neighbors are dropped during simplification.
pub const COLLINEAR_TOLERANCE: f32 = 0.5;
/// Consecutive waypoints closer than this are merged.
pub const MIN_WAYPOINT_SPACING: f32 = 2.0;

const CARDINAL_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = SQRT_2;

// Expansion order is part of the tie-break contract: cardinals N, E, S, W,
// then diagonals NE, SE, SW, NW.
const CARDINAL_STEPS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const DIAGONAL_STEPS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// When a diagonal step between two cells is allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagonalPolicy {
    /// Disallowed only when both flanking cardinal cells are blocked.
    #[default]
    BlockWhenBothFlanksBlocked,
    /// Disallowed when either flanking cardinal cell is blocked.
    RequireBothFlanksOpen,
}

impl DiagonalPolicy {
    fn allows(self, flank_a_open: bool, flank_b_open: bool) -> bool {
        match self {
            Self::BlockWhenBothFlanksBlocked => flank_a_open || flank_b_open,
            Self::RequireBothFlanksOpen => flank_a_open && flank_b_open,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    index: usize,
    f_cost: f32,
    h_cost: f32,
    insertion_order: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    /// `BinaryHeap` pops the greatest node, so "better" compares greater:
    /// lower f, then lower h, then the most recently discovered node.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.h_cost.total_cmp(&self.h_cost))
            .then_with(|| self.insertion_order.cmp(&other.insertion_order))
    }
}

/// Octile distance: exact cost of an unobstructed 8-connected walk.
fn octile_distance(a: GridCoord, b: GridCoord) -> f32 {
    let dx = a.x.abs_diff(b.x) as f32;
    let dy = a.y.abs_diff(b.y) as f32;
    let (short, long) = if dx < dy { (dx, dy) } else { (dy, dx) };
    (long - short) * CARDINAL_COST + short * DIAGONAL_COST
}

/// Finds a world-space path from `start` to `goal` over `grid`.
///
/// Returns `None` when either point lies outside the grid, the goal cell is
/// blocked, or no route exists. A start cell that is itself blocked is
/// tolerated so that agents pressed against a wall can still leave it.
pub fn find_path(grid: &NavigationGrid, start: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
    find_path_with_policy(grid, start, goal, DiagonalPolicy::default())
}

pub fn find_path_with_policy(
    grid: &NavigationGrid,
    start: Vec2,
    goal: Vec2,
    policy: DiagonalPolicy,
) -> Option<Vec<Vec2>> {
    if !grid.contains_world(start) || !grid.contains_world(goal) {
        debug!(?start, ?goal, "path_endpoint_outside_grid");
        return None;
    }

    let start_cell = grid.world_to_grid(start.x, start.y);
    let goal_cell = grid.world_to_grid(goal.x, goal.y);
    if start_cell == goal_cell {
        if start.distance(goal) > SAME_CELL_EPSILON {
            return Some(vec![start, goal]);
        }
        return Some(vec![goal]);
    }

    let cells = find_cell_path(grid, start_cell, goal_cell, policy)?;
    let mut points = Vec::with_capacity(cells.len() + 1);
    points.push(start);
    let interior = cells.len().saturating_sub(2);
    for cell in cells.iter().skip(1).take(interior) {
        points.push(grid.grid_to_world(cell.x, cell.y));
    }
    points.push(goal);
    Some(simplify_path(&points))
}

/// A* over 8-connected cells. The returned list starts at `start` and ends at
/// `goal`; every cell after the first is walkable.
pub fn find_cell_path(
    grid: &NavigationGrid,
    start: GridCoord,
    goal: GridCoord,
    policy: DiagonalPolicy,
) -> Option<Vec<GridCoord>> {
    let start_index = grid.index_of(start)?;
    let goal_index = grid.index_of(goal)?;
    if !grid.is_walkable(goal.x, goal.y) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let node_count = grid.width() as usize * grid.height() as usize;
    let mut closed = vec![false; node_count];
    let mut best_g = vec![f32::INFINITY; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut open = BinaryHeap::new();
    let mut next_insertion = 0u64;
    let mut expanded = 0usize;

    let start_h = octile_distance(start, goal);
    best_g[start_index] = 0.0;
    open.push(OpenNode {
        index: start_index,
        f_cost: start_h,
        h_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion += 1;

    while let Some(current) = open.pop() {
        if closed[current.index] {
            continue;
        }
        closed[current.index] = true;
        expanded += 1;

        if current.index == goal_index {
            debug!(expanded, "astar_goal_reached");
            return reconstruct_cell_path(grid, &parent, start_index, goal_index);
        }

        let coord = grid.coord_of(current.index);
        let current_g = best_g[current.index];
        for (neighbor, step_cost) in neighbors(grid, coord, policy) {
            let Some(neighbor_index) = grid.index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] {
                continue;
            }

            let tentative_g = current_g + step_cost;
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }

            best_g[neighbor_index] = tentative_g;
            parent[neighbor_index] = Some(current.index);
            let h_cost = octile_distance(neighbor, goal);
            open.push(OpenNode {
                index: neighbor_index,
                f_cost: tentative_g + h_cost,
                h_cost,
                insertion_order: next_insertion,
            });
            next_insertion += 1;
        }
    }

    debug!(expanded, ?start, ?goal, "astar_no_path");
    None
}

fn neighbors(
    grid: &NavigationGrid,
    coord: GridCoord,
    policy: DiagonalPolicy,
) -> impl Iterator<Item = (GridCoord, f32)> + '_ {
    let cardinals = CARDINAL_STEPS.iter().filter_map(move |(dx, dy)| {
        let next = GridCoord::new(coord.x + dx, coord.y + dy);
        grid.is_walkable(next.x, next.y).then_some((next, CARDINAL_COST))
    });
    let diagonals = DIAGONAL_STEPS.iter().filter_map(move |(dx, dy)| {
        let next = GridCoord::new(coord.x + dx, coord.y + dy);
        if !grid.is_walkable(next.x, next.y) {
            return None;
        }
        let flank_x_open = grid.is_walkable(coord.x + dx, coord.y);
        let flank_y_open = grid.is_walkable(coord.x, coord.y + dy);
        policy
            .allows(flank_x_open, flank_y_open)
            .then_some((next, DIAGONAL_COST))
    });
    cardinals.chain(diagonals)
}

fn reconstruct_cell_path(
    grid: &NavigationGrid,
    parent: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Option<Vec<GridCoord>> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];
    while cursor != start_index {
        cursor = parent.get(cursor).copied().flatten()?;
        indices.push(cursor);
    }
    indices.reverse();
    Some(indices.into_iter().map(|index| grid.coord_of(index)).collect())
}

/// Merges near-duplicate waypoints and drops interior points that lie on the
/// straight line between their neighbors. The first and last points survive.
pub fn simplify_path(points: &[Vec2]) -> Vec<Vec2> {
    let Some((&last, rest)) = points.split_last() else {
        return Vec::new();
    };

    let mut spaced: Vec<Vec2> = Vec::with_capacity(points.len());
    for &point in rest {
        match spaced.last() {
            Some(prev) if prev.distance(point) < MIN_WAYPOINT_SPACING => {}
            _ => spaced.push(point),
        }
    }
    if spaced.len() > 1 {
        if let Some(prev) = spaced.last() {
            if prev.distance(last) < MIN_WAYPOINT_SPACING {
                spaced.pop();
            }
        }
    }
    spaced.push(last);

    let mut simplified: Vec<Vec2> = Vec::with_capacity(spaced.len());
    for point in spaced {
        while simplified.len() >= 2 {
            let a = simplified[simplified.len() - 2];
            let b = simplified[simplified.len() - 1];
            if !is_redundant(a, b, point) {
                break;
            }
            simplified.pop();
        }
        simplified.push(point);
    }
    simplified
}

/// `b` is redundant when it sits on segment `a..c` within tolerance.
fn is_redundant(a: Vec2, b: Vec2, c: Vec2) -> bool {
    if distance_to_line(b, a, c) > COLLINEAR_TOLERANCE {
        return false;
    }
    let ac = c - a;
    let ab = b - a;
    let along = ab.x * ac.x + ab.y * ac.y;
    along >= 0.0 && along <= ac.length_squared()
}
