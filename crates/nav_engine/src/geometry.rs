use std::ops::{Add, Mul, Sub};

/// Lengths at or below this are treated as zero when normalizing.
const NORMALIZE_EPSILON: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    /// Unit vector in the same direction, or zero for a (near) zero vector.
    pub fn normalize_or_zero(self) -> Vec2 {
        let len = self.length();
        if len <= NORMALIZE_EPSILON {
            return Vec2::ZERO;
        }
        let inv_len = len.recip();
        Vec2 {
            x: self.x * inv_len,
            y: self.y * inv_len,
        }
    }

    /// Unit vector pointing from `self` toward `target`.
    pub fn direction_to(self, target: Vec2) -> Vec2 {
        (target - self).normalize_or_zero()
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2 {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Moves `current` toward `target` by at most `max_step`.
///
/// Returns the new position and whether it landed exactly on `target`. A step
/// that would reach or pass the target snaps to it, so callers never overshoot.
pub fn step_toward(current: Vec2, target: Vec2, max_step: f32) -> (Vec2, bool) {
    let delta = target - current;
    let distance_sq = delta.length_squared();
    if distance_sq == 0.0 {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    if max_step >= distance {
        return (target, true);
    }

    let inv_distance = distance.recip();
    (
        Vec2 {
            x: current.x + delta.x * inv_distance * max_step,
            y: current.y + delta.y * inv_distance * max_step,
        },
        false,
    )
}

/// Distance from `point` to the infinite line through `a` and `b`.
pub fn distance_to_line(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len = ab.length();
    if len <= NORMALIZE_EPSILON {
        return point.distance(a);
    }
    ab.cross(point - a).abs() / len
}

/// Axis-aligned bounds, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Option<Aabb> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Aabb {
            min: first,
            max: first,
        };
        for point in iter {
            bounds.expand_to_include(*point);
        }
        Some(bounds)
    }

    pub fn expand_to_include(&mut self, point: Vec2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    pub fn union(self, other: Aabb) -> Aabb {
        let mut merged = self;
        merged.expand_to_include(other.min);
        merged.expand_to_include(other.max);
        merged
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}
