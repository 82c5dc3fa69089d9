use crate::geom::Boundary;
use serde::Serialize;

/// A disk centre together with the focus its line of sight must reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub focus_x: f64,
    pub focus_y: f64,
}

impl Point {
    /// A point with an unassigned focus (`(0, 0)`).
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            focus_x: 0.0,
            focus_y: 0.0,
        }
    }

    pub fn with_focus(mut self, focus_x: f64, focus_y: f64) -> Self {
        self.focus_x = focus_x;
        self.focus_y = focus_y;
        self
    }

    /// Same focus, new centre.
    pub fn moved_to(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn focus(&self) -> (f64, f64) {
        (self.focus_x, self.focus_y)
    }

    /// `(0, 0)` doubles as the "no focus yet" marker for the constructive layouts.
    pub fn has_focus(&self) -> bool {
        self.focus_x != 0.0 || self.focus_y != 0.0
    }

    pub fn focus_distance(&self) -> f64 {
        (self.focus_x - self.x).hypot(self.focus_y - self.y)
    }

    pub fn distance_from_origin(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn squared_distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.focus_x.is_finite()
            && self.focus_y.is_finite()
    }
}

/// Ordered set of points. Order only matters for lane bookkeeping (periodicity) and for
/// index-based neighbour iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    pub points: Vec<Point>,
}

impl Configuration {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    /// Radius of the smallest origin-centred disk that contains every disk of the
    /// configuration, or `radius` alone for an empty configuration.
    pub fn extent(&self, radius: f64) -> f64 {
        radius
            + self
                .points
                .iter()
                .map(Point::distance_from_origin)
                .fold(0.0, f64::max)
    }
}

impl From<Vec<Point>> for Configuration {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl<'a> IntoIterator for &'a Configuration {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// The region points live in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arena {
    /// Half-width: layouts sample x (and for the uniform layout, y) within `[-size, size]`.
    pub size: f64,
    pub radius: f64,
    pub boundary: Boundary,
}

impl Arena {
    pub fn new(size: f64, radius: f64, boundary: Boundary) -> Self {
        Self {
            size,
            radius,
            boundary,
        }
    }

    /// `floor((size - 3r) / r)`: number of vertical lanes the lane layouts carve the arena into.
    pub fn lane_count(&self) -> usize {
        let lanes = ((self.size - 3.0 * self.radius) / self.radius).floor();
        if lanes.is_finite() && lanes > 0.0 {
            lanes as usize
        } else {
            0
        }
    }
}
