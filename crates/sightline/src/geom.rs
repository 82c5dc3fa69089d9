use crate::model::Point;
use serde::Serialize;

/// Below this magnitude a coordinate delta is treated as zero when building a sight line.
pub const NEAR_ZERO: f64 = 1e-9;

/// Perpendicular distance from `(x, y)` to the line `y = slope * x + intercept`.
pub fn closest_distance_to_line(slope: f64, intercept: f64, x: f64, y: f64) -> f64 {
    (slope * x - y + intercept).abs() / (slope * slope + 1.0).sqrt()
}

/// Infinite line through a point and its focus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SightLine {
    Sloped { slope: f64, intercept: f64 },
    Vertical { x: f64 },
}

impl SightLine {
    /// Line through `from` and `to`, or `None` when both ends coincide.
    ///
    /// A near-zero horizontal delta switches to the vertical form instead of dividing by it.
    pub fn through(from: (f64, f64), to: (f64, f64)) -> Option<Self> {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        if dx.abs() < NEAR_ZERO {
            if dy.abs() < NEAR_ZERO {
                return None;
            }
            return Some(Self::Vertical { x: from.0 });
        }
        let slope = dy / dx;
        Some(Self::Sloped {
            slope,
            intercept: from.1 - slope * from.0,
        })
    }

    pub fn of(point: &Point) -> Option<Self> {
        Self::through(point.position(), point.focus())
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        match *self {
            Self::Sloped { slope, intercept } => closest_distance_to_line(slope, intercept, x, y),
            Self::Vertical { x: line_x } => (x - line_x).abs(),
        }
    }
}

/// True when the two disks of radius `radius` overlap (touching is allowed).
pub fn overlaps(a: &Point, b: &Point, radius: f64) -> bool {
    a.squared_distance_to(b) < 4.0 * radius * radius
}

/// Forbidden region a disk must keep clear of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Boundary {
    /// The `y = 0` line: centres must satisfy `y >= radius`.
    #[default]
    HalfPlane,
    /// A disk of `radius` around the origin.
    OriginDisk,
}

impl Boundary {
    pub fn is_violated_by(self, p: &Point, radius: f64) -> bool {
        match self {
            Self::HalfPlane => p.y < radius,
            Self::OriginDisk => p.x * p.x + p.y * p.y < radius * radius,
        }
    }
}
