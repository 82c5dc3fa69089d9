//! Line-of-sight test between a point and its focus.
//!
//! Both occlusion policies approximate "is the other disk between me and my focus" with a cheap
//! positional test instead of an exact segment/circle intersection. The quality metrics were
//! tuned against these approximations, so they are kept as-is: a disk that is classified as
//! "in front" blocks whenever it touches the *infinite* sight line, even past the focus.

use crate::geom::SightLine;
use crate::model::Point;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OcclusionPolicy {
    /// Only points at or below the source (`other.y <= source.y`) can block.
    #[default]
    HalfPlane,
    /// Points farther from the origin than the source, or in the diagonally opposite quadrant,
    /// never block.
    Radial,
}

impl OcclusionPolicy {
    pub fn is_behind(self, source: &Point, other: &Point) -> bool {
        match self {
            Self::HalfPlane => source.y < other.y,
            Self::Radial => {
                let source_r2 = source.x * source.x + source.y * source.y;
                let other_r2 = other.x * other.x + other.y * other.y;
                source_r2 < other_r2 || (source.x * other.x < 0.0 && source.y * other.y < 0.0)
            }
        }
    }
}

/// Returns true if some other point's disk touches the sight line of `points[index]`.
///
/// A point sitting exactly on its own focus has no sight line and counts as blocked.
pub fn is_blocked(index: usize, points: &[Point], radius: f64, policy: OcclusionPolicy) -> bool {
    let Some(source) = points.get(index) else {
        return false;
    };
    let Some(line) = SightLine::of(source) else {
        return true;
    };

    points.iter().enumerate().any(|(j, other)| {
        j != index && !policy.is_behind(source, other) && line.distance_to(other.x, other.y) < radius
    })
}
