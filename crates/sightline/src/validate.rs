use crate::geom::{Boundary, overlaps};
use crate::model::Point;
use crate::visibility::{OcclusionPolicy, is_blocked};
use serde::Serialize;

/// First broken invariant found in a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum Violation {
    #[error("point {index} has a non-finite coordinate")]
    NonFinite { index: usize },
    #[error("points {a} and {b} coincide")]
    Coincident { a: usize, b: usize },
    #[error("points {a} and {b} overlap")]
    Overlap { a: usize, b: usize },
    #[error("point {index} crosses the boundary")]
    Boundary { index: usize },
    #[error("line of sight of point {index} is blocked")]
    Blocked { index: usize },
}

/// Aggregated pass/fail check over a whole configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validator {
    pub radius: f64,
    pub boundary: Boundary,
    /// When set, every point must also see its focus.
    pub visibility: Option<OcclusionPolicy>,
}

impl Validator {
    pub fn new(radius: f64, boundary: Boundary) -> Self {
        Self {
            radius,
            boundary,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, policy: OcclusionPolicy) -> Self {
        self.visibility = Some(policy);
        self
    }

    pub fn without_visibility(mut self) -> Self {
        self.visibility = None;
        self
    }

    /// Checks, in order: finiteness, exact coincidence, overlap, boundary, visibility.
    pub fn check(&self, points: &[Point]) -> Result<(), Violation> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(Violation::NonFinite { index });
        }

        for a in 0..points.len() {
            for b in (a + 1)..points.len() {
                if points[a].x == points[b].x && points[a].y == points[b].y {
                    return Err(Violation::Coincident { a, b });
                }
            }
        }

        for a in 0..points.len() {
            for b in (a + 1)..points.len() {
                if overlaps(&points[a], &points[b], self.radius) {
                    return Err(Violation::Overlap { a, b });
                }
            }
        }

        if let Some(index) = points
            .iter()
            .position(|p| self.boundary.is_violated_by(p, self.radius))
        {
            return Err(Violation::Boundary { index });
        }

        if let Some(policy) = self.visibility {
            if let Some(index) =
                (0..points.len()).find(|&i| is_blocked(i, points, self.radius, policy))
            {
                return Err(Violation::Blocked { index });
            }
        }

        Ok(())
    }

    pub fn is_violating(&self, points: &[Point]) -> bool {
        self.check(points).is_err()
    }
}
