//! Greedy focus assignment for the constructive search.

use crate::layout::LaneGrid;
use crate::model::Point;
use crate::visibility::{OcclusionPolicy, is_blocked};
use serde::Serialize;

/// Horizontal window foci may be placed in on the boundary line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssignmentBounds {
    pub min_x: f64,
    pub max_x: f64,
}

impl AssignmentBounds {
    /// Window spanned by the lowest row of points, widened by one lane `spacing` on the right.
    /// The window is always at least one diameter wide, so a lone base point still has room.
    ///
    /// Returns `None` for an empty configuration.
    pub fn from_base_row(points: &[Point], radius: f64, spacing: f64) -> Option<Self> {
        let base_y = points.iter().map(|p| p.y).reduce(f64::min)?;
        let base = points.iter().filter(|p| p.y == base_y);
        let (lo, hi) = base.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.x), hi.max(p.x))
        });
        let min_x = lo + radius;
        Some(Self {
            min_x,
            max_x: (hi + spacing - radius).max(min_x + 2.0 * radius),
        })
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min_x && x <= self.max_x
    }

    /// Width of the window; this is what the spread penalty charges for.
    pub fn span(&self) -> f64 {
        self.max_x - self.min_x
    }
}

/// Horizontal offset between the first two points (one lane width for lane layouts).
pub fn lane_spacing(points: &[Point]) -> f64 {
    match points {
        [first, second, ..] => second.x - first.x,
        _ => 0.0,
    }
}

/// Some point had no unblocked focus candidate inside the scan window.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("no unblocked focus for point {index}")]
pub struct AssignmentExhausted {
    pub index: usize,
    /// Input configuration with the reassignments committed before `index`.
    pub points: Vec<Point>,
}

/// Moves every point's focus to the nearest unblocked spot on the `y = 0` line.
///
/// Candidates are `x + side * d` for `d = 0..=scan_range` and `side` in `{+1, -1}`, nearest
/// first; those outside `bounds` are skipped. The search is all-or-nothing: the first point
/// without a valid candidate fails the whole configuration.
pub fn assign_foci(
    points: &[Point],
    radius: f64,
    scan_range: usize,
    bounds: AssignmentBounds,
    policy: OcclusionPolicy,
) -> Result<Vec<Point>, AssignmentExhausted> {
    let mut assigned = points.to_vec();
    for index in 0..assigned.len() {
        let original = assigned[index];
        let found = (0..=scan_range)
            .flat_map(|d| [1.0, -1.0].map(|side| original.x + side * d as f64))
            .filter(|&x| bounds.contains(x))
            .find(|&x| {
                assigned[index] = original.with_focus(x, 0.0);
                !is_blocked(index, &assigned, radius, policy)
            });
        if found.is_none() {
            assigned[index] = original;
            return Err(AssignmentExhausted {
                index,
                points: assigned,
            });
        }
    }
    Ok(assigned)
}

/// Forces each complete row to repeat with period `spacing`: the last lane's point becomes a
/// copy of the one before it, shifted right by `spacing` (centre and focus).
pub fn enforce_periodicity(points: &mut [Point], grid: &LaneGrid, spacing: f64) {
    if grid.lanes < 2 {
        return;
    }
    for row in 0..grid.per_lane {
        let last = (row + 1) * grid.lanes - 1;
        let Some(&prev) = points.get(last - 1) else {
            return;
        };
        if let Some(slot) = points.get_mut(last) {
            *slot = Point {
                x: prev.x + spacing,
                focus_x: prev.focus_x + spacing,
                ..prev
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssignmentBounds, assign_foci, enforce_periodicity, lane_spacing};
    use crate::layout::LaneGrid;
    use crate::model::Point;
    use crate::visibility::{OcclusionPolicy, is_blocked};

    fn wide() -> AssignmentBounds {
        AssignmentBounds {
            min_x: -1000.0,
            max_x: 1000.0,
        }
    }

    #[test]
    fn unobstructed_point_looks_straight_down() {
        let points = [Point::new(40.0, 100.0)];
        let out = assign_foci(&points, 10.0, 50, wide(), OcclusionPolicy::HalfPlane).expect("ok");
        assert_eq!(out[0].focus(), (40.0, 0.0));
    }

    #[test]
    fn blocked_point_scans_sideways() {
        // The lower disk sits right under the upper one.
        let points = [Point::new(0.0, 100.0), Point::new(0.0, 40.0)];
        let out = assign_foci(&points, 10.0, 100, wide(), OcclusionPolicy::HalfPlane).expect("ok");
        assert_ne!(out[0].focus_x, 0.0);
        for i in 0..out.len() {
            assert!(!is_blocked(i, &out, 10.0, OcclusionPolicy::HalfPlane));
        }
        // The nearest unblocked offset is tried right before the left side of the same offset.
        assert!(out[0].focus_x > 0.0);
    }

    #[test]
    fn candidates_outside_bounds_are_skipped() {
        let points = [Point::new(0.0, 100.0)];
        let bounds = AssignmentBounds {
            min_x: 12.0,
            max_x: 20.0,
        };
        let out = assign_foci(&points, 10.0, 50, bounds, OcclusionPolicy::HalfPlane).expect("ok");
        assert_eq!(out[0].focus_x, 12.0);
    }

    #[test]
    fn exhaustion_keeps_committed_reassignments() {
        // Point 1 is fenced in by a wide row of lower disks and a tiny window.
        let points = [
            Point::new(500.0, 100.0),
            Point::new(0.0, 300.0),
            Point::new(-20.0, 40.0),
            Point::new(0.0, 40.0),
            Point::new(20.0, 40.0),
        ];
        let bounds = AssignmentBounds {
            min_x: -5.0,
            max_x: 505.0,
        };
        let err = assign_foci(&points, 10.0, 5, bounds, OcclusionPolicy::HalfPlane).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.points[0].focus(), (500.0, 0.0));
        assert_eq!(err.points[1], points[1]);
    }

    #[test]
    fn base_row_bounds() {
        let points = [
            Point::new(-700.0, 100.0),
            Point::new(-450.0, 100.0),
            Point::new(-200.0, 100.0),
            Point::new(-600.0, 300.0),
        ];
        let spacing = lane_spacing(&points);
        assert_eq!(spacing, 250.0);
        let b = AssignmentBounds::from_base_row(&points, 100.0, spacing).expect("bounds");
        assert_eq!(b.min_x, -600.0);
        assert_eq!(b.max_x, -50.0);
        assert_eq!(b.span(), 550.0);
        assert!(AssignmentBounds::from_base_row(&[], 1.0, 0.0).is_none());
    }

    #[test]
    fn lone_base_point_still_gets_a_window() {
        let points = [Point::new(0.0, 100.0)];
        let b = AssignmentBounds::from_base_row(&points, 100.0, lane_spacing(&points))
            .expect("bounds");
        assert_eq!((b.min_x, b.max_x), (100.0, 300.0));
        let out = assign_foci(&points, 100.0, 500, b, OcclusionPolicy::HalfPlane).expect("ok");
        assert_eq!(out[0].focus(), (100.0, 0.0));

        // A second point to the left of the first gives a negative offset.
        let points = [Point::new(0.0, 100.0), Point::new(-400.0, 100.0)];
        let b = AssignmentBounds::from_base_row(&points, 100.0, lane_spacing(&points))
            .expect("bounds");
        assert_eq!((b.min_x, b.max_x), (-300.0, -100.0));
    }

    #[test]
    fn periodicity_rewrites_last_lane() {
        let grid = LaneGrid {
            lanes: 3,
            per_lane: 2,
            remainder: 1,
        };
        let mut points: Vec<Point> = (0..7)
            .map(|i| Point::new(i as f64 * 10.0, (i / 3) as f64).with_focus(i as f64, 0.0))
            .collect();
        enforce_periodicity(&mut points, &grid, 100.0);
        assert_eq!(points[2], Point::new(110.0, 0.0).with_focus(101.0, 0.0));
        assert_eq!(points[5], Point::new(140.0, 1.0).with_focus(104.0, 0.0));
        // The partial row is left alone.
        assert_eq!(points[6].x, 60.0);
    }
}
