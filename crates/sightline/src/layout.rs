//! Initial layout generators.
//!
//! Every generator is a pure function of `(num_points, arena, rng)`. Coordinates that the
//! layouts draw at random are whole numbers, so two runs with the same seed produce
//! bit-identical configurations.

use crate::error::{Error, Result};
use crate::model::{Arena, Configuration, Point};
use rand::Rng;
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;

/// Extra clearance added past a lane's far edge when placing its default focus.
pub const LANE_FOCUS_MARGIN: f64 = 5.0;

const LAYER_GROWTH: f64 = 1.1;
const SIDE_ROW_GROWTH: f64 = 1.1;
const SIDE_ROW_START: f64 = 2.5;
const LANE_SPACING_GROWTH: f64 = 2.0;
const SCATTER_HEIGHT_PER_POINT: f64 = 10.0;
/// Added to the row step of angled stacks so touching rows stay clear after rounding.
const ROW_CLEARANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Layout {
    /// One point per y-layer, layer spacing growing 1.1x, random x.
    Layered,
    /// Rows across all lanes, each row stepping along a randomly steepening curve.
    #[default]
    AngledStacks,
    /// Alternating left/right edge points with rows spaced 1.1x further apart each time.
    DoubleSided,
    /// Vertical lanes whose in-lane spacing doubles at every point.
    StackedLanes,
    /// Independent uniform integer coordinates over the whole square arena.
    UniformRandom,
    /// Random points above the boundary line, each with a random focus on it.
    Scattered,
}

/// How lane-based layouts split `num_points` over `floor((A - 3r) / r)` lanes.
///
/// Points that do not divide evenly (`remainder`) are not dropped: they fill the first lanes
/// one extra point each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneGrid {
    pub lanes: usize,
    pub per_lane: usize,
    pub remainder: usize,
}

impl LaneGrid {
    pub fn for_arena(num_points: usize, arena: &Arena) -> Result<Self> {
        let lanes = arena.lane_count();
        if lanes == 0 {
            return Err(Error::ArenaTooSmall {
                arena_size: arena.size,
                radius: arena.radius,
            });
        }
        Ok(Self {
            lanes,
            per_lane: num_points / lanes,
            remainder: num_points % lanes,
        })
    }

    /// Number of points lane `lane` receives.
    pub fn lane_len(&self, lane: usize) -> usize {
        self.per_lane + usize::from(lane < self.remainder)
    }
}

impl Layout {
    pub fn generate<R: Rng + ?Sized>(
        self,
        num_points: usize,
        arena: &Arena,
        rng: &mut R,
    ) -> Result<Configuration> {
        let points = match self {
            Self::Layered => layered(num_points, arena, rng),
            Self::AngledStacks => angled_stacks(num_points, arena, rng)?,
            Self::DoubleSided => double_sided(num_points, arena),
            Self::StackedLanes => stacked_lanes(num_points, arena)?,
            Self::UniformRandom => uniform_random(num_points, arena, rng),
            Self::Scattered => scattered(num_points, arena, rng),
        };
        Ok(Configuration::new(points))
    }

    /// Lane structure that periodicity enforcement relies on, for layouts that have one.
    pub fn lane_grid(self, num_points: usize, arena: &Arena) -> Option<LaneGrid> {
        match self {
            Self::AngledStacks => LaneGrid::for_arena(num_points, arena).ok(),
            _ => None,
        }
    }

    /// Number of rows the layout stacks `num_points` into; `None` for unstructured layouts.
    pub fn layer_count(self, num_points: usize, arena: &Arena) -> Option<usize> {
        match self {
            Self::AngledStacks | Self::StackedLanes => LaneGrid::for_arena(num_points, arena)
                .ok()
                .map(|g| g.per_lane + usize::from(g.remainder > 0)),
            Self::DoubleSided => Some(num_points.div_ceil(2)),
            Self::Layered => Some(num_points),
            Self::UniformRandom | Self::Scattered => None,
        }
    }
}

/// Uniform whole number in `[lo, hi]`; collapses to `lo` for an empty range.
fn random_whole<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    let lo = lo.ceil() as i64;
    let hi = hi.floor() as i64;
    if hi <= lo {
        return lo as f64;
    }
    rng.gen_range(lo..=hi) as f64
}

fn layered<R: Rng + ?Sized>(num_points: usize, arena: &Arena, rng: &mut R) -> Vec<Point> {
    let r = arena.radius;
    let mut scale = 1.0;
    let mut points = Vec::with_capacity(num_points);
    for n in 0..num_points {
        let x = random_whole(rng, -arena.size + r, arena.size - r);
        points.push(Point::new(x, scale * (n + 1) as f64 * 2.0 * r));
        scale *= LAYER_GROWTH;
    }
    points
}

fn angled_stacks<R: Rng + ?Sized>(
    num_points: usize,
    arena: &Arena,
    rng: &mut R,
) -> Result<Vec<Point>> {
    let grid = LaneGrid::for_arena(num_points, arena)?;
    let r = arena.radius;
    let lane_width = random_whole(rng, 2.0 * r, (grid.per_lane as f64 * r).max(2.0 * r));

    let rows = grid.per_lane + usize::from(grid.remainder > 0);
    let mut points = Vec::with_capacity(num_points);
    let mut angle = 0.0f64;
    let (mut cx, mut cy) = (0.0f64, r);
    for row in 0..rows {
        let in_row = if row < grid.per_lane {
            grid.lanes
        } else {
            grid.remainder
        };
        for lane in 0..in_row {
            let shift = -arena.size + r + lane as f64 * lane_width;
            points.push(
                Point::new(cx + shift, cy).with_focus(shift + lane_width - r + LANE_FOCUS_MARGIN, 0.0),
            );
        }
        angle += rng.gen_range(0.0..1.0) * (FRAC_PI_2 - angle);
        let step = 2.0 * r + ROW_CLEARANCE;
        cx += step * angle.sin();
        cy += step * angle.cos();
    }
    Ok(points)
}

fn double_sided(num_points: usize, arena: &Arena) -> Vec<Point> {
    let r = arena.radius;
    let (left, right) = (-arena.size + r, arena.size - r);
    let mut separation = SIDE_ROW_START * r;
    let mut y = 0.0;
    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points / 2 {
        y += separation;
        points.push(Point::new(left, y));
        points.push(Point::new(right, y));
        separation *= SIDE_ROW_GROWTH;
    }
    if points.len() < num_points {
        y += separation;
        points.push(Point::new(left, y));
    }
    points
}

fn stacked_lanes(num_points: usize, arena: &Arena) -> Result<Vec<Point>> {
    let grid = LaneGrid::for_arena(num_points, arena)?;
    let r = arena.radius;
    let lane_width = 2.0 * arena.size / grid.lanes as f64;
    let mut points = Vec::with_capacity(num_points);
    for lane in 0..grid.lanes {
        let x = -arena.size + r + lane as f64 * lane_width;
        let focus_x = x + lane_width - r + LANE_FOCUS_MARGIN;
        let mut separation = 2.0 * r;
        let mut y = 0.0;
        for _ in 0..grid.lane_len(lane) {
            y += separation;
            points.push(Point::new(x, y).with_focus(focus_x, 0.0));
            separation *= LANE_SPACING_GROWTH;
        }
    }
    Ok(points)
}

fn uniform_random<R: Rng + ?Sized>(num_points: usize, arena: &Arena, rng: &mut R) -> Vec<Point> {
    (0..num_points)
        .map(|_| {
            let x = random_whole(rng, -arena.size, arena.size);
            let y = random_whole(rng, -arena.size, arena.size);
            Point::new(x, y)
        })
        .collect()
}

fn scattered<R: Rng + ?Sized>(num_points: usize, arena: &Arena, rng: &mut R) -> Vec<Point> {
    let r = arena.radius;
    let y_max = SCATTER_HEIGHT_PER_POINT * r * num_points as f64;
    (0..num_points)
        .map(|_| {
            let x = random_whole(rng, -arena.size + r, arena.size - r);
            let y = random_whole(rng, r, y_max);
            let focus_x = random_whole(rng, -arena.size, arena.size);
            Point::new(x, y).with_focus(focus_x, 0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{LaneGrid, Layout};
    use crate::error::Error;
    use crate::geom::Boundary;
    use crate::model::Arena;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn arena() -> Arena {
        Arena::new(800.0, 100.0, Boundary::HalfPlane)
    }

    #[test]
    fn every_layout_yields_requested_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for layout in [
            Layout::Layered,
            Layout::AngledStacks,
            Layout::DoubleSided,
            Layout::StackedLanes,
            Layout::UniformRandom,
            Layout::Scattered,
        ] {
            for n in [1usize, 7, 20, 23] {
                let c = layout.generate(n, &arena(), &mut rng).expect("layout");
                assert_eq!(c.len(), n, "{layout:?} with {n} points");
            }
        }
    }

    #[test]
    fn layered_spacing_grows() {
        let mut rng = StdRng::seed_from_u64(1);
        let c = Layout::Layered.generate(4, &arena(), &mut rng).expect("layout");
        let ys: Vec<f64> = c.iter().map(|p| p.y).collect();
        assert_eq!(ys[0], 200.0);
        assert!((ys[1] - 440.0).abs() < 1e-9);
        for p in &c {
            assert!(p.x >= -700.0 && p.x <= 700.0 && p.x.fract() == 0.0);
            assert!(!p.has_focus());
        }
    }

    #[test]
    fn angled_rows_share_y_and_lane_foci() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = Layout::AngledStacks
            .generate(20, &arena(), &mut rng)
            .expect("layout");
        for row in c.as_slice().chunks(5) {
            assert!(row.iter().all(|p| p.y == row[0].y));
            let lane = row[1].x - row[0].x;
            assert!((200.0..=400.0).contains(&lane));
            // Foci sit at the far edge of each point's own lane.
            for pair in row.windows(2) {
                assert!((pair[1].focus_x - pair[0].focus_x - lane).abs() < 1e-9);
            }
            assert!(row.iter().all(|p| p.focus_y == 0.0));
            assert_eq!(row[0].focus_x, -700.0 + lane - 100.0 + 5.0);
        }
        assert_eq!(c.as_slice()[0].y, 100.0);
    }

    #[test]
    fn double_sided_handles_odd_counts() {
        let mut rng = StdRng::seed_from_u64(0);
        let c = Layout::DoubleSided.generate(5, &arena(), &mut rng).expect("layout");
        let xs: Vec<f64> = c.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![-700.0, 700.0, -700.0, 700.0, -700.0]);
        assert_eq!(c.as_slice()[0].y, 250.0);
        assert!((c.as_slice()[2].y - 525.0).abs() < 1e-9);
    }

    #[test]
    fn stacked_lanes_double_spacing_and_spread_remainder() {
        let mut rng = StdRng::seed_from_u64(0);
        let c = Layout::StackedLanes
            .generate(7, &arena(), &mut rng)
            .expect("layout");
        // 5 lanes: lanes 0 and 1 get two points, the rest one.
        let lane0: Vec<_> = c.iter().filter(|p| p.x == -700.0).collect();
        assert_eq!(lane0.len(), 2);
        assert_eq!(lane0[0].y, 200.0);
        assert_eq!(lane0[1].y, 600.0);
        assert_eq!(lane0[0].focus_x, -700.0 + 320.0 - 100.0 + 5.0);
    }

    #[test]
    fn uniform_random_stays_in_arena_with_unset_focus() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = Arena::new(1600.0, 200.0, Boundary::OriginDisk);
        let c = Layout::UniformRandom.generate(50, &a, &mut rng).expect("layout");
        for p in &c {
            assert!(p.x.abs() <= 1600.0 && p.y.abs() <= 1600.0);
            assert!(!p.has_focus());
        }
    }

    #[test]
    fn lane_layouts_reject_tiny_arenas() {
        let mut rng = StdRng::seed_from_u64(0);
        let tiny = Arena::new(300.0, 100.0, Boundary::HalfPlane);
        let err = Layout::AngledStacks.generate(4, &tiny, &mut rng).unwrap_err();
        assert!(matches!(err, Error::ArenaTooSmall { .. }));
        assert!(Layout::Layered.generate(4, &tiny, &mut rng).is_ok());
    }

    #[test]
    fn lane_grid_counts() {
        let g = LaneGrid::for_arena(23, &arena()).expect("grid");
        assert_eq!((g.lanes, g.per_lane, g.remainder), (5, 4, 3));
        assert_eq!(g.lane_len(2), 5);
        assert_eq!(g.lane_len(3), 4);
    }

    #[test]
    fn layer_counts_follow_the_row_structure() {
        let a = arena();
        assert_eq!(Layout::AngledStacks.layer_count(23, &a), Some(5));
        assert_eq!(Layout::AngledStacks.layer_count(20, &a), Some(4));
        assert_eq!(Layout::StackedLanes.layer_count(3, &a), Some(1));
        assert_eq!(Layout::DoubleSided.layer_count(7, &a), Some(4));
        assert_eq!(Layout::Layered.layer_count(6, &a), Some(6));
        assert_eq!(Layout::UniformRandom.layer_count(6, &a), None);
    }
}
