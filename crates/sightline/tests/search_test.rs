use sightline::{
    Arena, Boundary, Frame, LaneGrid, Layout, OcclusionPolicy, Point, RenderError, Search,
    SearchOptions, TrialStatus, Validator, Violation,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

fn assert_no_overlap_or_boundary(points: &[Point], radius: f64, boundary: Boundary) {
    for (i, a) in points.iter().enumerate() {
        assert!(!boundary.is_violated_by(a, radius), "point {i} crosses {boundary:?}");
        for b in &points[i + 1..] {
            assert!(a.squared_distance_to(b) >= 4.0 * radius * radius);
        }
    }
}

#[test]
fn angled_stacks_fill_five_lanes_of_four_rows() {
    let arena = Arena::new(800.0, 100.0, Boundary::HalfPlane);
    let grid = LaneGrid::for_arena(20, &arena).expect("grid");
    assert_eq!((grid.lanes, grid.per_lane, grid.remainder), (5, 4, 0));

    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..10 {
        let c = Layout::AngledStacks
            .generate(20, &arena, &mut rng)
            .expect("layout");
        let mut rows: BTreeMap<u64, usize> = BTreeMap::new();
        for p in &c {
            *rows.entry(p.y.to_bits()).or_default() += 1;
        }
        assert_eq!(rows.len(), 4);
        assert!(rows.values().all(|&n| n == 5));
    }
}

#[test]
fn coincident_points_are_rejected_at_any_radius() {
    let points = [Point::new(3.0, 700.0), Point::new(3.0, 700.0)];
    for radius in [0.0, 0.5, 100.0, 1e9] {
        for boundary in [Boundary::HalfPlane, Boundary::OriginDisk] {
            let v = Validator::new(radius, boundary).with_visibility(OcclusionPolicy::Radial);
            assert_eq!(v.check(&points), Err(Violation::Coincident { a: 0, b: 1 }));
        }
    }
}

#[test]
fn relaxation_search_keeps_best_valid_geometry() {
    let opts = SearchOptions::relaxation(4, 50.0, 2.1)
        .with_trials(3)
        .with_steps(1500)
        .with_seed(5);
    let summary = Search::new(opts.clone())
        .expect("search")
        .run(&mut sightline::NoopVisualizer)
        .expect("run");
    assert_eq!(summary.trials_run, 3);
    assert!(!summary.interrupted);
    let best = summary.best.expect("best");
    assert_eq!(best.configuration.len(), 4);
    assert!(best.quality > 0.0);
    assert_eq!(best.status, TrialStatus::Valid);
    assert_no_overlap_or_boundary(best.configuration.as_slice(), opts.radius, opts.boundary);
    let full = Validator::new(opts.radius, opts.boundary).with_visibility(OcclusionPolicy::Radial);
    assert_eq!(full.check(best.configuration.as_slice()), Ok(()));
}

#[test]
fn constructive_search_is_deterministic_per_seed() {
    // One row across the five lanes: every point can look straight down.
    let opts = SearchOptions::constructive(5, 2)
        .with_seed_retry_budget(100)
        .with_seed(17);
    let run = || {
        Search::new(opts.clone())
            .expect("search")
            .run(&mut sightline::NoopVisualizer)
            .expect("run")
    };
    let first = run();
    let second = run();
    assert_eq!(first.trials_run, 2);
    let a = first.best.expect("best");
    let b = second.best.expect("best");
    assert_eq!(a.configuration, b.configuration);
    assert_eq!(a.quality, b.quality);
    assert_eq!(a.configuration.len(), 5);
    assert!(a.mean_focus_distance.is_some_and(|d| d > 0.0));
    assert_eq!(a.status, TrialStatus::Valid);
    assert_eq!(a.attempts, 1);
    let full = Validator::new(opts.radius, opts.boundary).with_visibility(opts.occlusion);
    assert_eq!(full.check(a.configuration.as_slice()), Ok(()));
    assert_no_overlap_or_boundary(a.configuration.as_slice(), opts.radius, opts.boundary);
}

#[test]
fn visualizer_sees_each_improvement_then_the_final_best() {
    let opts = SearchOptions::relaxation(3, 50.0, 2.1)
        .with_trials(6)
        .with_steps(300)
        .with_seed(8);
    let mut seen: Vec<(usize, f64, bool)> = Vec::new();
    let mut record = |frame: &Frame<'_>| -> Result<(), RenderError> {
        assert_eq!(frame.num_points, 3);
        assert_eq!(frame.radius, 200.0);
        seen.push((frame.trial, frame.quality, frame.is_final));
        Ok(())
    };
    let summary = Search::new(opts)
        .expect("search")
        .run(&mut record)
        .expect("run");
    let best = summary.best.expect("best");

    assert_eq!(seen.len(), summary.improvements + 1);
    let (improvements, last) = seen.split_at(seen.len() - 1);
    assert!(improvements.iter().all(|&(_, _, is_final)| !is_final));
    // Strictly increasing: equal scores keep the earlier trial.
    assert!(improvements.windows(2).all(|w| w[1].1 > w[0].1));
    assert_eq!(last[0], (best.index, best.quality, true));
}

#[test]
fn one_shot_helper_rejects_invalid_options() {
    let opts = SearchOptions {
        num_points: 0,
        ..SearchOptions::default()
    };
    let err = sightline::search(opts, &mut sightline::NoopVisualizer).unwrap_err();
    assert!(err.to_string().contains("num_points"));
}
