//! Force-directed relaxation.
//!
//! Each point feels a unit pull toward its focus plus a flat push away from every neighbour
//! within `repulse_distance * radius`. Only the *direction* of the summed force is used: every
//! point advances by the annealed step magnitude. All points move at once, and a step whose
//! result fails validation is thrown away as a whole.

use crate::metric::QualityMetric;
use crate::model::{Configuration, Point};
use crate::validate::{Validator, Violation};
use nalgebra::Vector2;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelaxationOptions {
    /// Initial repulsion strength, relative to the unit attraction.
    pub repulse: f64,
    /// Initial interaction range, in radii.
    pub repulse_distance: f64,
}

impl Default for RelaxationOptions {
    fn default() -> Self {
        Self {
            repulse: 50.0,
            repulse_distance: 2.1,
        }
    }
}

/// Annealed parameters in effect at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub magnitude: f64,
    pub repulse: f64,
    pub repulse_distance: f64,
}

impl Schedule {
    const MAGNITUDE_DECAY_PER_100: f64 = 10.0;
    const DISTANCE_DECAY_PER_1000: f64 = 0.1;
    const REPULSE_DECAY_PER_1000: f64 = 0.5;

    pub fn at(step: usize, radius: f64, options: &RelaxationOptions) -> Self {
        let thousands = (step / 1000) as f64;
        Self {
            magnitude: (radius - Self::MAGNITUDE_DECAY_PER_100 * (step as f64 / 100.0)).max(1.0),
            repulse: (options.repulse - Self::REPULSE_DECAY_PER_1000 * thousands).max(0.0),
            repulse_distance: (options.repulse_distance
                - Self::DISTANCE_DECAY_PER_1000 * thousands)
                .max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ForceError {
    #[error("point {index} sits exactly on its focus")]
    NumericDegeneracy { index: usize },
    #[error("no point {index} in a configuration of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Net force on `points[index]`.
pub fn sum_forces(
    index: usize,
    points: &[Point],
    schedule: &Schedule,
    radius: f64,
) -> Result<Vector2<f64>, ForceError> {
    let Some(&p) = points.get(index) else {
        return Err(ForceError::IndexOutOfRange {
            index,
            len: points.len(),
        });
    };
    let here = Vector2::new(p.x, p.y);
    let to_focus = Vector2::new(p.focus_x, p.focus_y) - here;
    let distance = to_focus.norm();
    if distance == 0.0 {
        return Err(ForceError::NumericDegeneracy { index });
    }

    let reach = schedule.repulse_distance * radius.abs();
    let push = points
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != index)
        .map(|(_, other)| here - Vector2::new(other.x, other.y))
        .filter(|offset| offset.norm() < reach)
        .fold(Vector2::<f64>::zeros(), |acc, offset| {
            acc + offset * (schedule.repulse / radius)
        });

    Ok(to_focus / distance + push)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    RolledBack(Rollback),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    Violation(Violation),
    Degenerate(ForceError),
}

/// Moves every point one step along its force direction, or leaves `points` untouched if the
/// moved configuration does not pass `validator`.
pub fn relax_step(
    points: &mut [Point],
    schedule: &Schedule,
    radius: f64,
    validator: &Validator,
) -> StepOutcome {
    let mut moved = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let force = match sum_forces(i, points, schedule, radius) {
            Ok(f) => f,
            Err(err) => return StepOutcome::RolledBack(Rollback::Degenerate(err)),
        };
        let norm = force.norm();
        if norm == 0.0 {
            moved.push(*p);
            continue;
        }
        let delta = force * (schedule.magnitude / norm);
        moved.push(p.moved_to(p.x + delta.x, p.y + delta.y));
    }

    match validator.check(&moved) {
        Ok(()) => {
            points.copy_from_slice(&moved);
            StepOutcome::Moved
        }
        Err(v) => StepOutcome::RolledBack(Rollback::Violation(v)),
    }
}

/// Result of relaxing one starting configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationRun {
    /// Best configuration that passed the acceptance check after any step; empty if none
    /// scored above zero.
    pub best: Configuration,
    pub best_quality: f64,
    /// Configuration after the last step.
    pub last: Configuration,
    pub steps: usize,
    pub rolled_back: usize,
    pub interrupted: bool,
}

/// Runs up to `num_steps` synchronous steps from `start`, tracking the best-scoring
/// configuration. `should_stop` is polled before every step.
///
/// Steps are rolled back against `validator`; a configuration only becomes the run's best if
/// it also passes `acceptance`, which usually adds the line-of-sight check.
#[allow(clippy::too_many_arguments)]
pub fn relax(
    start: Configuration,
    radius: f64,
    num_steps: usize,
    options: &RelaxationOptions,
    validator: &Validator,
    acceptance: &Validator,
    metric: QualityMetric,
    mut should_stop: impl FnMut() -> bool,
) -> RelaxationRun {
    let mut points = start.points;
    let mut run = RelaxationRun {
        best: Configuration::default(),
        best_quality: 0.0,
        last: Configuration::default(),
        steps: 0,
        rolled_back: 0,
        interrupted: false,
    };

    for step in 0..num_steps {
        if should_stop() {
            run.interrupted = true;
            break;
        }
        let schedule = Schedule::at(step, radius, options);
        if let StepOutcome::RolledBack(reason) =
            relax_step(&mut points, &schedule, radius, validator)
        {
            run.rolled_back += 1;
            tracing::trace!(step, ?reason, "relaxation step rolled back");
        }
        run.steps += 1;

        if let Some(quality) = metric.score(&points, radius, 0.0) {
            if quality > run.best_quality && !acceptance.is_violating(&points) {
                run.best_quality = quality;
                run.best = Configuration::new(points.clone());
            }
        }
    }

    run.last = Configuration::new(points);
    run
}
