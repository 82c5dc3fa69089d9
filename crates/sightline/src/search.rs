//! Trial controller: runs independent trials of either search and keeps the best result.

use crate::assign::{AssignmentBounds, assign_foci, enforce_periodicity, lane_spacing};
use crate::error::{Error, Result};
use crate::geom::Boundary;
use crate::layout::{LaneGrid, Layout};
use crate::metric::QualityMetric;
use crate::model::{Arena, Configuration, Point};
use crate::relax::{RelaxationOptions, relax};
use crate::validate::{Validator, Violation};
use crate::visibility::OcclusionPolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Algorithm {
    /// Layout, then greedy focus assignment along the boundary line.
    Constructive,
    /// Layout, then annealed force-directed relaxation toward each focus.
    Relaxation(RelaxationOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOptions {
    pub num_points: usize,
    pub num_trials: usize,
    pub radius: f64,
    /// Arena half-width.
    pub arena_size: f64,
    pub boundary: Boundary,
    pub layout: Layout,
    pub occlusion: OcclusionPolicy,
    pub metric: QualityMetric,
    pub algorithm: Algorithm,
    /// Relaxation step budget per trial; its square is the default seed retry budget.
    pub num_steps: usize,
    /// Overrides the `num_steps²` cap on layout regeneration attempts per trial.
    pub seed_retry_budget: Option<u64>,
    pub random_seed: u64,
    /// Wall-clock cap for the whole run, checked between attempts, steps and trials.
    pub time_limit: Option<Duration>,
    /// Keep budget-exhausted and interrupted trials out of the running best. Trials that fail
    /// the final validation never compete.
    pub skip_degraded: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::constructive(20, 200)
    }
}

impl SearchOptions {
    /// Lane layout above the `y = 0` line, foci assigned on that line, scored by mean focus
    /// distance minus the width of the focus window.
    pub fn constructive(num_points: usize, num_trials: usize) -> Self {
        let radius = 100.0;
        Self {
            num_points,
            num_trials,
            radius,
            arena_size: 8.0 * radius,
            boundary: Boundary::HalfPlane,
            layout: Layout::AngledStacks,
            occlusion: OcclusionPolicy::HalfPlane,
            metric: QualityMetric::AverageDistance,
            algorithm: Algorithm::Constructive,
            num_steps: 6000,
            seed_retry_budget: None,
            random_seed: 0,
            time_limit: None,
            skip_degraded: false,
        }
    }

    /// Uniform random start around an origin disk every point is attracted to, scored by the
    /// inverse-square sum.
    pub fn relaxation(num_points: usize, repulse: f64, repulse_distance: f64) -> Self {
        let radius = 200.0;
        Self {
            num_points,
            num_trials: 100,
            radius,
            arena_size: 2.0 * radius * num_points as f64,
            boundary: Boundary::OriginDisk,
            layout: Layout::UniformRandom,
            occlusion: OcclusionPolicy::Radial,
            metric: QualityMetric::InverseSquare,
            algorithm: Algorithm::Relaxation(RelaxationOptions {
                repulse,
                repulse_distance,
            }),
            num_steps: 10_000,
            seed_retry_budget: None,
            random_seed: 0,
            time_limit: None,
            skip_degraded: false,
        }
    }

    pub fn with_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_seed_retry_budget(mut self, budget: u64) -> Self {
        self.seed_retry_budget = Some(budget);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_skip_degraded(mut self, skip: bool) -> Self {
        self.skip_degraded = skip;
        self
    }

    pub fn arena(&self) -> Arena {
        Arena::new(self.arena_size, self.radius, self.boundary)
    }

    pub fn retry_budget(&self) -> u64 {
        self.seed_retry_budget.unwrap_or_else(|| {
            let steps = self.num_steps as u64;
            steps.saturating_mul(steps)
        })
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, message: impl Into<String>) -> Error {
            Error::InvalidOption {
                name,
                message: message.into(),
            }
        }

        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(invalid("radius", format!("must be positive, got {}", self.radius)));
        }
        if !(self.arena_size.is_finite() && self.arena_size >= self.radius) {
            return Err(invalid(
                "arena_size",
                format!(
                    "must be at least the radius ({}), got {}",
                    self.radius, self.arena_size
                ),
            ));
        }
        if self.num_points == 0 {
            return Err(invalid("num_points", "must be at least 1"));
        }
        if self.num_trials == 0 {
            return Err(invalid("num_trials", "must be at least 1"));
        }
        if let Algorithm::Relaxation(r) = &self.algorithm {
            if !(r.repulse.is_finite() && r.repulse >= 0.0) {
                return Err(invalid("repulse", format!("must be >= 0, got {}", r.repulse)));
            }
            if !(r.repulse_distance.is_finite() && r.repulse_distance >= 0.0) {
                return Err(invalid(
                    "repulse_distance",
                    format!("must be >= 0, got {}", r.repulse_distance),
                ));
            }
        }
        if matches!(self.layout, Layout::AngledStacks | Layout::StackedLanes) {
            LaneGrid::for_arena(self.num_points, &self.arena())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DegradedReason {
    /// No layout passed the seed check within the retry budget; the last one was used.
    RetryBudgetExceeded { attempts: u64 },
    /// The deadline or cancel flag fired during the seed search.
    Interrupted,
    /// The final configuration breaks an invariant (usually line of sight). Such a trial is
    /// never promoted to the best, whatever `skip_degraded` says.
    FinalCheckFailed(Violation),
    /// The metric is undefined for the final configuration.
    UndefinedQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TrialStatus {
    Valid,
    Degraded(DegradedReason),
}

impl TrialStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    fn degrade(&mut self, reason: DegradedReason) {
        if self.is_valid() {
            *self = Self::Degraded(reason);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResult {
    pub index: usize,
    pub configuration: Configuration,
    pub quality: f64,
    /// Mean point-to-focus distance in radii.
    pub mean_focus_distance: Option<f64>,
    /// Radius of the origin-centred disk the configuration fits in.
    pub extent: f64,
    /// Layouts generated before one was accepted.
    pub attempts: u64,
    pub status: TrialStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSummary {
    pub best: Option<TrialResult>,
    pub trials_run: usize,
    pub degraded_trials: usize,
    /// Trials whose final configuration failed validation.
    pub rejected_trials: usize,
    pub improvements: usize,
    pub interrupted: bool,
    pub elapsed_ms: u64,
}

/// What the visualizer is shown: a finished configuration and its metadata.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub points: &'a [Point],
    pub radius: f64,
    pub extent: f64,
    pub boundary: Boundary,
    pub num_points: usize,
    /// Rows of the layout the configuration started from, when it has rows.
    pub layers: Option<usize>,
    pub trial: usize,
    pub metric: QualityMetric,
    pub quality: f64,
    pub mean_focus_distance: Option<f64>,
    pub status: TrialStatus,
    /// Set on the closing frame that carries the best overall result.
    pub is_final: bool,
}

pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer of improving configurations. Errors are logged and never stop the search, and an
/// implementation must not block for long: hand heavy work off to another thread.
pub trait Visualizer {
    fn render(&mut self, frame: &Frame<'_>) -> std::result::Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVisualizer;

impl Visualizer for NoopVisualizer {
    fn render(&mut self, _frame: &Frame<'_>) -> std::result::Result<(), RenderError> {
        Ok(())
    }
}

impl<F> Visualizer for F
where
    F: FnMut(&Frame<'_>) -> std::result::Result<(), RenderError>,
{
    fn render(&mut self, frame: &Frame<'_>) -> std::result::Result<(), RenderError> {
        self(frame)
    }
}

#[derive(Debug)]
pub struct Search {
    options: SearchOptions,
    cancel: Arc<AtomicBool>,
}

impl Search {
    pub fn new(options: SearchOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Setting the returned flag stops the run at the next check point.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self, visualizer: &mut dyn Visualizer) -> Result<SearchSummary> {
        let mut rng = StdRng::seed_from_u64(self.options.random_seed);
        self.run_with_rng(&mut rng, visualizer)
    }

    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        visualizer: &mut dyn Visualizer,
    ) -> Result<SearchSummary> {
        let started = Instant::now();
        let deadline = self.options.time_limit.map(|limit| started + limit);
        let should_stop = || {
            self.cancel.load(Ordering::Relaxed) || deadline.is_some_and(|d| Instant::now() >= d)
        };

        let floor = match self.options.metric {
            QualityMetric::InverseSquare => 0.0,
            QualityMetric::AverageDistance => f64::NEG_INFINITY,
        };
        let mut summary = SearchSummary {
            best: None,
            trials_run: 0,
            degraded_trials: 0,
            rejected_trials: 0,
            improvements: 0,
            interrupted: false,
            elapsed_ms: 0,
        };

        for index in 0..self.options.num_trials {
            if should_stop() {
                summary.interrupted = true;
                break;
            }
            let trial = self.run_trial(index, rng, &should_stop)?;
            summary.trials_run += 1;
            tracing::debug!(
                trial = index,
                quality = trial.quality,
                attempts = trial.attempts,
                "trial finished"
            );

            if let TrialStatus::Degraded(reason) = trial.status {
                summary.degraded_trials += 1;
                tracing::warn!(trial = index, ?reason, "degraded trial");
                if let DegradedReason::FinalCheckFailed(_) = reason {
                    summary.rejected_trials += 1;
                    continue;
                }
                if self.options.skip_degraded {
                    continue;
                }
            }

            let threshold = summary.best.as_ref().map_or(floor, |b| b.quality);
            if trial.quality > threshold {
                tracing::info!(trial = index, quality = trial.quality, "new best configuration");
                summary.improvements += 1;
                self.emit(visualizer, &trial, false);
                summary.best = Some(trial);
            }
        }

        if let Some(best) = &summary.best {
            self.emit(visualizer, best, true);
        }
        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(summary)
    }

    /// Visualizer frame for a finished trial.
    pub fn frame<'a>(&self, trial: &'a TrialResult, is_final: bool) -> Frame<'a> {
        let o = &self.options;
        Frame {
            points: trial.configuration.as_slice(),
            radius: o.radius,
            extent: trial.extent,
            boundary: o.boundary,
            num_points: o.num_points,
            layers: o.layout.layer_count(o.num_points, &o.arena()),
            trial: trial.index,
            metric: o.metric,
            quality: trial.quality,
            mean_focus_distance: trial.mean_focus_distance,
            status: trial.status,
            is_final,
        }
    }

    fn emit(&self, visualizer: &mut dyn Visualizer, trial: &TrialResult, is_final: bool) {
        let frame = self.frame(trial, is_final);
        if let Err(err) = visualizer.render(&frame) {
            tracing::warn!(trial = trial.index, error = %err, "visualizer failed");
        }
    }

    /// Runs one trial of the configured algorithm.
    pub fn run_trial<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<TrialResult> {
        match self.options.algorithm {
            Algorithm::Constructive => self.constructive_trial(index, rng, should_stop),
            Algorithm::Relaxation(relaxation) => {
                self.relaxation_trial(index, &relaxation, rng, should_stop)
            }
        }
    }

    fn constructive_trial<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<TrialResult> {
        let o = &self.options;
        let arena = o.arena();
        let radius = o.radius;
        let seed_check = Validator::new(radius, o.boundary);
        let scan_range = o.arena_size.max(0.0) as usize;
        let budget = o.retry_budget();

        let mut status = TrialStatus::Valid;
        let mut attempts = 0u64;
        let mut points: Vec<Point> = Vec::new();
        loop {
            if attempts >= budget {
                status.degrade(DegradedReason::RetryBudgetExceeded { attempts });
                break;
            }
            if should_stop() {
                status.degrade(DegradedReason::Interrupted);
                break;
            }
            attempts += 1;

            let candidate = o.layout.generate(o.num_points, &arena, rng)?.points;
            if seed_check.is_violating(&candidate) {
                points = candidate;
                continue;
            }
            let bounds = base_row_bounds(&candidate, radius);
            match assign_foci(&candidate, radius, scan_range, bounds, o.occlusion) {
                Ok(assigned) => {
                    points = assigned;
                    break;
                }
                Err(exhausted) => {
                    tracing::trace!(trial = index, point = exhausted.index, "assignment exhausted");
                    points = exhausted.points;
                }
            }
        }

        let spacing = lane_spacing(&points);
        let spread = base_row_bounds(&points, radius).span();
        if let Some(grid) = o.layout.lane_grid(o.num_points, &arena) {
            enforce_periodicity(&mut points, &grid, spacing);
        }

        self.finish(index, points, spread, attempts, status)
    }

    fn relaxation_trial<R: Rng + ?Sized>(
        &self,
        index: usize,
        relaxation: &RelaxationOptions,
        rng: &mut R,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<TrialResult> {
        let o = &self.options;
        let arena = o.arena();
        let full_check = self.full_check();
        let budget = o.retry_budget();

        let mut status = TrialStatus::Valid;
        let mut attempts = 0u64;
        let mut start = Configuration::default();
        loop {
            if attempts >= budget {
                status.degrade(DegradedReason::RetryBudgetExceeded { attempts });
                break;
            }
            if should_stop() {
                status.degrade(DegradedReason::Interrupted);
                break;
            }
            attempts += 1;
            start = o.layout.generate(o.num_points, &arena, rng)?;
            if !full_check.is_violating(start.as_slice()) {
                break;
            }
        }

        let step_check = Validator::new(o.radius, o.boundary);
        let run = relax(
            start,
            o.radius,
            o.num_steps,
            relaxation,
            &step_check,
            &full_check,
            o.metric,
            should_stop,
        );
        tracing::debug!(
            trial = index,
            steps = run.steps,
            rolled_back = run.rolled_back,
            interrupted = run.interrupted,
            "relaxation finished"
        );

        self.finish(index, run.best.points, 0.0, attempts, status)
    }

    fn full_check(&self) -> Validator {
        Validator::new(self.options.radius, self.options.boundary)
            .with_visibility(self.options.occlusion)
    }

    fn finish(
        &self,
        index: usize,
        points: Vec<Point>,
        spread: f64,
        attempts: u64,
        mut status: TrialStatus,
    ) -> Result<TrialResult> {
        let radius = self.options.radius;
        // A broken invariant outranks any earlier reason.
        if let Err(violation) = self.full_check().check(&points) {
            status = TrialStatus::Degraded(DegradedReason::FinalCheckFailed(violation));
        }
        let quality = match self.options.metric.score(&points, radius, spread) {
            Some(q) => q,
            None => {
                status.degrade(DegradedReason::UndefinedQuality);
                f64::NEG_INFINITY
            }
        };
        let configuration = Configuration::new(points);
        let extent = if configuration.is_empty() {
            self.options.arena_size + radius
        } else {
            configuration.extent(radius)
        };
        Ok(TrialResult {
            index,
            mean_focus_distance: QualityMetric::mean_focus_distance(
                configuration.as_slice(),
                radius,
            ),
            configuration,
            quality,
            extent,
            attempts,
            status,
        })
    }
}

/// Focus window for a constructive configuration; an empty one gets a zero-width window.
fn base_row_bounds(points: &[Point], radius: f64) -> AssignmentBounds {
    AssignmentBounds::from_base_row(points, radius, lane_spacing(points)).unwrap_or(
        AssignmentBounds {
            min_x: 0.0,
            max_x: 0.0,
        },
    )
}
