#![forbid(unsafe_code)]

//! Headless search for disk configurations with unobstructed lines of sight.
//!
//! `sightline` places `N` equal disks in a bounded arena, gives each one a focus, and searches
//! for the placement that scores best under a quality metric while no disks overlap, no disk
//! crosses the arena boundary and every disk can still "see" its focus. Two searches share one
//! engine: a constructive one (layered layout + greedy focus assignment) and a force-directed
//! relaxation. Both are driven by [`Search`].

pub mod assign;
pub mod error;
pub mod geom;
pub mod layout;
pub mod metric;
pub mod model;
pub mod relax;
pub mod search;
pub mod validate;
pub mod visibility;

pub use assign::{AssignmentBounds, AssignmentExhausted, assign_foci, enforce_periodicity};
pub use error::{Error, Result};
pub use geom::{Boundary, SightLine};
pub use layout::{LaneGrid, Layout};
pub use metric::QualityMetric;
pub use model::{Arena, Configuration, Point};
pub use relax::{ForceError, RelaxationOptions, Schedule};
pub use search::{
    Algorithm, DegradedReason, Frame, NoopVisualizer, RenderError, Search, SearchOptions,
    SearchSummary, TrialResult, TrialStatus, Visualizer,
};
pub use validate::{Validator, Violation};
pub use visibility::{OcclusionPolicy, is_blocked};

/// Runs a full search with the given options, reporting improvements to `visualizer`.
pub fn search(options: SearchOptions, visualizer: &mut dyn Visualizer) -> Result<SearchSummary> {
    Search::new(options)?.run(visualizer)
}
