// error.rs — Error taxonomy for the tracking session.
//
// Per-point match failures and the degraded-quality signal are internal
// control flow (they trigger reinitialization, never an error return).
// Only session-fatal conditions surface here.

use thiserror::Error;

/// Errors surfaced to the caller of a tracking step.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The frame could not yield enough well-separated corner candidates
    /// even after exhausting the candidate-budget ceiling. Fatal for the
    /// session: no sensible point set can be produced from this frame.
    #[error("no trackable features found (candidate budget exhausted at {budget})")]
    NoFeaturesFound { budget: usize },

    /// The single reinitialization retry allowed per step was already
    /// spent and the freshly selected set degraded again. The caller may
    /// reseed on the next frame pair.
    #[error("tracking degraded again after reinitialization")]
    TrackingDegraded,

    /// The two frames of a step differ in dimensions.
    #[error("frame dimensions differ: {prev_w}x{prev_h} vs {curr_w}x{curr_h}")]
    FrameSizeMismatch {
        prev_w: usize,
        prev_h: usize,
        curr_w: usize,
        curr_h: usize,
    },

    /// The previous point set does not have `num_tracked_points` entries
    /// and no reseed was requested.
    #[error("expected {expected} tracked points, got {actual}")]
    PointCountMismatch { expected: usize, actual: usize },

    /// Rejected by [`TrackerConfig::validate`](crate::config::TrackerConfig::validate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
