// session.rs — Tracking session orchestration.
//
// The tracker owns its collaborators (detector, refiner, aligner) and runs
// one frame pair at a time through an explicit state machine: seed a fresh
// point set when asked (or on the first pair), match every point, and
// rebuild the whole set once per step when matching fails or too many flow
// vectors are oversized. A second failure within the same step is fatal
// for that step.
//
// Tracked-point ownership is handed through `step`: the caller passes the
// previous set in and receives in `StepResult` the set that was actually
// matched, which becomes the input of the next step.

use tracing::{debug, info};

use crate::align::{PatchAligner, PyramidalLk};
use crate::config::TrackerConfig;
use crate::detect::{CandidateDetector, HarrisDetector};
use crate::error::TrackError;
use crate::geometry::{Flow2, Point2};
use crate::image::Image;
use crate::matcher::match_point;
use crate::select::select;
use crate::subpix::{GradientRefiner, SubpixelRefiner};

/// Candidate budget multiplier for the initial seeding pass.
const SEED_BUDGET_FACTOR: usize = 30;
/// Candidate budget multiplier for mid-step reinitialization. Larger than
/// the seeding budget: reinitialization fires on frames that already
/// proved hard to track, so the first detection attempt digs deeper.
const REINIT_BUDGET_FACTOR: usize = 40;

/// Output of one successful tracking step.
#[derive(Debug)]
pub struct StepResult {
    /// The previous-frame points that were matched. Identical to the set
    /// passed in unless this step reseeded or reinitialized.
    pub prev_points: Vec<Point2>,
    /// Matched current-frame locations, index-aligned with `prev_points`.
    pub curr_points: Vec<Point2>,
    /// Per-point displacement, exactly `curr_points[i] - prev_points[i]`.
    pub flow: Vec<Flow2>,
}

enum SessionState {
    Seeding,
    Stepping(Vec<Point2>),
    Reinitializing,
}

enum PassFailure {
    /// A point's search window left the frame or held no candidates.
    Unmatchable { index: usize },
    /// The oversized-flow count reached the reinitialization threshold.
    TooManyOversized { count: usize },
}

/// A sparse-flow tracking session over a fixed-size point set.
pub struct Tracker {
    config: TrackerConfig,
    detector: Box<dyn CandidateDetector>,
    refiner: Box<dyn SubpixelRefiner>,
    aligner: Box<dyn PatchAligner>,
}

impl Tracker {
    /// Tracker with the standard collaborators: Harris detection,
    /// gradient-orthogonality sub-pixel refinement, pyramidal LK alignment.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackError> {
        config.validate()?;
        let suppression = config.suppression_window;
        Ok(Tracker {
            detector: Box::new(HarrisDetector::new(suppression)),
            refiner: Box::new(GradientRefiner::new(suppression)),
            aligner: Box::new(PyramidalLk::default()),
            config,
        })
    }

    /// Tracker with caller-supplied collaborators.
    pub fn with_collaborators(
        config: TrackerConfig,
        detector: Box<dyn CandidateDetector>,
        refiner: Box<dyn SubpixelRefiner>,
        aligner: Box<dyn PatchAligner>,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Tracker {
            config,
            detector,
            refiner,
            aligner,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Track one frame pair.
    ///
    /// `prev_points` is the set returned by the previous step; pass an
    /// empty vector (or set `force_reseed`) to select a fresh set on
    /// `prev_frame` before matching.
    pub fn step(
        &self,
        prev_frame: &Image<u8>,
        curr_frame: &Image<u8>,
        prev_points: Vec<Point2>,
        force_reseed: bool,
    ) -> Result<StepResult, TrackError> {
        if prev_frame.width() != curr_frame.width() || prev_frame.height() != curr_frame.height() {
            return Err(TrackError::FrameSizeMismatch {
                prev_w: prev_frame.width(),
                prev_h: prev_frame.height(),
                curr_w: curr_frame.width(),
                curr_h: curr_frame.height(),
            });
        }

        let target = self.config.num_tracked_points;
        let mut state = if force_reseed || prev_points.is_empty() {
            SessionState::Seeding
        } else if prev_points.len() != target {
            return Err(TrackError::PointCountMismatch {
                expected: target,
                actual: prev_points.len(),
            });
        } else {
            SessionState::Stepping(prev_points)
        };

        // At most one reinitialization per step; a second pass failure is
        // fatal for the step.
        let mut reinitialized = false;

        loop {
            state = match state {
                SessionState::Seeding => {
                    let points = select(
                        prev_frame,
                        &self.config,
                        self.detector.as_ref(),
                        self.refiner.as_ref(),
                        SEED_BUDGET_FACTOR * target,
                    )?;
                    debug!(points = points.len(), "seeded fresh tracked-point set");
                    SessionState::Stepping(points)
                }

                SessionState::Stepping(points) => {
                    match self.track_pass(prev_frame, curr_frame, &points) {
                        Ok(curr_points) => {
                            let flow: Vec<Flow2> = curr_points
                                .iter()
                                .zip(points.iter())
                                .map(|(&c, &p)| c - p)
                                .collect();
                            return Ok(StepResult {
                                prev_points: points,
                                curr_points,
                                flow,
                            });
                        }
                        Err(failure) => {
                            match failure {
                                PassFailure::Unmatchable { index } => {
                                    info!(index, "point unmatchable, reinitializing tracked set")
                                }
                                PassFailure::TooManyOversized { count } => {
                                    info!(count, "oversized-flow threshold hit, reinitializing tracked set")
                                }
                            }
                            if reinitialized {
                                return Err(TrackError::TrackingDegraded);
                            }
                            SessionState::Reinitializing
                        }
                    }
                }

                SessionState::Reinitializing => {
                    reinitialized = true;
                    let points = select(
                        prev_frame,
                        &self.config,
                        self.detector.as_ref(),
                        self.refiner.as_ref(),
                        REINIT_BUDGET_FACTOR * target,
                    )?;
                    SessionState::Stepping(points)
                }
            };
        }
    }

    /// Match every point of one set, failing fast on the conditions that
    /// warrant rebuilding the whole set.
    fn track_pass(
        &self,
        prev_frame: &Image<u8>,
        curr_frame: &Image<u8>,
        points: &[Point2],
    ) -> Result<Vec<Point2>, PassFailure> {
        let max_shift = self.config.max_expected_shift as f32;
        let mut curr_points = Vec::with_capacity(points.len());
        let mut oversized = 0usize;

        for (index, &prev) in points.iter().enumerate() {
            let curr = match_point(
                prev_frame,
                curr_frame,
                prev,
                &self.config,
                self.detector.as_ref(),
                self.aligner.as_ref(),
            )
            .ok_or(PassFailure::Unmatchable { index })?;

            let flow = curr - prev;
            if flow.x.abs() >= max_shift || flow.y.abs() >= max_shift {
                oversized += 1;
                if oversized >= self.config.reinit_failure_threshold {
                    return Err(PassFailure::TooManyOversized { count: oversized });
                }
            }
            curr_points.push(curr);
        }
        Ok(curr_points)
    }
}
