// select.rs — Constrained initial feature selection.
//
// Walks detector candidates strongest-first and accepts only those that
// satisfy the border margin and the pairwise separation constraint. The
// separation guarantee is what later makes per-point matching independent:
// no two tracked points ever share a search or SAD window.
//
// Acceptance can starve on poorly textured frames, so the candidate budget
// doubles per attempt up to a hard ceiling; crossing the ceiling is fatal
// for the session and surfaces as `NoFeaturesFound`.

use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::detect::CandidateDetector;
use crate::error::TrackError;
use crate::geometry::{too_close, within_border_margin, Point2};
use crate::image::Image;
use crate::subpix::SubpixelRefiner;

/// Largest candidate budget tried before giving up on a frame.
pub const BUDGET_CEILING: usize = 3000;

/// Build a fresh tracked-point set of exactly `config.num_tracked_points`
/// well-separated corners, sub-pixel refined.
pub fn select(
    frame: &Image<u8>,
    config: &TrackerConfig,
    detector: &dyn CandidateDetector,
    refiner: &dyn SubpixelRefiner,
    initial_budget: usize,
) -> Result<Vec<Point2>, TrackError> {
    let margin = config.border_margin();
    let min_sep = config.min_separation();
    let target = config.num_tracked_points;
    let mut budget = initial_budget.max(1);

    loop {
        let candidates = detector.detect(frame, budget);

        let mut accepted: Vec<Point2> = Vec::with_capacity(target);
        for &cand in &candidates {
            if !within_border_margin(cand, frame.width(), frame.height(), margin) {
                continue;
            }
            // Distance to every higher-ranked accepted point; rejecting
            // here keeps the strongest corner of each conflicting pair.
            if accepted.iter().any(|&p| too_close(cand, p, min_sep)) {
                continue;
            }
            accepted.push(cand);
            if accepted.len() == target {
                break;
            }
        }

        if accepted.len() == target {
            refiner.refine(frame, &mut accepted);
            debug!(budget, points = target, "tracked-point set selected");
            return Ok(accepted);
        }

        debug!(
            accepted = accepted.len(),
            target,
            budget,
            "insufficient yield, doubling candidate budget"
        );
        budget *= 2;
        if budget > BUDGET_CEILING {
            warn!(budget, "candidate budget ceiling exhausted, no trackable features");
            return Err(TrackError::NoFeaturesFound { budget });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Detector stub returning a fixed candidate list, truncated to the
    /// requested count, while counting invocations.
    struct FixedDetector {
        candidates: Vec<Point2>,
        calls: Cell<usize>,
    }

    impl FixedDetector {
        fn new(candidates: Vec<Point2>) -> Self {
            FixedDetector {
                candidates,
                calls: Cell::new(0),
            }
        }
    }

    impl CandidateDetector for FixedDetector {
        fn detect(&self, _region: &Image<u8>, max_count: usize) -> Vec<Point2> {
            self.calls.set(self.calls.get() + 1);
            self.candidates.iter().copied().take(max_count).collect()
        }
    }

    struct NoopRefiner;

    impl SubpixelRefiner for NoopRefiner {
        fn refine(&self, _image: &Image<u8>, _points: &mut [Point2]) {}
    }

    #[test]
    fn test_ceiling_bounds_retry_count() {
        let frame: Image<u8> = Image::new(200, 200);
        let config = TrackerConfig::default();
        let detector = FixedDetector::new(Vec::new());

        let initial = 30 * config.num_tracked_points; // 270
        let result = select(&frame, &config, &detector, &NoopRefiner, initial);
        assert!(matches!(result, Err(TrackError::NoFeaturesFound { .. })));

        // Budgets tried: 270, 540, 1080, 2160; 4320 crosses the ceiling.
        assert_eq!(detector.calls.get(), 4);
    }

    #[test]
    fn test_rank_order_wins_separation_conflicts() {
        // Second candidate conflicts with the first (stronger) one; the
        // third is clear of both.
        let detector = FixedDetector::new(vec![
            Point2::new(100.0, 100.0),
            Point2::new(105.0, 103.0),
            Point2::new(140.0, 100.0),
        ]);
        let config = TrackerConfig {
            num_tracked_points: 2,
            ..Default::default()
        };
        let frame: Image<u8> = Image::new(200, 200);

        let points = select(&frame, &config, &detector, &NoopRefiner, 10).unwrap();
        assert_eq!(points[0], Point2::new(100.0, 100.0));
        assert_eq!(points[1], Point2::new(140.0, 100.0));
    }

    #[test]
    fn test_border_candidates_rejected() {
        // Margin for the default config is 19; only the center candidate
        // qualifies, so a 1-point set selects it.
        let detector = FixedDetector::new(vec![
            Point2::new(5.0, 100.0),
            Point2::new(100.0, 195.0),
            Point2::new(100.0, 100.0),
        ]);
        let config = TrackerConfig {
            num_tracked_points: 1,
            ..Default::default()
        };
        let frame: Image<u8> = Image::new(200, 200);

        let points = select(&frame, &config, &detector, &NoopRefiner, 10).unwrap();
        assert_eq!(points, vec![Point2::new(100.0, 100.0)]);
    }
}
