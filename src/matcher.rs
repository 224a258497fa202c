// matcher.rs — Per-point candidate disambiguation.
//
// For one tracked point, detects up to MAX_MATCH_CANDIDATES corners in a
// local search window of the current frame, LK-refines each against the
// previous frame, and picks the candidate whose SAD block difference
// against the previous-frame patch is smallest. Refinement alone is not
// trusted: it is only reliable for small motions and occasionally emits
// out-of-range corrections, so the SAD vote across several raw candidates
// is the robustness layer.
//
// A `None` return means the point cannot be matched at all (search window
// off-frame, or no candidates in it) and signals the caller to rebuild
// the whole tracked set; index-stable output leaves no room for dropping
// a single point.

use tracing::debug;

use crate::align::PatchAligner;
use crate::config::TrackerConfig;
use crate::detect::CandidateDetector;
use crate::geometry::{centered_rect, Point2};
use crate::image::{block_difference, Image};

/// Candidate cap per search window. A handful of distractor corners is
/// the practical worst case inside one window; more would only dilute
/// the SAD vote.
pub const MAX_MATCH_CANDIDATES: usize = 7;

/// Match one previous-frame point into the current frame.
///
/// Returns the matched current-frame location, or `None` when the point
/// is unmatchable and the tracked set must be reinitialized.
pub fn match_point(
    prev_frame: &Image<u8>,
    curr_frame: &Image<u8>,
    prev_point: Point2,
    config: &TrackerConfig,
    detector: &dyn CandidateDetector,
    aligner: &dyn PatchAligner,
) -> Option<Point2> {
    let w = curr_frame.width();
    let h = curr_frame.height();
    let search = config.search_radius();
    let refine = config.refiner_window_radius;
    let block = config.match_block_radius;

    // Whole-window bounds check. config.validate() guarantees the search
    // radius also covers the refinement and SAD patches around the point.
    let window = centered_rect(prev_point, search, w, h)?;
    let (px, py) = prev_point.trunc();

    let region = curr_frame.sub_image(window.x, window.y, window.side, window.side);
    let candidates = detector.detect(&region, MAX_MATCH_CANDIDATES);
    if candidates.is_empty() {
        debug!(x = prev_point.x, y = prev_point.y, "no candidates in search window");
        return None;
    }

    let side = 2 * refine + 1;
    let prev_patch = prev_frame.sub_image(px - refine, py - refine, side, side);
    let block_side = 2 * block + 1;
    let prev_block = prev_frame.sub_image(px - block, py - block, block_side, block_side);

    // Previous point re-expressed in patch-local coordinates. The patch is
    // extracted at truncated pixel coordinates, so the point sits at the
    // integer center plus its sub-pixel fraction; carrying the fraction
    // into the alignment keeps matches from quantizing to the pixel grid.
    let patch_center = Point2::new(refine as f32, refine as f32);
    let initial = Point2::new(
        patch_center.x + (prev_point.x - px as f32),
        patch_center.y + (prev_point.y - py as f32),
    );
    let origin_x = window.x as f32;
    let origin_y = window.y as f32;

    let mut best: Option<(Point2, f32)> = None;
    let mut unusable = 0usize;

    for cand in &candidates {
        let cand_full = Point2::new(cand.x + origin_x, cand.y + origin_y);

        let usable = (|| {
            let rect = centered_rect(cand_full, refine, w, h)?;
            let curr_patch = curr_frame.sub_image(rect.x, rect.y, rect.side, rect.side);

            let aligned = aligner.align(&prev_patch, &curr_patch, initial);
            let limit = (2 * refine) as f32;
            if !aligned.valid
                || aligned.point.x < 0.0
                || aligned.point.y < 0.0
                || aligned.point.x > limit
                || aligned.point.y > limit
            {
                return None;
            }

            // The aligned point is relative to the candidate patch; its
            // offset from the integer patch center is the candidate's
            // full-frame correction.
            let corrected = cand_full + (aligned.point - patch_center);

            let block_rect = centered_rect(corrected, block, w, h)?;
            let curr_block =
                curr_frame.sub_image(block_rect.x, block_rect.y, block_rect.side, block_rect.side);
            let score = block_difference(&prev_block, &curr_block);
            Some((corrected, score))
        })();

        match usable {
            Some((corrected, score)) => {
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((corrected, score));
                }
            }
            None => unusable += 1,
        }
    }

    if let Some((point, _)) = best {
        return Some(point);
    }

    // Every candidate was unusable: fall back to the highest-ranked raw
    // candidate so the point still gets a (possibly coarse) match.
    debug_assert_eq!(unusable, candidates.len());
    let raw = Point2::new(candidates[0].x + origin_x, candidates[0].y + origin_y);
    debug!(
        x = prev_point.x,
        y = prev_point.y,
        "all candidates unusable, falling back to top raw candidate"
    );
    Some(raw)
}
