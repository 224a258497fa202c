// config.rs — Immutable per-session tracking parameters.

use crate::error::TrackError;

/// Parameters for one tracking session.
///
/// Constructed by the caller and threaded through every entry point; there
/// are no process-wide defaults. All radii are half-sizes: a radius of `r`
/// means a `(2r+1)×(2r+1)` window.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Number of points tracked per step. The output point and flow sets
    /// always have exactly this length on success.
    pub num_tracked_points: usize,
    /// Half-size of the patch handed to the pyramidal LK aligner.
    pub refiner_window_radius: usize,
    /// Half-size of the SAD block used to disambiguate candidates.
    pub match_block_radius: usize,
    /// Non-maximum-suppression radius of the corner detector. Also enters
    /// the point-separation and border-margin formulas.
    pub suppression_window: usize,
    /// Assumed maximum per-frame pixel displacement. Sizes the per-point
    /// search window and classifies oversized flow vectors as failures.
    pub max_expected_shift: usize,
    /// Number of oversized-flow points within one step that triggers a
    /// full reinitialization of the tracked set.
    pub reinit_failure_threshold: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            num_tracked_points: 9,
            refiner_window_radius: 5,
            match_block_radius: 4,
            suppression_window: 5,
            max_expected_shift: 20,
            reinit_failure_threshold: 4,
        }
    }
}

impl TrackerConfig {
    /// Minimum pairwise per-axis distance between tracked points.
    ///
    /// Two points closer than this on both axes would share a search or
    /// matching window, breaking per-point independence.
    pub fn min_separation(&self) -> f32 {
        (self.suppression_window + self.match_block_radius + 1) as f32
    }

    /// Minimum distance of an accepted point from every frame border.
    pub fn border_margin(&self) -> usize {
        2 * (self.suppression_window + self.match_block_radius) + 1
    }

    /// Radius of the per-point candidate search window in the current frame.
    pub fn search_radius(&self) -> usize {
        self.max_expected_shift + self.suppression_window
    }

    /// Reject parameter combinations the tracker cannot operate with.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.num_tracked_points == 0 {
            return Err(TrackError::InvalidConfig(
                "num_tracked_points must be at least 1".into(),
            ));
        }
        if self.reinit_failure_threshold == 0 {
            return Err(TrackError::InvalidConfig(
                "reinit_failure_threshold must be at least 1".into(),
            ));
        }
        if self.max_expected_shift == 0 {
            return Err(TrackError::InvalidConfig(
                "max_expected_shift must be at least 1 pixel".into(),
            ));
        }
        // Patch extractions inside the matcher assume the search-window
        // bounds check covers the refinement and SAD patches too.
        if self.refiner_window_radius > self.search_radius() {
            return Err(TrackError::InvalidConfig(format!(
                "refiner_window_radius ({}) exceeds the search radius ({})",
                self.refiner_window_radius,
                self.search_radius(),
            )));
        }
        if self.match_block_radius > self.search_radius() {
            return Err(TrackError::InvalidConfig(format!(
                "match_block_radius ({}) exceeds the search radius ({})",
                self.match_block_radius,
                self.search_radius(),
            )));
        }
        Ok(())
    }
}
