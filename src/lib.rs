// sparseflow: fixed-size sparse optical flow for visual-inertial platforms.
//
// Tracks a small, well-separated set of corner points across consecutive
// grayscale frame pairs and reports one displacement vector per point.
// The point count is invariant: a step either produces a full set of
// matches or the whole tracked set is rebuilt from scratch.
//
// Pipeline per frame pair: constrained corner selection (session start or
// reinitialization), per-point candidate detection in a local search
// window, pyramidal LK refinement of each candidate, SAD disambiguation,
// and a degradation counter that triggers the rebuild.

pub mod align;
pub mod config;
pub mod convolution;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod image;
pub mod matcher;
pub mod pyramid;
pub mod select;
pub mod session;
pub mod subpix;
