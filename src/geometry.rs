// geometry.rs — Point and flow value types, separation and margin tests,
// patch-rectangle computation.
//
// Coordinates are f32 pixels, origin at the top-left, x rightward and
// y downward. Patch centers are truncated toward zero before integer
// block extraction, matching the detector's pixel convention.

use std::ops::{Add, Sub};

/// A 2-D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Point2 { x, y }
    }

    /// Integer pixel coordinates, truncated toward zero.
    ///
    /// Callers must ensure the point is non-negative; tracked points
    /// always are after the border-margin check.
    pub fn trunc(&self) -> (usize, usize) {
        (self.x as usize, self.y as usize)
    }
}

/// A per-point displacement vector, `current - previous`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Flow2 {
    pub x: f32,
    pub y: f32,
}

impl Sub for Point2 {
    type Output = Flow2;

    fn sub(self, rhs: Point2) -> Flow2 {
        Flow2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add<Flow2> for Point2 {
    type Output = Point2;

    fn add(self, rhs: Flow2) -> Point2 {
        Point2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// Per-axis (Chebyshev) closeness test.
///
/// Two points conflict when they are within `min_separation` on *both*
/// axes — only then can their square search/match windows overlap.
pub fn too_close(a: Point2, b: Point2, min_separation: f32) -> bool {
    (a.x - b.x).abs() <= min_separation && (a.y - b.y).abs() <= min_separation
}

/// True if `p` lies strictly farther than `margin` pixels from every
/// border of a `width`×`height` frame.
pub fn within_border_margin(p: Point2, width: usize, height: usize, margin: usize) -> bool {
    let m = margin as f32;
    p.x > m && p.x < width as f32 - m && p.y > m && p.y < height as f32 - m
}

/// A square pixel rectangle: top-left corner plus side length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchRect {
    pub x: usize,
    pub y: usize,
    pub side: usize,
}

/// Rectangle of radius `radius` centered on the truncated coordinates of
/// `center`, or `None` if any part would leave a `width`×`height` frame.
pub fn centered_rect(
    center: Point2,
    radius: usize,
    width: usize,
    height: usize,
) -> Option<PatchRect> {
    let side = 2 * radius + 1;
    let cx = center.x as isize;
    let cy = center.y as isize;
    let r = radius as isize;
    if center.x < 0.0 || center.y < 0.0 || cx - r < 0 || cy - r < 0 {
        return None;
    }
    let x = (cx - r) as usize;
    let y = (cy - r) as usize;
    if x + side > width || y + side > height {
        return None;
    }
    Some(PatchRect { x, y, side })
}
