// subpix.rs — Sub-pixel corner refinement.
//
// Iterative gradient-orthogonality scheme: at a true corner q, the image
// gradient at every nearby pixel p is orthogonal to q − p. Summing
// ∇I·∇Iᵀ and ∇I·∇Iᵀ·p over a window gives a 2×2 linear system whose
// solution is the refined corner; iterating re-centers the window until
// the update falls below a pixel tolerance.

use crate::geometry::Point2;
use crate::image::{interpolate_bilinear, Image};

/// Nudges detected corner locations to sub-pixel precision.
pub trait SubpixelRefiner {
    /// Refine every point in place. Points whose refinement is degenerate
    /// (flat window, drifting solution) are left unchanged.
    fn refine(&self, image: &Image<u8>, points: &mut [Point2]);
}

/// Gradient-orthogonality refiner.
pub struct GradientRefiner {
    /// Window half-size around the current estimate.
    pub window_radius: usize,
    /// Iteration cap per point.
    pub max_iterations: usize,
    /// Convergence tolerance in pixels.
    pub epsilon: f32,
}

impl GradientRefiner {
    /// Refiner matched to the detector's suppression window.
    pub fn new(suppression_window: usize) -> Self {
        GradientRefiner {
            window_radius: (suppression_window / 2).max(1),
            max_iterations: 30,
            epsilon: 0.01,
        }
    }

    fn refine_one(&self, img: &Image<f32>, start: Point2) -> Point2 {
        let r = self.window_radius as isize;
        let mut cx = start.x;
        let mut cy = start.y;

        for _ in 0..self.max_iterations {
            let mut a = 0.0f32;
            let mut b = 0.0f32;
            let mut c = 0.0f32;
            let mut bx = 0.0f32;
            let mut by = 0.0f32;

            for j in -r..=r {
                for i in -r..=r {
                    let px = cx + i as f32;
                    let py = cy + j as f32;
                    let gx = 0.5
                        * (interpolate_bilinear(img, px + 1.0, py)
                            - interpolate_bilinear(img, px - 1.0, py));
                    let gy = 0.5
                        * (interpolate_bilinear(img, px, py + 1.0)
                            - interpolate_bilinear(img, px, py - 1.0));

                    a += gx * gx;
                    b += gx * gy;
                    c += gy * gy;
                    bx += gx * gx * px + gx * gy * py;
                    by += gx * gy * px + gy * gy * py;
                }
            }

            let det = a * c - b * b;
            if det.abs() < 1e-6 {
                break;
            }
            let nx = (c * bx - b * by) / det;
            let ny = (a * by - b * bx) / det;

            let step = ((nx - cx).powi(2) + (ny - cy).powi(2)).sqrt();
            cx = nx;
            cy = ny;

            // A solution drifting out of the window is not a refinement of
            // this corner; keep the detector's estimate.
            if (cx - start.x).abs() > self.window_radius as f32
                || (cy - start.y).abs() > self.window_radius as f32
            {
                return start;
            }
            if step < self.epsilon {
                break;
            }
        }
        Point2::new(cx, cy)
    }
}

impl SubpixelRefiner for GradientRefiner {
    fn refine(&self, image: &Image<u8>, points: &mut [Point2]) {
        let img = image.to_f32();
        for p in points.iter_mut() {
            *p = self.refine_one(&img, *p);
        }
    }
}
