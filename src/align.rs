// align.rs — Pyramidal Lucas-Kanade alignment of a patch pair.
//
// Forward-additive formulation: gradients are evaluated at the warped
// position in the current patch each iteration, so the 2×2 Hessian is
// rebuilt per iteration. Displacement is solved coarse-to-fine over a
// pyramid and doubled when moving to the next finer level.
//
// The aligner is only reliable for small motions and occasionally emits
// corrections that leave the patch entirely; the validity flag and the
// caller's patch-bounds check together filter those.

use crate::geometry::Point2;
use crate::image::{interpolate_bilinear, Image};
use crate::pyramid::Pyramid;

/// Result of aligning one patch pair.
#[derive(Debug, Clone, Copy)]
pub struct Alignment {
    /// Refined point in patch-local coordinates.
    pub point: Point2,
    /// False when the normal matrix went singular or the solution is not
    /// finite; the point is unusable in that case.
    pub valid: bool,
}

/// Refines a point location by aligning a patch pair.
pub trait PatchAligner {
    /// Align `curr_patch` against `prev_patch`, starting from `initial`
    /// (patch-local coordinates, typically the patch center).
    fn align(&self, prev_patch: &Image<u8>, curr_patch: &Image<u8>, initial: Point2) -> Alignment;
}

/// Forward-additive pyramidal LK.
pub struct PyramidalLk {
    /// Integration window half-size.
    pub window_radius: usize,
    /// Pyramid depth cap; actual depth shrinks with the patch.
    pub max_levels: usize,
    /// Gauss-Newton iteration cap per level.
    pub max_iterations: usize,
    /// Convergence threshold on the per-iteration update, in pixels.
    pub epsilon: f32,
}

impl Default for PyramidalLk {
    fn default() -> Self {
        PyramidalLk {
            window_radius: 3,
            max_levels: 4,
            max_iterations: 20,
            epsilon: 0.03,
        }
    }
}

enum LkResult {
    Converged(f32, f32),
    MaxIter(f32, f32),
    Singular,
}

impl PyramidalLk {
    /// One iterative LK solve at a single pyramid level.
    fn solve_level(
        &self,
        prev: &Image<f32>,
        curr: &Image<f32>,
        fx: f32,
        fy: f32,
        mut dx: f32,
        mut dy: f32,
    ) -> LkResult {
        let half = self.window_radius as isize;

        for _ in 0..self.max_iterations {
            let mut h00 = 0.0f32;
            let mut h01 = 0.0f32;
            let mut h11 = 0.0f32;
            let mut b0 = 0.0f32;
            let mut b1 = 0.0f32;

            for py in -half..=half {
                for px in -half..=half {
                    let px_f = px as f32;
                    let py_f = py as f32;

                    let t_val = interpolate_bilinear(prev, fx + px_f, fy + py_f);

                    let wx = fx + dx + px_f;
                    let wy = fy + dy + py_f;
                    let i_val = interpolate_bilinear(curr, wx, wy);
                    let e = t_val - i_val;

                    // Gradients at the warped position, central differences.
                    let gx = 0.5
                        * (interpolate_bilinear(curr, wx + 1.0, wy)
                            - interpolate_bilinear(curr, wx - 1.0, wy));
                    let gy = 0.5
                        * (interpolate_bilinear(curr, wx, wy + 1.0)
                            - interpolate_bilinear(curr, wx, wy - 1.0));

                    h00 += gx * gx;
                    h01 += gx * gy;
                    h11 += gy * gy;
                    b0 += gx * e;
                    b1 += gy * e;
                }
            }

            let det = h00 * h11 - h01 * h01;
            if det.abs() < 1e-6 {
                return LkResult::Singular;
            }
            let inv_det = 1.0 / det;
            let delta_x = inv_det * (h11 * b0 - h01 * b1);
            let delta_y = inv_det * (h00 * b1 - h01 * b0);

            dx += delta_x;
            dy += delta_y;

            if delta_x * delta_x + delta_y * delta_y < self.epsilon * self.epsilon {
                return LkResult::Converged(dx, dy);
            }
        }
        LkResult::MaxIter(dx, dy)
    }
}

impl PatchAligner for PyramidalLk {
    fn align(&self, prev_patch: &Image<u8>, curr_patch: &Image<u8>, initial: Point2) -> Alignment {
        let prev_pyr = Pyramid::build(prev_patch, self.max_levels, self.window_radius);
        let curr_pyr = Pyramid::build(curr_patch, self.max_levels, self.window_radius);
        let num_levels = prev_pyr.num_levels().min(curr_pyr.num_levels());

        let mut dx = 0.0f32;
        let mut dy = 0.0f32;

        for level in (0..num_levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let result = self.solve_level(
                prev_pyr.level(level),
                curr_pyr.level(level),
                initial.x * scale,
                initial.y * scale,
                dx,
                dy,
            );

            match result {
                LkResult::Converged(nx, ny) | LkResult::MaxIter(nx, ny) => {
                    dx = nx;
                    dy = ny;
                }
                LkResult::Singular => {
                    return Alignment {
                        point: initial,
                        valid: false,
                    };
                }
            }

            if level > 0 {
                dx *= 2.0;
                dy *= 2.0;
            }
        }

        let point = Point2::new(initial.x + dx, initial.y + dy);
        Alignment {
            point,
            valid: point.x.is_finite() && point.y.is_finite(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Patch pair with a textured gradient shifted by (dx, dy) pixels.
    fn make_patch_pair(side: usize, dx: f32, dy: f32) -> (Image<u8>, Image<u8>) {
        let ramp = |x: f32, y: f32| -> u8 {
            let v = 120.0 + 60.0 * (0.5 * x).sin() + 50.0 * (0.4 * y).cos();
            v.clamp(0.0, 255.0) as u8
        };
        let mut a = Image::new(side, side);
        let mut b = Image::new(side, side);
        for y in 0..side {
            for x in 0..side {
                a.set(x, y, ramp(x as f32, y as f32));
                b.set(x, y, ramp(x as f32 - dx, y as f32 - dy));
            }
        }
        (a, b)
    }

    #[test]
    fn test_zero_motion() {
        let (a, _) = make_patch_pair(11, 0.0, 0.0);
        let aligner = PyramidalLk::default();
        let center = Point2::new(5.0, 5.0);
        let result = aligner.align(&a, &a, center);
        assert!(result.valid);
        assert!(
            (result.point.x - 5.0).abs() < 0.1 && (result.point.y - 5.0).abs() < 0.1,
            "identical patches should align at the start point, got {:?}",
            result.point
        );
    }

    #[test]
    fn test_recovers_small_translation() {
        let (a, b) = make_patch_pair(21, 1.5, -1.0);
        let aligner = PyramidalLk::default();
        let center = Point2::new(10.0, 10.0);
        let result = aligner.align(&a, &b, center);
        assert!(result.valid);
        assert!(
            (result.point.x - 11.5).abs() < 0.5,
            "dx: got {}, expected ~11.5",
            result.point.x
        );
        assert!(
            (result.point.y - 9.0).abs() < 0.5,
            "dy: got {}, expected ~9.0",
            result.point.y
        );
    }

    #[test]
    fn test_flat_patch_is_invalid() {
        let a = Image::from_vec(11, 11, vec![128u8; 121]);
        let aligner = PyramidalLk::default();
        let result = aligner.align(&a, &a, Point2::new(5.0, 5.0));
        assert!(!result.valid, "flat patches have a singular normal matrix");
    }
}
