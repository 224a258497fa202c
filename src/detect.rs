// detect.rs — Corner-strength candidate detection.
//
// Harris-style response: Sobel gradients, box-summed structure tensor,
// det(M) − k·trace(M)². Candidates are thresholded at a fixed fraction of
// the strongest response in the queried region, suppressed over the
// configured window, and returned strongest first.
//
// The same detector instance (and therefore the same parameters) serves
// both whole-frame selection and per-point search windows; only the
// candidate cap differs between the two call sites.

use crate::convolution::convolve_separable;
use crate::geometry::Point2;
use crate::image::Image;

/// Sobel kernels (unnormalized, standard convention).
const SOBEL_DERIV: [f32; 3] = [-1.0, 0.0, 1.0];
const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];

/// 3-tap box kernel for the structure-tensor window sum.
const BOX_3: [f32; 3] = [1.0, 1.0, 1.0];

/// Rows/columns next to the border carry convolution edge artifacts.
const RESPONSE_BORDER: usize = 2;

/// Produces ranked corner candidates for an image region.
pub trait CandidateDetector {
    /// Detect up to `max_count` candidate locations in `region`,
    /// strongest first. Coordinates are region-local pixels.
    fn detect(&self, region: &Image<u8>, max_count: usize) -> Vec<Point2>;
}

/// Harris corner detector with relative thresholding and window NMS.
pub struct HarrisDetector {
    /// Harris sensitivity parameter.
    pub k: f32,
    /// Response threshold as a fraction of the region's maximum response.
    pub quality_ratio: f32,
    /// Non-maximum-suppression radius: no two returned candidates lie
    /// within this distance of each other on both axes.
    pub suppression_window: usize,
}

impl HarrisDetector {
    /// Detector with the session's suppression window and the standard
    /// response parameters.
    pub fn new(suppression_window: usize) -> Self {
        HarrisDetector {
            k: 0.01,
            quality_ratio: 0.001,
            suppression_window,
        }
    }

    /// Harris response at every pixel. Positive responses mark corners,
    /// negative responses mark edges.
    fn corner_response(&self, image: &Image<u8>) -> Image<f32> {
        let w = image.width();
        let h = image.height();

        let ix = convolve_separable(image, &SOBEL_DERIV, &SOBEL_SMOOTH);
        let iy = convolve_separable(image, &SOBEL_SMOOTH, &SOBEL_DERIV);

        let mut ix2 = Image::<f32>::new(w, h);
        let mut iy2 = Image::<f32>::new(w, h);
        let mut ixiy = Image::<f32>::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let gx = ix.get(x, y);
                let gy = iy.get(x, y);
                ix2.set(x, y, gx * gx);
                iy2.set(x, y, gy * gy);
                ixiy.set(x, y, gx * gy);
            }
        }

        // Structure tensor: 3×3 box sum of the gradient products.
        let sxx = convolve_separable(&ix2, &BOX_3, &BOX_3);
        let syy = convolve_separable(&iy2, &BOX_3, &BOX_3);
        let sxy = convolve_separable(&ixiy, &BOX_3, &BOX_3);

        let mut response = Image::<f32>::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let a = sxx.get(x, y);
                let b = syy.get(x, y);
                let c = sxy.get(x, y);
                let det = a * b - c * c;
                let trace = a + b;
                response.set(x, y, det - self.k * trace * trace);
            }
        }
        response
    }
}

impl CandidateDetector for HarrisDetector {
    fn detect(&self, region: &Image<u8>, max_count: usize) -> Vec<Point2> {
        let w = region.width();
        let h = region.height();
        if max_count == 0 || w <= 2 * RESPONSE_BORDER || h <= 2 * RESPONSE_BORDER {
            return Vec::new();
        }

        let response = self.corner_response(region);

        // Threshold relative to the strongest response in this region.
        let mut max_response = 0.0f32;
        for y in RESPONSE_BORDER..(h - RESPONSE_BORDER) {
            for x in RESPONSE_BORDER..(w - RESPONSE_BORDER) {
                max_response = max_response.max(response.get(x, y));
            }
        }
        if max_response <= 0.0 {
            return Vec::new();
        }
        let threshold = self.quality_ratio * max_response;

        let mut corners: Vec<(Point2, f32)> = Vec::new();
        for y in RESPONSE_BORDER..(h - RESPONSE_BORDER) {
            for x in RESPONSE_BORDER..(w - RESPONSE_BORDER) {
                let r = response.get(x, y);
                if r > threshold {
                    corners.push((Point2::new(x as f32, y as f32), r));
                }
            }
        }

        // Strongest first, then greedy suppression: a corner survives only
        // if no stronger survivor sits within the suppression window.
        corners.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let sep = self.suppression_window as f32;
        let mut kept: Vec<Point2> = Vec::new();
        for (p, _) in corners {
            let suppressed = kept
                .iter()
                .any(|q| (p.x - q.x).abs() <= sep && (p.y - q.y).abs() <= sep);
            if !suppressed {
                kept.push(p);
                if kept.len() == max_count {
                    break;
                }
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square_scene(squares: &[(usize, usize, usize, u8)]) -> Image<u8> {
        let mut img = Image::from_vec(120, 120, vec![30u8; 120 * 120]);
        for &(sx, sy, size, val) in squares {
            for y in sy..(sy + size).min(120) {
                for x in sx..(sx + size).min(120) {
                    img.set(x, y, val);
                }
            }
        }
        img
    }

    #[test]
    fn test_detects_isolated_corner() {
        let img = make_square_scene(&[(50, 50, 20, 220)]);
        let det = HarrisDetector::new(5);
        let corners = det.detect(&img, 10);
        assert!(!corners.is_empty(), "square corners should be detected");

        // Every candidate should sit near one of the four square corners.
        for p in &corners {
            let near_x = (p.x - 50.0).abs() < 3.0 || (p.x - 69.0).abs() < 3.0;
            let near_y = (p.y - 50.0).abs() < 3.0 || (p.y - 69.0).abs() < 3.0;
            assert!(
                near_x && near_y,
                "candidate ({}, {}) is not near a square corner",
                p.x,
                p.y
            );
        }
    }

    #[test]
    fn test_flat_image_yields_nothing() {
        let img = Image::from_vec(60, 60, vec![128u8; 3600]);
        let det = HarrisDetector::new(5);
        assert!(det.detect(&img, 10).is_empty());
    }

    #[test]
    fn test_stronger_corner_ranks_first() {
        // High-contrast square vs. low-contrast square.
        let img = make_square_scene(&[(20, 20, 20, 250), (75, 75, 20, 55)]);
        let det = HarrisDetector::new(5);
        let corners = det.detect(&img, 20);
        assert!(corners.len() >= 2);
        let first = corners[0];
        assert!(
            first.x < 60.0 && first.y < 60.0,
            "strongest candidate ({}, {}) should come from the bright square",
            first.x,
            first.y
        );
    }

    #[test]
    fn test_suppression_window_enforced() {
        let img = make_square_scene(&[(30, 30, 25, 220), (70, 40, 20, 200), (40, 75, 22, 210)]);
        let det = HarrisDetector::new(5);
        let corners = det.detect(&img, 50);
        for i in 0..corners.len() {
            for j in (i + 1)..corners.len() {
                let dx = (corners[i].x - corners[j].x).abs();
                let dy = (corners[i].y - corners[j].y).abs();
                assert!(
                    dx > 5.0 || dy > 5.0,
                    "candidates {i} and {j} violate the suppression window"
                );
            }
        }
    }

    #[test]
    fn test_max_count_cap() {
        let img = make_square_scene(&[(30, 30, 25, 220), (70, 40, 20, 200), (40, 75, 22, 210)]);
        let det = HarrisDetector::new(5);
        assert!(det.detect(&img, 3).len() <= 3);
        assert!(det.detect(&img, 0).is_empty());
    }

    #[test]
    fn test_tiny_region_yields_nothing() {
        let img = Image::from_vec(4, 4, vec![128u8; 16]);
        let det = HarrisDetector::new(5);
        assert!(det.detect(&img, 7).is_empty());
    }
}
