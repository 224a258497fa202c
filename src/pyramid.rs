// pyramid.rs — Image pyramid for coarse-to-fine patch alignment.
//
// Each level is the previous one smoothed with a 5-tap binomial kernel and
// decimated 2×. Levels are f32 throughout: blur accumulation and the LK
// iterations both need sub-pixel precision, and storing f32 avoids
// repeated u8↔f32 conversions.

use crate::convolution::{binomial_kernel_5, convolve_separable};
use crate::image::{Image, Pixel};

/// An image pyramid, finest level first.
pub struct Pyramid {
    pub levels: Vec<Image<f32>>,
}

impl Pyramid {
    /// Build a pyramid of up to `max_levels` levels.
    ///
    /// Construction stops early once another 2× decimation would no
    /// longer fit a `(2*window_radius + 1)`-sided alignment window, so the
    /// coarsest level always supports the caller's iteration window.
    ///
    /// # Panics
    /// Panics if `max_levels` is zero.
    pub fn build<T: Pixel>(src: &Image<T>, max_levels: usize, window_radius: usize) -> Self {
        assert!(max_levels >= 1, "pyramid must have at least 1 level");

        let kernel = binomial_kernel_5();
        let min_side = 2 * window_radius + 1;

        let mut levels = Vec::with_capacity(max_levels);
        levels.push(src.to_f32());

        for _ in 1..max_levels {
            let prev = levels.last().unwrap();
            if prev.width() / 2 < min_side || prev.height() / 2 < min_side {
                break;
            }
            let blurred = convolve_separable(prev, &kernel, &kernel);
            levels.push(downsample_2x(&blurred));
        }

        Pyramid { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &Image<f32> {
        &self.levels[level]
    }
}

/// 2× decimation: `dst(x, y) = src(2x, 2y)`, odd trailing row/column dropped.
fn downsample_2x(src: &Image<f32>) -> Image<f32> {
    let new_w = src.width() / 2;
    let new_h = src.height() / 2;
    let mut dst = Image::new(new_w, new_h);
    for y in 0..new_h {
        for x in 0..new_w {
            // SAFETY: 2x < width and 2y < height since x < width/2, y < height/2.
            unsafe {
                dst.set_unchecked(x, y, src.get_unchecked(x * 2, y * 2));
            }
        }
    }
    dst
}
