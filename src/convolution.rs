// convolution.rs — Separable 1D convolution over Image<T>.
//
// A 2D convolution with a separable kernel decomposes into a horizontal
// and a vertical 1D pass, O(2k) instead of O(k²) per pixel. Border
// handling is clamp (edge pixels replicate), which is benign for the
// small patches and smoothing kernels this crate uses.

use crate::image::{Image, Pixel};

/// Convolve each row of `src` with a centered 1D kernel.
///
/// # Panics
/// Panics if the kernel is empty or has even length.
pub fn convolve_rows<T: Pixel>(src: &Image<T>, kernel: &[f32]) -> Image<f32> {
    check_kernel(kernel);
    let w = src.width();
    let h = src.height();
    let half = (kernel.len() / 2) as isize;
    let mut dst = Image::<f32>::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - half).clamp(0, (w - 1) as isize);
                acc += src.get(sx as usize, y).to_f32() * kv;
            }
            dst.set(x, y, acc);
        }
    }
    dst
}

/// Convolve each column of `src` with a centered 1D kernel.
///
/// # Panics
/// Panics if the kernel is empty or has even length.
pub fn convolve_cols(src: &Image<f32>, kernel: &[f32]) -> Image<f32> {
    check_kernel(kernel);
    let w = src.width();
    let h = src.height();
    let half = (kernel.len() / 2) as isize;
    let mut dst = Image::<f32>::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - half).clamp(0, (h - 1) as isize);
                acc += src.get(x, sy as usize) * kv;
            }
            dst.set(x, y, acc);
        }
    }
    dst
}

/// Full separable 2D convolution: horizontal pass, then vertical pass.
///
/// Output is f32 regardless of input type because accumulation happens
/// in f32.
pub fn convolve_separable<T: Pixel>(
    src: &Image<T>,
    kernel_row: &[f32],
    kernel_col: &[f32],
) -> Image<f32> {
    let intermediate = convolve_rows(src, kernel_row);
    convolve_cols(&intermediate, kernel_col)
}

/// Normalized 5-tap binomial kernel, the standard pyramid smoothing filter.
pub fn binomial_kernel_5() -> [f32; 5] {
    [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0]
}

fn check_kernel(kernel: &[f32]) {
    assert!(!kernel.is_empty(), "kernel must not be empty");
    assert!(
        kernel.len() % 2 == 1,
        "kernel length must be odd (got {})",
        kernel.len()
    );
}
