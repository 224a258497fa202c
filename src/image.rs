// image.rs — Single-channel image container and pixel-level primitives.
//
// Frames enter as Image<u8>; gradients, pyramids and alignment work on
// Image<f32>. Layout is row-major and contiguous (no stride padding),
// so row y starts at index y * width.

use std::fmt;

// ---------------------------------------------------------------------------
// Pixel trait
// ---------------------------------------------------------------------------

/// Types that can serve as pixel values in an [`Image`].
pub trait Pixel: Copy + Default + Send + Sync + PartialOrd + 'static {
    /// Raw cast to f32 (not normalized — intensity algorithms compare raw values).
    fn to_f32(self) -> f32;

    /// Construct a pixel from an f32 value, clamping/rounding as the type requires.
    fn from_f32(v: f32) -> Self;
}

impl Pixel for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v.clamp(0.0, 255.0).round() as u8
    }
}

impl Pixel for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

// ---------------------------------------------------------------------------
// Image<T>
// ---------------------------------------------------------------------------

/// A 2D single-channel image with runtime dimensions.
pub struct Image<T: Pixel> {
    /// Pixel data in row-major order. Length = width * height.
    data: Vec<T>,
    width: usize,
    height: usize,
}

// Manual Clone to make the deep copy of heap data explicit at call sites.
impl<T: Pixel> Clone for Image<T> {
    fn clone(&self) -> Self {
        Image {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T: Pixel> Image<T> {
    /// Create a zero-initialized image with the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        Image {
            data: vec![T::default(); width * height],
            width,
            height,
        }
    }

    /// Create an image from an existing pixel vector in row-major order.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length ({}) must equal width * height ({})",
            data.len(),
            width * height,
        );
        Image {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the pixel value at (x, y). x is column, y is row.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.bounds_check(x, y);
        self.data[y * self.width + x]
    }

    /// Get a pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height. Used in inner loops
    /// (blur, interpolation) where bounds are validated at the loop level.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, x: usize, y: usize) -> T {
        debug_assert!(
            x < self.width && y < self.height,
            "get_unchecked({x},{y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        *self.data.get_unchecked(y * self.width + x)
    }

    /// Set a pixel value without bounds checking.
    ///
    /// # Safety
    /// Caller must guarantee x < width and y < height.
    #[inline(always)]
    pub unsafe fn set_unchecked(&mut self, x: usize, y: usize, value: T) {
        debug_assert!(x < self.width && y < self.height);
        *self.data.get_unchecked_mut(y * self.width + x) = value;
    }

    /// Set the pixel at (x, y) to the given value.
    ///
    /// # Panics
    /// Panics if (x, y) is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.bounds_check(x, y);
        self.data[y * self.width + x] = value;
    }

    /// Borrow a single row as a slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Copy a rectangular sub-region into a new owned image.
    ///
    /// Patches handed to the aligner and matcher are small (tens of pixels a
    /// side), so an owned copy is cheaper than threading view lifetimes
    /// through every collaborator.
    ///
    /// # Panics
    /// Panics if the region extends beyond the image bounds.
    pub fn sub_image(&self, x: usize, y: usize, w: usize, h: usize) -> Image<T> {
        assert!(
            x + w <= self.width && y + h <= self.height,
            "sub_image region ({x},{y},{w},{h}) exceeds image bounds ({}x{})",
            self.width,
            self.height,
        );
        let mut out = Vec::with_capacity(w * h);
        for row in 0..h {
            let start = (y + row) * self.width + x;
            out.extend_from_slice(&self.data[start..start + w]);
        }
        Image::from_vec(w, h, out)
    }

    /// Iterate over all pixels as `(x, y, value)` tuples.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y, self.data[y * self.width + x])))
    }

    /// The underlying buffer as a flat row-major slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Convert every pixel to f32 (raw cast, no normalization).
    pub fn to_f32(&self) -> Image<f32> {
        let data = self.data.iter().map(|p| p.to_f32()).collect();
        Image::from_vec(self.width, self.height, data)
    }

    #[inline]
    fn bounds_check(&self, x: usize, y: usize) {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for image {}x{}",
            self.width,
            self.height,
        );
    }
}

// Debug formatting — useful for small images in tests.
impl<T: Pixel + fmt::Debug> fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Image<{}> {{ {}x{} }}",
            std::any::type_name::<T>(),
            self.width,
            self.height,
        )?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(16) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", self.get(x, y))?;
            }
            if self.width > 16 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bilinear interpolation
// ---------------------------------------------------------------------------

/// Bilinear interpolation for sub-pixel access on an f32 image.
///
/// Coordinates are clamped to the image boundary (edge pixels replicate),
/// so querying at or beyond the last row/column is safe.
///
/// # Panics
/// Panics if the image is empty.
pub fn interpolate_bilinear(img: &Image<f32>, x: f32, y: f32) -> f32 {
    assert!(
        img.width() > 0 && img.height() > 0,
        "cannot interpolate on an empty image"
    );

    let max_x = (img.width() - 1) as f32;
    let max_y = (img.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);

    // SAFETY: x0, x1 < width and y0, y1 < height after clamping.
    unsafe {
        let p00 = img.get_unchecked(x0, y0);
        let p10 = img.get_unchecked(x1, y0);
        let p01 = img.get_unchecked(x0, y1);
        let p11 = img.get_unchecked(x1, y1);
        (1.0 - fx) * (1.0 - fy) * p00
            + fx * (1.0 - fy) * p10
            + (1.0 - fx) * fy * p01
            + fx * fy * p11
    }
}

// ---------------------------------------------------------------------------
// Block difference (SAD)
// ---------------------------------------------------------------------------

/// Sum of absolute per-pixel differences between two equal-sized patches.
///
/// This is the matching cost used to disambiguate candidate matches: low
/// SAD means the patch around a candidate looks like the patch around the
/// point being tracked.
///
/// # Panics
/// Panics if the patches differ in size.
pub fn block_difference(a: &Image<u8>, b: &Image<u8>) -> f32 {
    assert!(
        a.width() == b.width() && a.height() == b.height(),
        "block_difference requires equal-sized patches ({}x{} vs {}x{})",
        a.width(),
        a.height(),
        b.width(),
        b.height(),
    );
    let mut sum = 0u32;
    for y in 0..a.height() {
        let ra = a.row(y);
        let rb = b.row(y);
        for (&pa, &pb) in ra.iter().zip(rb.iter()) {
            sum += pa.abs_diff(pb) as u32;
        }
    }
    sum as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_u8() {
        let img: Image<u8> = Image::new(10, 5);
        assert_eq!(img.width(), 10);
        assert_eq!(img.height(), 5);
        for (_, _, v) in img.pixels() {
            assert_eq!(v, 0u8);
        }
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut img: Image<u8> = Image::new(4, 3);
        img.set(0, 0, 10);
        img.set(3, 2, 255);
        img.set(1, 1, 42);
        assert_eq!(img.get(0, 0), 10);
        assert_eq!(img.get(3, 2), 255);
        assert_eq!(img.get(1, 1), 42);
        assert_eq!(img.get(2, 2), 0); // untouched pixel
    }

    #[test]
    fn test_from_vec() {
        let data: Vec<u8> = (0..12).collect();
        let img = Image::from_vec(4, 3, data);
        // Row 0: [0, 1, 2, 3], Row 1: [4, 5, 6, 7], Row 2: [8, 9, 10, 11]
        assert_eq!(img.get(0, 0), 0);
        assert_eq!(img.get(3, 0), 3);
        assert_eq!(img.get(0, 1), 4);
        assert_eq!(img.get(3, 2), 11);
    }

    #[test]
    fn test_row_slice() {
        let data: Vec<u8> = (0..12).collect();
        let img = Image::from_vec(4, 3, data);
        assert_eq!(img.row(0), &[0, 1, 2, 3]);
        assert_eq!(img.row(1), &[4, 5, 6, 7]);
        assert_eq!(img.row(2), &[8, 9, 10, 11]);
    }

    #[test]
    fn test_sub_image() {
        // 4x4 image:
        //   0  1  2  3
        //   4  5  6  7
        //   8  9 10 11
        //  12 13 14 15
        let data: Vec<u8> = (0..16).collect();
        let img = Image::from_vec(4, 4, data);

        let patch = img.sub_image(1, 1, 2, 2);
        assert_eq!(patch.width(), 2);
        assert_eq!(patch.height(), 2);
        assert_eq!(patch.get(0, 0), 5); // img(1,1)
        assert_eq!(patch.get(1, 0), 6); // img(2,1)
        assert_eq!(patch.get(0, 1), 9); // img(1,2)
        assert_eq!(patch.get(1, 1), 10); // img(2,2)
    }

    #[test]
    #[should_panic(expected = "exceeds image bounds")]
    fn test_sub_image_out_of_bounds() {
        let img: Image<u8> = Image::new(4, 4);
        let _ = img.sub_image(3, 3, 2, 2);
    }

    #[test]
    fn test_to_f32() {
        let img = Image::from_vec(2, 2, vec![0u8, 128, 64, 255]);
        let f = img.to_f32();
        assert_eq!(f.get(0, 0), 0.0);
        assert_eq!(f.get(1, 0), 128.0);
        assert_eq!(f.get(0, 1), 64.0);
        assert_eq!(f.get(1, 1), 255.0);
    }

    #[test]
    fn test_bilinear_at_integer() {
        // At integer coordinates, bilinear returns the exact pixel value.
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let img = Image::from_vec(3, 3, data);
        assert!((interpolate_bilinear(&img, 0.0, 0.0) - 1.0).abs() < 1e-6);
        assert!((interpolate_bilinear(&img, 1.0, 1.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_bilinear_midpoint() {
        // At the midpoint of four pixels, bilinear is their average.
        let data: Vec<f32> = vec![0.0, 10.0, 20.0, 30.0];
        let img = Image::from_vec(2, 2, data);
        let v = interpolate_bilinear(&img, 0.5, 0.5);
        assert!((v - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_bilinear_boundary_clamp() {
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let img = Image::from_vec(2, 2, data);

        // Exactly at (1.0, 1.0) — bottom-right pixel.
        let v = interpolate_bilinear(&img, 1.0, 1.0);
        assert!((v - 4.0).abs() < 1e-6);

        // Beyond bounds — clamped back to edge.
        let v = interpolate_bilinear(&img, 5.0, 5.0);
        assert!((v - 4.0).abs() < 1e-6);

        // Negative — clamped to (0, 0).
        let v = interpolate_bilinear(&img, -1.0, -1.0);
        assert!((v - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_block_difference_identical_patches() {
        let data: Vec<u8> = (0..25).collect();
        let a = Image::from_vec(5, 5, data.clone());
        let b = Image::from_vec(5, 5, data);
        assert_eq!(block_difference(&a, &b), 0.0);
    }

    #[test]
    fn test_block_difference_accumulates() {
        let a = Image::from_vec(2, 2, vec![10u8, 20, 30, 40]);
        let b = Image::from_vec(2, 2, vec![12u8, 15, 30, 50]);
        // |10-12| + |20-15| + |30-30| + |40-50| = 2 + 5 + 0 + 10 = 17
        assert_eq!(block_difference(&a, &b), 17.0);
    }

    #[test]
    #[should_panic(expected = "equal-sized")]
    fn test_block_difference_size_mismatch() {
        let a: Image<u8> = Image::new(3, 3);
        let b: Image<u8> = Image::new(3, 4);
        let _ = block_difference(&a, &b);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds() {
        let img: Image<u8> = Image::new(4, 4);
        img.get(4, 0); // x == width
    }
}
