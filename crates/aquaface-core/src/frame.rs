//! Grayscale frame type and pixel statistics: mean, contrast, Laplacian variance.

use image::DynamicImage;
use ndarray::Array2;

/// Maximum representable 8-bit intensity.
pub const MAX_INTENSITY: f64 = 255.0;

/// A decoded image reduced to 8-bit grayscale.
///
/// Only constructible through [`GrayFrame::new`] or [`GrayFrame::from_image`],
/// so every frame has non-zero area and a buffer matching its shape.
#[derive(Clone)]
pub struct GrayFrame {
    /// Row-major pixels, shape (height, width).
    pixels: Array2<u8>,
}

impl GrayFrame {
    /// Convert a decoded image to grayscale.
    pub fn from_image(image: &DynamicImage) -> Result<Self, FrameError> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        Self::new(luma.into_raw(), width, height)
    }

    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroArea { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = data.len();
        let pixels = Array2::from_shape_vec((height as usize, width as usize), data)
            .map_err(|_| FrameError::InvalidLength { expected, actual })?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.nrows() as u32
    }

    /// Grayscale pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        // from_shape_vec with a (rows, cols) shape yields standard layout.
        self.pixels.as_slice().unwrap_or(&[])
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Average pixel brightness (0.0–255.0).
    pub fn avg_brightness(&self) -> f64 {
        self.pixels.iter().map(|&b| b as f64).sum::<f64>() / self.pixel_count() as f64
    }

    /// Population standard deviation of pixel intensity (0.0–127.5).
    pub fn std_dev(&self) -> f64 {
        let mean = self.avg_brightness();
        let variance = self
            .pixels
            .iter()
            .map(|&b| (b as f64 - mean).powi(2))
            .sum::<f64>()
            / self.pixel_count() as f64;
        variance.sqrt()
    }

    /// 4-neighbour Laplacian response at (x, y) with reflect-101 borders.
    ///
    /// Kernel:
    /// ```text
    /// | 0  1  0 |
    /// | 1 -4  1 |
    /// | 0  1  0 |
    /// ```
    pub fn laplacian_at(&self, x: usize, y: usize) -> i32 {
        let (h, w) = self.pixels.dim();
        let at = |x: isize, y: isize| -> i32 {
            self.pixels[[reflect_101(y, h), reflect_101(x, w)]] as i32
        };
        let (x, y) = (x as isize, y as isize);
        at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1) - 4 * at(x, y)
    }

    /// Population variance of the Laplacian response. Higher means more high-frequency detail.
    ///
    /// Streams over the frame without materializing the response map. The
    /// response is integral, so the sums are exact and the result is
    /// independent of traversal order.
    pub fn laplacian_variance(&self) -> f64 {
        let (h, w) = self.pixels.dim();
        let mut sum: i128 = 0;
        let mut sum_sq: i128 = 0;
        for y in 0..h {
            for x in 0..w {
                let v = self.laplacian_at(x, y) as i128;
                sum += v;
                sum_sq += v * v;
            }
        }
        let n = self.pixel_count() as i128;
        // n^2 * var = n * Σv² - (Σv)²
        let scaled = n * sum_sq - sum * sum;
        scaled as f64 / (n as f64 * n as f64)
    }
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge pixel.
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = i;
    // Kernel reach is one pixel, so a single reflection always lands in range for len >= 2.
    if i < 0 {
        i = -i;
    } else if i > last {
        i = 2 * last - i;
    }
    i as usize
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("image has zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
    #[error("invalid grayscale buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
