//! Gradient-threshold roof mask
//!
//! Blurs image intensity with a 5×5 binomial kernel, computes 3×3 Sobel
//! gradients, rescales the magnitude to [0, 255] and keeps the pixels whose
//! magnitude is strictly above `threshold × 255`. Borders are mirrored
//! without repeating the edge pixel (`dcb|abcd|cba`).

use crate::maybe_rayon::map_rows;
use ndarray::Array2;
use roofarea_core::raster::{Mask, Raster};
use roofarea_core::{Algorithm, Error, Result};

/// 5-tap binomial smoothing kernel
const BLUR_KERNEL: [f64; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Gradient mask parameters
#[derive(Debug, Clone, Copy)]
pub struct GradientParams {
    /// Fraction of the maximum gradient magnitude, clamped to [0, 1]
    pub threshold: f64,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Gradient mask algorithm over one or more image bands
#[derive(Debug, Clone, Default)]
pub struct GradientMask;

impl Algorithm for GradientMask {
    type Input = Vec<Raster<f64>>;
    type Output = Mask;
    type Params = GradientParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "GradientMask"
    }

    fn description(&self) -> &'static str {
        "Binary mask of strong intensity gradients (blur, Sobel, magnitude threshold)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        gradient_mask(&input, params.threshold)
    }
}

/// Compute the gradient-threshold mask of an image.
///
/// A single band is used as intensity directly; with more bands the
/// intensity is the per-pixel mean of the first three. The mask keeps the
/// transform and CRS of the first band.
pub fn gradient_mask(bands: &[Raster<f64>], threshold: f64) -> Result<Mask> {
    let intensity = intensity(bands)?;
    let magnitude = gradient_magnitude(&intensity)?;

    let max = magnitude.data().iter().copied().fold(0.0_f64, f64::max);
    let cutoff = threshold.clamp(0.0, 1.0) * 255.0;

    let data = if max > 0.0 {
        magnitude.data().mapv(|m| (m / max) * 255.0 > cutoff)
    } else {
        Array2::from_elem(magnitude.shape(), false)
    };

    Ok(Mask::from_array(data, *intensity.transform(), intensity.crs().cloned()))
}

/// Per-pixel intensity: the single band, or the mean of the first three.
/// Non-finite samples count as zero.
pub fn intensity(bands: &[Raster<f64>]) -> Result<Raster<f64>> {
    let first = bands.first().ok_or_else(|| Error::InvalidParameter {
        name: "bands",
        value: "0".into(),
        reason: "image has no bands".into(),
    })?;

    let used = &bands[..bands.len().min(3)];
    let (rows, cols) = first.shape();
    for band in used {
        if band.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: band.rows(),
                ac: band.cols(),
            });
        }
    }

    let n = used.len() as f64;
    let mut output = first.with_same_meta::<f64>(rows, cols);
    let out = output.data_mut();
    for band in used {
        ndarray::Zip::from(&mut *out)
            .and(band.data())
            .for_each(|o, &v| *o += if v.is_finite() { v } else { 0.0 });
    }
    if used.len() > 1 {
        out.mapv_inplace(|v| v / n);
    }

    Ok(output)
}

/// Mirror an out-of-range index back into `0..n` without repeating the edge
fn reflect101(mut i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Separable 5×5 binomial blur
pub fn blur(raster: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let half = (BLUR_KERNEL.len() / 2) as isize;

    // Row pass
    let row_smoothed: Vec<f64> = map_rows(rows, |row| {
        let mut out = vec![0.0; cols];
        for (col, o) in out.iter_mut().enumerate() {
            *o = BLUR_KERNEL
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let c = reflect101(col as isize + k as isize - half, cols);
                    w * data[[row, c]]
                })
                .sum();
        }
        out
    });
    let row_arr = Array2::from_shape_vec((rows, cols), row_smoothed)
        .map_err(|e| Error::Other(e.to_string()))?;

    // Column pass
    let smoothed: Vec<f64> = map_rows(rows, |row| {
        let mut out = vec![0.0; cols];
        for (col, o) in out.iter_mut().enumerate() {
            *o = BLUR_KERNEL
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let r = reflect101(row as isize + k as isize - half, rows);
                    w * row_arr[[r, col]]
                })
                .sum();
        }
        out
    });

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = Array2::from_shape_vec((rows, cols), smoothed)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Sobel gradient magnitude `sqrt(Gx² + Gy²)` of the blurred intensity
pub fn gradient_magnitude(raster: &Raster<f64>) -> Result<Raster<f64>> {
    let blurred = blur(raster)?;
    sobel(&blurred)
}

fn sobel(raster: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let data = raster.data();

    let magnitude: Vec<f64> = map_rows(rows, |row| {
        let up = reflect101(row as isize - 1, rows);
        let down = reflect101(row as isize + 1, rows);
        let mut row_data = vec![0.0; cols];

        for (col, out) in row_data.iter_mut().enumerate() {
            let left = reflect101(col as isize - 1, cols);
            let right = reflect101(col as isize + 1, cols);

            let z1 = data[[up, left]];
            let z2 = data[[up, col]];
            let z3 = data[[up, right]];
            let z4 = data[[row, left]];
            let z6 = data[[row, right]];
            let z7 = data[[down, left]];
            let z8 = data[[down, col]];
            let z9 = data[[down, right]];

            let gx = (z3 + 2.0 * z6 + z9) - (z1 + 2.0 * z4 + z7);
            let gy = (z7 + 2.0 * z8 + z9) - (z1 + 2.0 * z2 + z3);

            *out = (gx * gx + gy * gy).sqrt();
        }

        row_data
    });

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = Array2::from_shape_vec((rows, cols), magnitude)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
