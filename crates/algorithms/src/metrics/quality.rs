//! Quality indicators for predicted roof masks

use roofarea_core::raster::{Mask, Raster};
use roofarea_core::{Error, Result};

/// Default brightness at or below which a roof pixel counts as shadowed
pub const DEFAULT_DARKNESS_THRESHOLD: f64 = 0.3;
/// Default shadow fraction from which a roof is flagged
pub const DEFAULT_SHADOW_FLAG_THRESHOLD: f64 = 0.4;

fn check_shape<T: roofarea_core::RasterElement>(raster: &Raster<T>, mask: &Mask) -> Result<()> {
    let (er, ec) = mask.shape();
    let (ar, ac) = raster.shape();
    if (er, ec) != (ar, ac) {
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(())
}

/// Fraction of masked pixels whose brightness is at or below
/// `darkness_threshold`.
///
/// Multi-band images are reduced to the per-pixel mean over all bands. An
/// empty mask scores 0.
pub fn shadow_score(bands: &[Raster<f64>], mask: &Mask, darkness_threshold: f64) -> Result<f64> {
    if bands.is_empty() {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: "0".into(),
            reason: "image has no bands".into(),
        });
    }
    for band in bands {
        check_shape(band, mask)?;
    }

    let n = bands.len() as f64;
    let mut masked = 0usize;
    let mut dark = 0usize;
    for ((row, col), &inside) in mask.data().indexed_iter() {
        if !inside {
            continue;
        }
        let brightness = bands.iter().map(|b| b.data()[(row, col)]).sum::<f64>() / n;
        masked += 1;
        if brightness <= darkness_threshold {
            dark += 1;
        }
    }

    if masked == 0 {
        return Ok(0.0);
    }
    Ok(dark as f64 / masked as f64)
}

/// Whether a shadow score reaches the flagging threshold
pub fn quality_flag_shadow(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Mean probability over the boundary pixels of a mask.
///
/// A boundary pixel is set and has a 4-neighbour that is unset or outside the
/// grid. Returns 0 when the mask has no boundary.
pub fn edge_confidence(probability: &Raster<f64>, mask: &Mask) -> Result<f64> {
    check_shape(probability, mask)?;

    let edge = mask.boundary();
    let (sum, count) = edge
        .data()
        .indexed_iter()
        .filter(|(_, &on)| on)
        .fold((0.0, 0usize), |(s, c), (idx, _)| (s + probability.data()[idx], c + 1));

    if count == 0 {
        return Ok(0.0);
    }
    Ok(sum / count as f64)
}
