//! Agreement and area-error metrics between predicted and reference masks

use crate::mask::rasterize_polygons;
use roofarea_core::raster::{GridSpec, Mask};
use roofarea_core::vector::FeatureCollection;
use roofarea_core::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Evaluation result for one predicted mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalMetrics {
    /// Intersection over union, in [0, 1]
    pub iou: f64,
    /// Dice coefficient, in [0, 1]
    pub dice: f64,
    pub pred_area_m2: f64,
    pub gt_area_m2: f64,
    pub abs_area_error: f64,
    /// `abs_area_error / gt_area_m2`; `0` when both areas are zero and
    /// `+inf` when only the reference is empty
    #[serde(serialize_with = "serialize_ratio")]
    pub rel_area_error: f64,
}

fn serialize_ratio<S: serde::Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_infinite() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_f64(*value)
    }
}

impl fmt::Display for EvalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IoU {:.4}, Dice {:.4}, predicted {:.2} m², reference {:.2} m², relative error {}",
            self.iou,
            self.dice,
            self.pred_area_m2,
            self.gt_area_m2,
            format_metric(self.rel_area_error)
        )
    }
}

/// Four-decimal rendering, `inf` for infinite values
pub fn format_metric(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.4}", value)
    }
}

/// Compare a predicted mask with a reference mask on the same grid.
///
/// `pixel_area_m2` is the ground area of one pixel.
pub fn compute_metrics(pred: &Mask, gt: &Mask, pixel_area_m2: f64) -> Result<EvalMetrics> {
    let intersection = pred.intersection_count(gt)?;
    let union = pred.union_count(gt)?;
    let pred_count = pred.count();
    let gt_count = gt.count();

    let iou = if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    };

    let denom = pred_count + gt_count;
    let dice = if denom == 0 {
        1.0
    } else {
        (2 * intersection) as f64 / denom as f64
    };

    let pred_area_m2 = pred_count as f64 * pixel_area_m2;
    let gt_area_m2 = gt_count as f64 * pixel_area_m2;
    let abs_area_error = (pred_area_m2 - gt_area_m2).abs();
    let rel_area_error = if gt_area_m2 == 0.0 {
        if pred_area_m2 == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        abs_area_error / gt_area_m2
    };

    Ok(EvalMetrics {
        iou,
        dice,
        pred_area_m2,
        gt_area_m2,
        abs_area_error,
        rel_area_error,
    })
}

/// Area covered by a mask: set pixels × pixel width × pixel height
pub fn mask_area_m2(mask: &Mask, pixel_size_x: f64, pixel_size_y: f64) -> f64 {
    mask.count() as f64 * pixel_size_x * pixel_size_y
}

/// Rasterize reference polygons onto a grid.
///
/// An empty collection gives an all-false mask. A non-empty collection must
/// carry a CRS; it is reprojected to the grid CRS before burning.
pub fn rasterize_ground_truth(grid: &GridSpec, ground_truth: &FeatureCollection) -> Result<Mask> {
    if ground_truth.is_empty() {
        return Ok(Mask::empty(grid));
    }

    let source_crs = ground_truth
        .crs
        .as_ref()
        .ok_or_else(|| Error::MissingCrs("Ground truth vector".into()))?;

    let aligned = match &grid.crs {
        Some(target) if !source_crs.is_equivalent(target) => ground_truth.to_crs(target)?,
        _ => ground_truth.clone(),
    };

    let polygons = aligned.polygons();
    debug!(polygons = polygons.len(), "rasterizing ground truth");
    if polygons.is_empty() {
        return Ok(Mask::empty(grid));
    }

    rasterize_polygons(&polygons, grid)
}
