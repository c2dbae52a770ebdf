//! # Roof Area Algorithms
//!
//! Roof mask generation and evaluation.
//!
//! ## Modules
//!
//! - **mask**: gradient-threshold mask, polygon rasterization, footprint constraint
//! - **metrics**: IoU/Dice and area errors, area aggregation, quality indicators
//! - **pipeline**: GeoTIFF/GeoJSON inference and evaluation entry points

pub mod mask;
pub mod metrics;
pub mod pipeline;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::mask::{
        constrain_to_footprints, gradient_mask, rasterize_polygons, GradientMask, GradientParams,
    };
    pub use crate::metrics::{
        aggregate_areas, compute_metrics, edge_confidence, mask_area_m2, quality_flag_shadow,
        rasterize_ground_truth, shadow_score, AreaRow, EvalMetrics,
    };
    pub use crate::pipeline::{
        default_mask_path, default_report_path, evaluate_masks, format_report, run_inference,
        write_report, InferenceMode, InferenceRequest, RunContext,
    };
    pub use roofarea_core::prelude::*;
}
