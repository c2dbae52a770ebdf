//! Evaluation, area and quality metrics
//!
//! - **eval**: IoU, Dice and area errors against rasterized ground truth
//! - **area**: per-building / per-tile area aggregation
//! - **quality**: shadow score and edge confidence

mod area;
mod eval;
mod quality;

pub use area::{aggregate_areas, AreaRow, AREA_COLUMN, BUILDING_KEY, TILE_KEY};
pub use eval::{compute_metrics, format_metric, mask_area_m2, rasterize_ground_truth, EvalMetrics};
pub use quality::{
    edge_confidence, quality_flag_shadow, shadow_score, DEFAULT_DARKNESS_THRESHOLD,
    DEFAULT_SHADOW_FLAG_THRESHOLD,
};
