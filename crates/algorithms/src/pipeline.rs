//! File-level inference and evaluation entry points
//!
//! These functions tie the mask generators and metrics to GeoTIFF and
//! GeoJSON files. Each one takes a [`RunContext`] and logs inside its span.

use crate::mask::{constrain_to_footprints, gradient_mask};
use crate::metrics::{compute_metrics, format_metric, rasterize_ground_truth, EvalMetrics};
use roofarea_core::io::{read_geojson, read_geotiff, read_geotiff_bands, write_mask};
use roofarea_core::raster::Mask;
use roofarea_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, Span};

const MASK_SUFFIX: &str = "_roof_mask.tif";
const REPORT_SUFFIX: &str = "_eval_report.md";

/// Logging handle for one run of a pipeline entry point
#[derive(Debug, Clone)]
pub struct RunContext {
    span: Span,
}

impl RunContext {
    /// Context whose span is tagged with the command name
    pub fn new(command: &str) -> Self {
        Self {
            span: info_span!("roof_area", command),
        }
    }

    /// Wrap an existing span
    pub fn from_span(span: Span) -> Self {
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new("library")
    }
}

/// How the roof mask is produced
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceMode {
    /// Gradient threshold restricted to building footprints
    Baseline { footprints: Option<PathBuf> },
    /// Learned segmentation model (not available)
    Model { model_path: PathBuf },
}

/// Inputs of one inference run
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub raster: PathBuf,
    /// Output GeoTIFF; derived from `raster` when `None`
    pub output: Option<PathBuf>,
    pub threshold: f64,
    pub mode: InferenceMode,
}

impl InferenceRequest {
    /// Baseline request with the default threshold of 0.5
    pub fn baseline(raster: impl Into<PathBuf>, footprints: Option<PathBuf>) -> Self {
        Self {
            raster: raster.into(),
            output: None,
            threshold: 0.5,
            mode: InferenceMode::Baseline { footprints },
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Replace the baseline with a model run
    pub fn with_model(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.mode = InferenceMode::Model {
            model_path: model_path.into(),
        };
        self
    }

    /// Path the mask will be written to
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_mask_path(&self.raster))
    }
}

/// Produce a roof mask for a raster and write it as a GeoTIFF.
///
/// Returns the path written. Preconditions are checked before any file is
/// read, so a failed run leaves nothing behind.
///
/// # Errors
/// - [`Error::Unsupported`] for [`InferenceMode::Model`]
/// - [`Error::NoFootprints`] for a baseline run without footprints
pub fn run_inference(ctx: &RunContext, request: &InferenceRequest) -> Result<PathBuf> {
    let _guard = ctx.span().enter();

    let footprints_path = match &request.mode {
        InferenceMode::Model { model_path } => {
            debug!(model = %model_path.display(), "model inference requested");
            return Err(Error::Unsupported(
                "ML model inference is not implemented yet. Omit --model to use the heuristic \
                 baseline or implement a UNet/DeepLab runner."
                    .into(),
            ));
        }
        InferenceMode::Baseline { footprints: None } => {
            return Err(Error::NoFootprints(
                "Provide --footprints to run the baseline or train a model and pass --model."
                    .into(),
            ));
        }
        InferenceMode::Baseline {
            footprints: Some(path),
        } => path,
    };

    let output = request.output_path();
    let bands = read_geotiff_bands::<f64, _>(&request.raster)?;
    debug!(bands = bands.len(), raster = %request.raster.display(), "read image");

    let candidate = gradient_mask(&bands, request.threshold)?;
    let footprints = read_geojson(footprints_path)?;
    let mask = constrain_to_footprints(&candidate, Some(&footprints))?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    write_mask(&mask, &output)?;

    info!(path = %output.display(), roof_pixels = mask.count(), "Baseline inference saved mask");
    Ok(output)
}

/// Evaluate a predicted mask GeoTIFF against ground-truth polygons.
///
/// Band 1 is read as the mask (non-zero means roof); the pixel area comes
/// from the raster transform.
pub fn evaluate_masks(
    ctx: &RunContext,
    pred_mask_path: impl AsRef<Path>,
    ground_truth_path: impl AsRef<Path>,
) -> Result<EvalMetrics> {
    let _guard = ctx.span().enter();

    let raster = read_geotiff::<f64, _>(pred_mask_path.as_ref(), Some(1))?;
    let pred = Mask::from_raster(&raster);
    let grid = raster.grid_spec();

    let ground_truth = read_geojson(ground_truth_path.as_ref())?;
    let gt = rasterize_ground_truth(&grid, &ground_truth)?;

    let metrics = compute_metrics(&pred, &gt, grid.pixel_area())?;
    info!(iou = metrics.iou, dice = metrics.dice, "evaluated mask");
    Ok(metrics)
}

/// Markdown report of evaluation metrics
pub fn format_report(metrics: &EvalMetrics) -> String {
    let lines = [
        "# Roof Area Evaluation Report".to_string(),
        String::new(),
        "## Metrics".to_string(),
        format!("- IoU: {:.4}", metrics.iou),
        format!("- Dice: {:.4}", metrics.dice),
        format!("- Predicted area (m²): {:.4}", metrics.pred_area_m2),
        format!("- Ground truth area (m²): {:.4}", metrics.gt_area_m2),
        format!("- Absolute area error (m²): {:.4}", metrics.abs_area_error),
        format!("- Relative area error: {}", format_metric(metrics.rel_area_error)),
        String::new(),
    ];
    lines.join("\n")
}

/// Write the markdown report, creating parent directories
pub fn write_report(metrics: &EvalMetrics, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, format_report(metrics))?;
    Ok(path.to_path_buf())
}

/// `<raster without extension>_roof_mask.tif`
pub fn default_mask_path(raster: impl AsRef<Path>) -> PathBuf {
    with_suffix_replaced(raster.as_ref(), MASK_SUFFIX)
}

/// `<mask without extension>_eval_report.md`
pub fn default_report_path(pred_mask: impl AsRef<Path>) -> PathBuf {
    with_suffix_replaced(pred_mask.as_ref(), REPORT_SUFFIX)
}

fn with_suffix_replaced(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.with_extension("").into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(rel: f64) -> EvalMetrics {
        EvalMetrics {
            iou: 0.5,
            dice: 2.0 / 3.0,
            pred_area_m2: 12.0,
            gt_area_m2: 0.0,
            abs_area_error: 12.0,
            rel_area_error: rel,
        }
    }

    #[test]
    fn test_default_paths() {
        assert_eq!(
            default_mask_path("data/scene.tif"),
            PathBuf::from("data/scene_roof_mask.tif")
        );
        assert_eq!(
            default_report_path("out/scene_roof_mask.tif"),
            PathBuf::from("out/scene_roof_mask_eval_report.md")
        );
        assert_eq!(default_mask_path("scene"), PathBuf::from("scene_roof_mask.tif"));
    }

    #[test]
    fn test_report_format() {
        let report = format_report(&metrics(f64::INFINITY));
        let expected = "# Roof Area Evaluation Report\n\
                        \n\
                        ## Metrics\n\
                        - IoU: 0.5000\n\
                        - Dice: 0.6667\n\
                        - Predicted area (m²): 12.0000\n\
                        - Ground truth area (m²): 0.0000\n\
                        - Absolute area error (m²): 12.0000\n\
                        - Relative area error: inf\n";
        assert_eq!(report, expected);
        assert!(format_report(&metrics(0.25)).contains("- Relative area error: 0.2500\n"));
    }

    #[test]
    fn test_request_builders() {
        let req = InferenceRequest::baseline("a/b.tif", Some("fp.geojson".into()))
            .with_threshold(0.3);
        assert_eq!(req.output_path(), PathBuf::from("a/b_roof_mask.tif"));
        assert_eq!(req.threshold, 0.3);

        let req = req.with_output("x/y.tif").with_model("m.onnx");
        assert_eq!(req.output_path(), PathBuf::from("x/y.tif"));
        assert!(matches!(req.mode, InferenceMode::Model { .. }));
    }

    #[test]
    fn test_preconditions_checked_before_reading() {
        let ctx = RunContext::default();
        let missing = PathBuf::from("does/not/exist.tif");

        let req = InferenceRequest::baseline(&missing, None);
        assert!(matches!(run_inference(&ctx, &req), Err(Error::NoFootprints(_))));

        let req = InferenceRequest::baseline(&missing, None).with_model("model.pt");
        let err = run_inference(&ctx, &req).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(err.to_string().contains("--model"));
    }
}
