//! Roof Area CLI - roof mask inference and evaluation

mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use roofarea_algorithms::metrics::{
    aggregate_areas, edge_confidence, quality_flag_shadow, shadow_score,
    DEFAULT_DARKNESS_THRESHOLD, DEFAULT_SHADOW_FLAG_THRESHOLD,
};
use roofarea_algorithms::pipeline::{
    default_report_path, evaluate_masks, format_report, run_inference, write_report,
    InferenceMode, InferenceRequest, RunContext,
};
use roofarea_core::io::{read_geojson, read_geotiff, read_geotiff_bands};
use roofarea_core::reproject::reproject_aoi_to_raster_crs;
use roofarea_core::{BBox, Mask, Raster, Window};
use roofarea_parallel::{iter_windows, TiledProcessor};
use settings::{CommonArgs, Settings};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "roof-area")]
#[command(author, version, about = "Roof mask inference and evaluation", long_about = None)]
struct Cli {
    /// Verbose output (forces DEBUG logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a roof mask GeoTIFF from an image
    Infer {
        /// Input image
        #[arg(long)]
        raster: PathBuf,
        /// Building footprints (GeoJSON)
        #[arg(long)]
        footprints: Option<PathBuf>,
        /// Output mask; defaults to <raster>_roof_mask.tif
        #[arg(long)]
        output: Option<PathBuf>,
        /// Trained segmentation model
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Compare a predicted mask with ground-truth polygons
    Eval {
        /// Predicted mask GeoTIFF
        #[arg(long)]
        pred_mask: PathBuf,
        /// Ground-truth polygons (GeoJSON)
        #[arg(long)]
        ground_truth: PathBuf,
        /// Markdown report; defaults to <pred_mask>_eval_report.md
        #[arg(long)]
        report: Option<PathBuf>,
        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the processing windows of a raster
    Tiles {
        /// Input raster
        input: PathBuf,
        /// Report the roof pixel count of each window of this mask
        #[arg(long)]
        mask: Option<PathBuf>,
        /// Print windows as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Sum roof areas per building or tile
    Area {
        /// Roof polygons (GeoJSON)
        input: PathBuf,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Shadow and edge quality indicators of a roof mask
    Quality {
        /// Image the mask was derived from
        #[arg(long)]
        image: PathBuf,
        /// Roof mask GeoTIFF
        #[arg(long)]
        mask: PathBuf,
        /// Per-pixel roof probability GeoTIFF
        #[arg(long)]
        probability: Option<PathBuf>,
        /// Brightness at or below which a pixel is shadowed
        #[arg(long, default_value_t = DEFAULT_DARKNESS_THRESHOLD)]
        darkness_threshold: f64,
        /// Shadow fraction from which the roof is flagged
        #[arg(long, default_value_t = DEFAULT_SHADOW_FLAG_THRESHOLD)]
        flag_threshold: f64,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
        /// Area of interest as min_x,min_y,max_x,max_y
        #[arg(long)]
        aoi: Option<String>,
        /// CRS of the area of interest
        #[arg(long, default_value = "EPSG:4326")]
        aoi_crs: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Invalid spinner template")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn read_mask(path: &PathBuf) -> Result<Mask> {
    let raster: Raster<f64> = read_geotiff(path, Some(1))
        .with_context(|| format!("Failed to read mask {}", path.display()))?;
    Ok(Mask::from_raster(&raster))
}

fn parse_aoi(s: &str) -> Result<BBox> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().context("Invalid AOI coordinate"))
        .collect::<Result<Vec<_>>>()?;
    match parts.as_slice() {
        [min_x, min_y, max_x, max_y] => Ok(BBox::new(*min_x, *min_y, *max_x, *max_y)),
        _ => anyhow::bail!("AOI must be min_x,min_y,max_x,max_y"),
    }
}

fn print_window(w: &Window, roof_pixels: Option<usize>, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(w)?;
        if let (Some(count), Some(obj)) = (roof_pixels, value.as_object_mut()) {
            obj.insert("roof_pixels".into(), count.into());
        }
        println!("{}", value);
    } else {
        match roof_pixels {
            Some(count) => println!(
                "{:>6} {:>6} {:>5} x {:<5} roof pixels: {}",
                w.col_off, w.row_off, w.width, w.height, count
            ),
            None => println!("{:>6} {:>6} {:>5} x {}", w.col_off, w.row_off, w.width, w.height),
        }
    }
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_args(&cli.common).context("Invalid settings")?;
    let level = if cli.verbose { Level::DEBUG } else { settings.log_level };
    setup_logging(level)?;

    match cli.command {
        // ── Infer ────────────────────────────────────────────────────
        Commands::Infer {
            raster,
            footprints,
            output,
            model,
        } => {
            let ctx = RunContext::new("infer");
            info!(?settings, "Running inference");

            let mode = match model {
                Some(model_path) => InferenceMode::Model { model_path },
                None => InferenceMode::Baseline { footprints },
            };
            let request = InferenceRequest {
                raster,
                output,
                threshold: settings.threshold,
                mode,
            };

            let pb = spinner("Computing roof mask...")?;
            let start = Instant::now();
            let result = run_inference(&ctx, &request);
            pb.finish_and_clear();
            let path = result.context("Inference failed")?;
            done("Roof mask", &path, start.elapsed());
        }

        // ── Eval ─────────────────────────────────────────────────────
        Commands::Eval {
            pred_mask,
            ground_truth,
            report,
            json,
        } => {
            let ctx = RunContext::new("eval");
            info!(?settings, "Running evaluation");

            let pb = spinner("Evaluating mask...")?;
            let result = evaluate_masks(&ctx, &pred_mask, &ground_truth);
            pb.finish_and_clear();
            let metrics = result.context("Evaluation failed")?;

            let report_path = report.unwrap_or_else(|| default_report_path(&pred_mask));
            write_report(&metrics, &report_path).context("Failed to write report")?;
            info!(path = %report_path.display(), "Evaluation report saved");

            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print!("{}", format_report(&metrics));
            }
        }

        // ── Tiles ────────────────────────────────────────────────────
        Commands::Tiles { input, mask, json } => {
            let raster: Raster<f64> = read_geotiff(&input, Some(1))
                .with_context(|| format!("Failed to read raster {}", input.display()))?;
            let (rows, cols) = raster.shape();

            match mask {
                Some(mask_path) => {
                    let mask = read_mask(&mask_path)?;
                    anyhow::ensure!(
                        mask.shape() == (rows, cols),
                        "Mask shape {:?} does not match raster shape {:?}",
                        mask.shape(),
                        (rows, cols)
                    );
                    let counts = TiledProcessor::new(settings.tile_size, settings.overlap)
                        .map_windows(&mask.to_raster(), |w, tile| {
                            (*w, tile.data().iter().filter(|&&v| v != 0).count())
                        })
                        .context("Tiled processing failed")?;
                    for (w, count) in &counts {
                        print_window(w, Some(*count), json)?;
                    }
                    info!(windows = counts.len(), "Tiled mask summary");
                }
                None => {
                    let windows = iter_windows(cols, rows, settings.tile_size, settings.overlap)
                        .context("Invalid tiling")?;
                    let mut n = 0;
                    for w in windows {
                        print_window(&w, None, json)?;
                        n += 1;
                    }
                    info!(windows = n, "Listed windows");
                }
            }
        }

        // ── Area ─────────────────────────────────────────────────────
        Commands::Area { input, json } => {
            let collection = read_geojson(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let rows = aggregate_areas(&collection).context("Area aggregation failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}\t{:.4}", row.group_key, row.total_area_m2);
                }
            }
        }

        // ── Quality ──────────────────────────────────────────────────
        Commands::Quality {
            image,
            mask,
            probability,
            darkness_threshold,
            flag_threshold,
        } => {
            let bands: Vec<Raster<f64>> = read_geotiff_bands(&image)
                .with_context(|| format!("Failed to read image {}", image.display()))?;
            let mask = read_mask(&mask)?;

            let score = shadow_score(&bands, &mask, darkness_threshold)
                .context("Failed to compute shadow score")?;
            println!("Shadow score: {:.4}", score);
            println!("Shadow flag: {}", quality_flag_shadow(score, flag_threshold));

            if let Some(path) = probability {
                let prob: Raster<f64> = read_geotiff(&path, Some(1))
                    .with_context(|| format!("Failed to read probability {}", path.display()))?;
                let confidence =
                    edge_confidence(&prob, &mask).context("Failed to compute edge confidence")?;
                println!("Edge confidence: {:.4}", confidence);
            }
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info {
            input,
            aoi,
            aoi_crs,
        } => {
            let bands: Vec<Raster<f64>> =
                read_geotiff_bands(&input).context("Failed to read raster")?;
            let raster = bands
                .first()
                .with_context(|| format!("{} has no bands", input.display()))?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let (px, py) = raster.pixel_size();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Bands: {}", bands.len());
            println!("Pixel size: {} x {}", px, py);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nStatistics (band 1):");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }

            if let Some(aoi) = aoi {
                let raster_crs = raster
                    .crs()
                    .context("Raster has no CRS to reproject the AOI into")?;
                let projected = reproject_aoi_to_raster_crs(parse_aoi(&aoi)?, aoi_crs.as_str(), raster_crs)
                    .context("Failed to reproject AOI")?;
                println!(
                    "\nAOI in raster CRS: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    projected.min_x, projected.min_y, projected.max_x, projected.max_y
                );
                match raster.read_bounds(projected.to_tuple()) {
                    Ok((window, _)) => println!(
                        "AOI window: col {} row {} size {} x {}",
                        window.col_off, window.row_off, window.width, window.height
                    ),
                    Err(_) => println!("AOI window: outside raster"),
                }
            }
        }
    }

    Ok(())
}
