//! Run settings shared by all subcommands
//!
//! Every value can come from a flag or a `ROOF_AREA_*` environment variable;
//! flags win. Values are validated once, before any work starts.

use clap::Args;
use roofarea_core::{Error, Result};
use std::str::FromStr;
use tracing::Level;

/// Flags common to every subcommand
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Gradient threshold as a fraction of the maximum magnitude
    #[arg(long, global = true, env = "ROOF_AREA_THRESHOLD", default_value_t = 0.5)]
    pub threshold: f64,

    /// Tile size in pixels
    #[arg(long, global = true, env = "ROOF_AREA_TILE_SIZE", default_value_t = 512)]
    pub tile_size: usize,

    /// Tile overlap in pixels
    #[arg(long, global = true, env = "ROOF_AREA_OVERLAP", default_value_t = 32)]
    pub overlap: usize,

    /// Logging level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true, env = "ROOF_AREA_LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,
}

/// Validated settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub threshold: f64,
    pub tile_size: usize,
    pub overlap: usize,
    pub log_level: Level,
}

pub const MIN_TILE_SIZE: usize = 64;

impl Settings {
    pub fn from_args(args: &CommonArgs) -> Result<Self> {
        if !(0.0..=1.0).contains(&args.threshold) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: args.threshold.to_string(),
                reason: "must be in [0, 1]".into(),
            });
        }
        if args.tile_size < MIN_TILE_SIZE {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: args.tile_size.to_string(),
                reason: format!("must be at least {}", MIN_TILE_SIZE),
            });
        }
        if args.overlap >= args.tile_size {
            return Err(Error::InvalidParameter {
                name: "overlap",
                value: args.overlap.to_string(),
                reason: "overlap must be smaller than tile_size".into(),
            });
        }
        let log_level = Level::from_str(args.log_level.trim()).map_err(|_| Error::InvalidParameter {
            name: "log_level",
            value: args.log_level.clone(),
            reason: "expected TRACE, DEBUG, INFO, WARN or ERROR".into(),
        })?;

        Ok(Self {
            threshold: args.threshold,
            tile_size: args.tile_size,
            overlap: args.overlap,
            log_level,
        })
    }
}
