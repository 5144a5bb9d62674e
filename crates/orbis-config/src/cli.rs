//! Command-line argument parsing for Orbis.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Orbis command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orbis", about = "Headless planet quadtree LOD simulation")]
pub struct CliArgs {
    /// Maximum quadtree depth.
    #[arg(long)]
    pub max_level: Option<u8>,

    /// Number of background worker threads (0 = auto).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Planet radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Number of simulated frames.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(level) = args.max_level {
            self.lod.maximum_quad_node_level = level;
        }
        if let Some(threads) = args.threads {
            self.workers.threads = threads;
        }
        if let Some(radius) = args.radius {
            self.planet.radius = radius;
        }
        if let Some(frames) = args.frames {
            self.planet.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
