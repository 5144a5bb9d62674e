//! Configuration system for Orbis.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, validation of the
//! level-of-detail policy constants, and forward/backward compatible
//! serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, LodConfig, MAX_SUPPORTED_QUAD_NODE_LEVEL, PlanetConfig, ProjectionKind,
    WorkerConfig, default_config_dir,
};
pub use error::ConfigError;
