//! Application-level errors.

use orbis_config::ConfigError;
use orbis_lod::LodError;

/// Errors that stop the application before or during the simulation.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Loading or validating `config.ron` failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A root quadtree node could not be built.
    #[error(transparent)]
    Lod(#[from] LodError),
}
