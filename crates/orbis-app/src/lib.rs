//! Orbis application: resolves platform directories, loads configuration,
//! and flies a camera over a planet while its LOD quadtree follows.

mod error;
mod flight;
mod platform;
mod simulation;
mod startup;

pub use error::AppError;
pub use flight::FlightPath;
pub use platform::AppDirs;
pub use simulation::{Simulation, SimulationReport};
pub use startup::{ConfigSource, load_config};
