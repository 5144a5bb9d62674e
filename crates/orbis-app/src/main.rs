//! The binary entry point for the Orbis headless planet simulation.

use clap::Parser;
use orbis_app::{AppDirs, AppError, Simulation, load_config};
use orbis_config::CliArgs;
use tracing::{error, info};

fn run(args: &CliArgs) -> Result<(), AppError> {
    let dirs = AppDirs::resolve(args.config.as_deref())?;
    dirs.create_dirs()?;

    let (config, source) = load_config(&dirs.config_dir, args)?;

    orbis_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    source.log();
    info!(config_dir = %dirs.config_dir.display(), "Orbis starting");

    let simulation = Simulation::new(&config)?;
    let report = simulation.run();
    info!(
        frames = report.frames,
        peak = report.peak_quad_nodes,
        deepest = ?report.deepest_level,
        draws = report.draws,
        elapsed_ms = report.elapsed_ms,
        "flight finished"
    );
    match ron::ser::to_string_pretty(&report, ron::ser::PrettyConfig::new()) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("failed to serialize report: {e}"),
    }

    let leaked = simulation.shutdown();
    info!(leaked, "Orbis shut down");
    Ok(())
}

fn main() {
    let args = CliArgs::parse();
    if let Err(e) = run(&args) {
        eprintln!("orbis: {e}");
        std::process::exit(1);
    }
}
