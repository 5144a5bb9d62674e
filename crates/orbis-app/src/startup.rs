//! Config loading that defers its log output until tracing is installed.

use std::path::{Path, PathBuf};

use orbis_config::{CliArgs, Config};
use tracing::{info, warn};

use crate::AppError;

/// Where the running config came from.
#[derive(Debug)]
pub enum ConfigSource {
    /// Read from an existing `config.ron`.
    Loaded(PathBuf),
    /// No file existed; defaults were written to this path.
    Created(PathBuf),
    /// The file could not be used; running on defaults.
    Defaulted(String),
}

impl ConfigSource {
    /// Report the outcome through `tracing`. Call once logging is initialized.
    pub fn log(&self) {
        match self {
            ConfigSource::Loaded(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Created(path) => info!("Created default config at {}", path.display()),
            ConfigSource::Defaulted(reason) => {
                warn!("Failed to load config: {reason}, using defaults");
            }
        }
    }
}

/// Load or create `config.ron` in `config_dir`, apply CLI overrides, and
/// validate the result.
///
/// # Errors
///
/// Returns [`AppError::Config`] if the overridden config is invalid.
pub fn load_config(config_dir: &Path, args: &CliArgs) -> Result<(Config, ConfigSource), AppError> {
    let config_path = config_dir.join("config.ron");
    let existed = config_path.exists();
    let (mut config, source) = match Config::load_or_create(config_dir) {
        Ok(config) if existed => (config, ConfigSource::Loaded(config_path)),
        Ok(config) => (config, ConfigSource::Created(config_path)),
        Err(e) => (Config::default(), ConfigSource::Defaulted(e.to_string())),
    };
    config.apply_cli_overrides(args);
    config.validate()?;
    Ok((config, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_creates_then_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let args = CliArgs::default();

        let (_, source) = load_config(tmp.path(), &args).unwrap();
        assert!(matches!(source, ConfigSource::Created(_)), "{source:?}");

        let (_, source) = load_config(tmp.path(), &args).unwrap();
        assert!(matches!(source, ConfigSource::Loaded(_)), "{source:?}");
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.ron"), "(lod: oops").unwrap();

        let (config, source) = load_config(tmp.path(), &CliArgs::default()).unwrap();
        assert!(matches!(source, ConfigSource::Defaulted(_)), "{source:?}");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_overrides_applied_and_validated() {
        let tmp = tempfile::tempdir().unwrap();
        let args = CliArgs {
            max_level: Some(5),
            ..CliArgs::default()
        };
        let (config, _) = load_config(tmp.path(), &args).unwrap();
        assert_eq!(config.lod.maximum_quad_node_level, 5);

        let args = CliArgs {
            max_level: Some(200),
            ..CliArgs::default()
        };
        assert!(matches!(
            load_config(tmp.path(), &args),
            Err(AppError::Config(_))
        ));
    }
}
