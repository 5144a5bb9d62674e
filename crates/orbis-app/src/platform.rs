//! Platform directory resolution.
//!
//! Config and log locations follow OS conventions (XDG on Linux, Known
//! Folders on Windows, Library on macOS) unless overridden on the command
//! line.

use std::path::{Path, PathBuf};

use crate::AppError;

const APP_NAME: &str = "orbis";

/// OS-specific directories used by the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// JSON log files (debug builds).
    pub log_dir: PathBuf,
}

impl AppDirs {
    /// Resolve directories without creating them.
    ///
    /// `config_override` replaces the config directory; logs then live
    /// next to it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoConfigDir`] if there is no override and the OS
    /// does not expose a configuration directory.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self, AppError> {
        if let Some(config_dir) = config_override {
            return Ok(Self {
                config_dir: config_dir.to_path_buf(),
                log_dir: config_dir.join("logs"),
            });
        }
        let base = orbis_config::default_config_dir().ok_or(AppError::NoConfigDir)?;
        let log_dir = dirs::data_local_dir()
            .map(|d| d.join(APP_NAME).join("logs"))
            .unwrap_or_else(|| base.join("logs"));
        Ok(Self {
            config_dir: base,
            log_dir,
        })
    }

    /// Directories rooted under a custom base path.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Create every directory on disk.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if a directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
