use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Application configuration
// ---------------------------------------------------------------------------

/// User configuration, read from `<config dir>/katil/config.json`.
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KatilConfig {
    /// Initial root of the file browser (defaults to the home directory).
    pub browse_root: Option<PathBuf>,
    /// Program and arguments of the helper notebook server.
    pub notebook_command: Vec<String>,
    /// Start the notebook server with the application.
    pub notebook_autostart: bool,
    /// Default window length for short-term features, in seconds.
    pub feature_window: f64,
    /// Default step for short-term features, in seconds.
    pub feature_step: f64,
    /// Per-series point budget before a plot is decimated.
    pub max_plot_points: usize,
    pub console_banner: String,
}

impl Default for KatilConfig {
    fn default() -> Self {
        Self {
            browse_root: None,
            notebook_command: vec![
                "jupyter".to_string(),
                "notebook".to_string(),
                "--no-browser".to_string(),
            ],
            notebook_autostart: false,
            feature_window: 0.05,
            feature_step: 0.05,
            max_plot_points: 20_000,
            console_banner: "Katil shell. Type 'help' for commands.".to_string(),
        }
    }
}

impl KatilConfig {
    /// Default location of the config file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("katil").join("config.json"))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load from the default location. A missing file gives the defaults;
    /// a malformed one is logged and also gives the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("Ignoring config: {e:#}");
                Self::default()
            }
        }
    }

    /// Browse root, falling back to the home and then current directory.
    pub fn resolved_browse_root(&self) -> PathBuf {
        self.browse_root
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "feature_window": 0.1, "notebook_autostart": true }"#).unwrap();
        let cfg = KatilConfig::from_path(&path).unwrap();
        assert_eq!(cfg.feature_window, 0.1);
        assert!(cfg.notebook_autostart);
        assert_eq!(cfg.feature_step, 0.05);
        assert_eq!(cfg.notebook_command[0], "jupyter");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(KatilConfig::from_path(&path).is_err());
    }
}
