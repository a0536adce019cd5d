use std::path::PathBuf;

use clap::Parser;

use crate::config::KatilConfig;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "katil",
    version,
    about = "Dockable workbench for acoustic and behavioral recordings"
)]
pub struct Cli {
    /// WAV or CSV files to open at startup
    pub files: Vec<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start with an empty workspace instead of the saved session
    #[arg(long)]
    pub fresh: bool,

    /// Start the notebook server with the application
    #[arg(long)]
    pub notebook: bool,
}

impl Cli {
    /// Configuration with command line overrides applied.
    pub fn load_config(&self) -> anyhow::Result<KatilConfig> {
        let mut config = match &self.config {
            Some(path) => KatilConfig::from_path(path)?,
            None => KatilConfig::load(),
        };
        if self.notebook {
            config.notebook_autostart = true;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_files_and_flags() {
        let cli = Cli::parse_from(["katil", "--fresh", "a.wav", "b.csv"]);
        assert!(cli.fresh);
        assert!(!cli.notebook);
        assert_eq!(cli.files, vec![PathBuf::from("a.wav"), PathBuf::from("b.csv")]);
    }

    #[test]
    fn explicit_config_must_exist() {
        let cli = Cli::parse_from(["katil", "--config", "/no/such/katil.json"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn notebook_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "notebook_autostart": false }"#).unwrap();
        let cli = Cli::parse_from(["katil", "--notebook", "--config", path.to_str().unwrap()]);
        assert!(cli.load_config().unwrap().notebook_autostart);
    }
}
