//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ConfigError, KioskConfig};

/// Rotating PDF display for information screens
#[derive(Debug, Parser)]
#[command(name = "pdf-kiosk", version, about)]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory relative document and widget paths resolve against
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Write every presented page as slot-<n>.png into this directory
    #[arg(long, value_name = "DIR")]
    pub snapshot_dir: Option<PathBuf>,
}

impl Args {
    /// Build the effective configuration: file, then environment, then flags.
    pub fn resolve_config(&self) -> Result<KioskConfig, ConfigError> {
        let mut config = KioskConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.base_dir {
            config.base_dir = dir.clone();
        }
        if let Some(dir) = &self.snapshot_dir {
            config.snapshot_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "pdf-kiosk",
            "--config",
            "kiosk.toml",
            "--base-dir",
            "/srv/kiosk",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("kiosk.toml")));
        assert_eq!(args.base_dir, Some(PathBuf::from("/srv/kiosk")));
        assert_eq!(args.snapshot_dir, None);
    }

    #[test]
    fn test_rejects_unknown_flag() {
        assert!(Args::try_parse_from(["pdf-kiosk", "--fullscreen"]).is_err());
    }

    #[test]
    #[serial]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kiosk.toml");
        fs::write(&path, "base_dir = \"/from/file\"\nreload_secs = 90\n").unwrap();

        let args = Args::try_parse_from([
            "pdf-kiosk",
            "-c",
            path.to_str().unwrap(),
            "--base-dir",
            "/from/flag",
        ])
        .unwrap();

        std::env::remove_var(crate::config::ENV_BASE_DIR);
        std::env::remove_var(crate::config::ENV_RELOAD_SECS);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.reload_secs, 90);
    }
}
